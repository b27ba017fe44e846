//! Planar geometry primitives shared by the engine components.

use serde::{Deserialize, Serialize};

/// Spatial reference identifier carried by every geometry.
pub type SpatialRef = u32;

/// Default spatial reference for geometries built without an explicit one.
pub const DEFAULT_SRID: SpatialRef = 3857;

/// Representation of a 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    /// Creates a degenerate extent containing a single point.
    pub fn from_point(p: Point) -> Self {
        Self {
            min_x: p.x,
            min_y: p.y,
            max_x: p.x,
            max_y: p.y,
        }
    }

    /// Grows the extent to include `p`.
    pub fn expand(&mut self, p: Point) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    /// Grows the extent to include all of `other`.
    pub fn merge(&mut self, other: &Extent) {
        self.expand(Point::new(other.min_x, other.min_y));
        self.expand(Point::new(other.max_x, other.max_y));
    }

    /// Center point of the extent.
    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Width along the x axis.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height along the y axis.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Shape discriminant for [`Geometry`] and for dataset declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
}

/// Tagged union of the geometry shapes the engine works with.
///
/// Geometries are treated as immutable values: copies are handed to the
/// geometry capability and the render surface, never mutable references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    /// A single position.
    Point { xy: Point, srid: SpatialRef },
    /// An open path through two or more vertices.
    Line { path: Vec<Point>, srid: SpatialRef },
    /// A closed ring; the first and last vertex coincide.
    Polygon { ring: Vec<Point>, srid: SpatialRef },
}

impl Geometry {
    /// Creates a point geometry in the default spatial reference.
    pub fn point(x: f64, y: f64) -> Self {
        Self::Point {
            xy: Point::new(x, y),
            srid: DEFAULT_SRID,
        }
    }

    /// Creates a line geometry from an open path.
    pub fn line(path: Vec<Point>) -> Self {
        Self::Line {
            path,
            srid: DEFAULT_SRID,
        }
    }

    /// Creates a polygon geometry, closing the ring if it is open.
    pub fn polygon(mut ring: Vec<Point>) -> Self {
        if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
            if first != last {
                ring.push(first);
            }
        }
        Self::Polygon {
            ring,
            srid: DEFAULT_SRID,
        }
    }

    /// Returns the same geometry tagged with a different spatial reference.
    pub fn with_srid(mut self, srid: SpatialRef) -> Self {
        match &mut self {
            Self::Point { srid: s, .. } | Self::Line { srid: s, .. } | Self::Polygon { srid: s, .. } => {
                *s = srid;
            }
        }
        self
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            Self::Point { .. } => GeometryKind::Point,
            Self::Line { .. } => GeometryKind::Line,
            Self::Polygon { .. } => GeometryKind::Polygon,
        }
    }

    pub fn srid(&self) -> SpatialRef {
        match self {
            Self::Point { srid, .. } | Self::Line { srid, .. } | Self::Polygon { srid, .. } => *srid,
        }
    }

    /// All vertices of the geometry in order.
    pub fn vertices(&self) -> &[Point] {
        match self {
            Self::Point { xy, .. } => std::slice::from_ref(xy),
            Self::Line { path, .. } => path,
            Self::Polygon { ring, .. } => ring,
        }
    }

    /// Bounding extent of the geometry.
    pub fn extent(&self) -> Extent {
        let mut vertices = self.vertices().iter();
        let mut extent = match vertices.next() {
            Some(p) => Extent::from_point(*p),
            None => Extent::from_point(Point::new(0.0, 0.0)),
        };
        for p in vertices {
            extent.expand(*p);
        }
        extent
    }

    /// Representative point used for pairwise measurements: the point
    /// itself, or the bounding-extent center for lines and polygons.
    pub fn representative_point(&self) -> Point {
        match self {
            Self::Point { xy, .. } => *xy,
            _ => self.extent().center(),
        }
    }
}

/// Calculates the Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

/// Calculates the area of a simple closed ring using the shoelace formula.
///
/// The ring may or may not repeat its first vertex at the end.
pub fn ring_area(ring: &[Point]) -> f64 {
    let ring = match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => &ring[..ring.len() - 1],
        _ => ring,
    };
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..ring.len() {
        let j = (i + 1) % ring.len();
        sum += ring[i].x * ring[j].y - ring[j].x * ring[i].y;
    }
    sum.abs() * 0.5
}

/// Calculates the total length of an open path.
pub fn path_length(path: &[Point]) -> f64 {
    path.windows(2).map(|pair| distance(pair[0], pair[1])).sum()
}

/// Combined extent of a set of geometries; `None` when the set is empty.
pub fn combined_extent<'a, I>(geometries: I) -> Option<Extent>
where
    I: IntoIterator<Item = &'a Geometry>,
{
    let mut iter = geometries.into_iter();
    let mut extent = iter.next()?.extent();
    for g in iter {
        extent.merge(&g.extent());
    }
    Some(extent)
}
