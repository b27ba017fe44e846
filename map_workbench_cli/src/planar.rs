//! Planar geometry collaborator backing the CLI.
//!
//! Coordinates are treated as projected meters. Operations outside the
//! planar repertoire report `Unsupported`, which the engine skips and
//! counts inside batches.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use log::debug;

use map_workbench::capability::{
    CapabilityError, GeometryCapability, HighlightHandle, RenderSurface,
};
use map_workbench::geometry::{path_length, ring_area, Extent, Geometry, Point};
use map_workbench::styles::HighlightStyle;
use map_workbench::units::{AreaUnit, LinearUnit};

/// Number of segments used to approximate a buffered point.
const BUFFER_SEGMENTS: usize = 64;

/// Planar implementation of the geometry capability.
#[derive(Debug, Default)]
pub struct PlanarCapability;

impl PlanarCapability {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GeometryCapability for PlanarCapability {
    async fn buffer(
        &self,
        geometry: &Geometry,
        distance: f64,
        unit: LinearUnit,
    ) -> Result<Geometry, CapabilityError> {
        let radius = unit.to_meters(distance);
        match geometry {
            Geometry::Point { xy, srid } => {
                let mut ring = Vec::with_capacity(BUFFER_SEGMENTS);
                for i in 0..BUFFER_SEGMENTS {
                    let angle = (i as f64) * std::f64::consts::TAU / (BUFFER_SEGMENTS as f64);
                    ring.push(Point::new(
                        xy.x + radius * angle.cos(),
                        xy.y + radius * angle.sin(),
                    ));
                }
                Ok(Geometry::polygon(ring).with_srid(*srid))
            }
            _ => Err(CapabilityError::Unsupported {
                operation: "buffer of non-point geometry",
            }),
        }
    }

    async fn intersect(
        &self,
        a: &Geometry,
        b: &Geometry,
    ) -> Result<Option<Geometry>, CapabilityError> {
        let (subject, clip) = match (a, b) {
            (Geometry::Polygon { ring: ra, .. }, Geometry::Polygon { ring: rb, .. }) => (ra, rb),
            _ => {
                return Err(CapabilityError::Unsupported {
                    operation: "intersect of non-polygon geometry",
                })
            }
        };
        let clipped = clip_polygon(&open_ring(subject), &open_ring(clip));
        if clipped.len() < 3 {
            return Ok(None);
        }
        Ok(Some(Geometry::polygon(clipped).with_srid(a.srid())))
    }

    async fn union(&self, geometries: &[Geometry]) -> Result<Geometry, CapabilityError> {
        let mut points: Vec<Point> = Vec::new();
        for g in geometries {
            points.extend_from_slice(g.vertices());
        }
        let hull = convex_hull(points);
        if hull.len() < 3 {
            return Err(CapabilityError::Geometry {
                operation: "union",
                message: "fewer than three distinct vertices".to_string(),
            });
        }
        let srid = geometries.first().map(|g| g.srid()).unwrap_or_default();
        Ok(Geometry::polygon(hull).with_srid(srid))
    }

    async fn difference(
        &self,
        _a: &Geometry,
        _b: &Geometry,
    ) -> Result<Option<Geometry>, CapabilityError> {
        Err(CapabilityError::Unsupported {
            operation: "difference",
        })
    }

    async fn length(
        &self,
        geometry: &Geometry,
        unit: LinearUnit,
    ) -> Result<f64, CapabilityError> {
        let meters = path_length(geometry.vertices());
        Ok(meters / unit.meters_per_unit())
    }

    async fn area(&self, geometry: &Geometry, unit: AreaUnit) -> Result<f64, CapabilityError> {
        let square_meters = ring_area(geometry.vertices());
        Ok(square_meters / unit.square_meters_per_unit())
    }
}

/// Drops the closing vertex of a ring, if present.
fn open_ring(ring: &[Point]) -> Vec<Point> {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => {
            ring[..ring.len() - 1].to_vec()
        }
        _ => ring.to_vec(),
    }
}

fn signed_area(ring: &[Point]) -> f64 {
    let mut sum = 0.0;
    for i in 0..ring.len() {
        let j = (i + 1) % ring.len();
        sum += ring[i].x * ring[j].y - ring[j].x * ring[i].y;
    }
    sum * 0.5
}

fn counter_clockwise(mut ring: Vec<Point>) -> Vec<Point> {
    if signed_area(&ring) < 0.0 {
        ring.reverse();
    }
    ring
}

/// Intersection of the infinite lines through `p1`-`p2` and `p3`-`p4`.
fn line_intersection(p1: Point, p2: Point, p3: Point, p4: Point) -> Option<Point> {
    let d = (p2.x - p1.x) * (p4.y - p3.y) - (p2.y - p1.y) * (p4.x - p3.x);
    if d.abs() < f64::EPSILON {
        return None;
    }
    let t = ((p3.x - p1.x) * (p4.y - p3.y) - (p3.y - p1.y) * (p4.x - p3.x)) / d;
    Some(Point::new(
        p1.x + t * (p2.x - p1.x),
        p1.y + t * (p2.y - p1.y),
    ))
}

fn left_of_edge(a: Point, b: Point, p: Point) -> bool {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x) >= 0.0
}

/// Sutherland-Hodgman clip of `subject` by the convex ring `clip`.
///
/// Both rings are open. The clip ring is normalised to counter-clockwise
/// so the inside test is consistent.
fn clip_polygon(subject: &[Point], clip: &[Point]) -> Vec<Point> {
    let clip = counter_clockwise(clip.to_vec());
    let mut output = subject.to_vec();
    for i in 0..clip.len() {
        let a = clip[i];
        let b = clip[(i + 1) % clip.len()];
        let input = std::mem::take(&mut output);
        if input.is_empty() {
            break;
        }
        for j in 0..input.len() {
            let current = input[j];
            let previous = input[(j + input.len() - 1) % input.len()];
            let current_inside = left_of_edge(a, b, current);
            let previous_inside = left_of_edge(a, b, previous);
            if current_inside {
                if !previous_inside {
                    if let Some(p) = line_intersection(previous, current, a, b) {
                        output.push(p);
                    }
                }
                output.push(current);
            } else if previous_inside {
                if let Some(p) = line_intersection(previous, current, a, b) {
                    output.push(p);
                }
            }
        }
    }
    output
}

/// Andrew's monotone chain convex hull.
fn convex_hull(mut points: Vec<Point>) -> Vec<Point> {
    points.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    points.dedup();
    if points.len() < 3 {
        return points;
    }
    let cross = |o: Point, a: Point, b: Point| (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x);
    let mut lower: Vec<Point> = Vec::new();
    for &p in &points {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<Point> = Vec::new();
    for &p in points.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Render surface that only logs; the CLI has no map display.
#[derive(Debug, Default)]
pub struct LogSurface {
    next_handle: AtomicU64,
}

impl LogSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RenderSurface for LogSurface {
    async fn add_highlight(
        &self,
        geometry: &Geometry,
        _style: &HighlightStyle,
    ) -> Result<HighlightHandle, CapabilityError> {
        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("highlight {handle} added for a {:?}", geometry.kind());
        Ok(HighlightHandle(handle))
    }

    async fn remove_highlight(&self, handle: HighlightHandle) -> Result<(), CapabilityError> {
        debug!("highlight {} removed", handle.0);
        Ok(())
    }

    async fn zoom_to(&self, extent: &Extent) -> Result<(), CapabilityError> {
        debug!(
            "zoom to ({:.1}, {:.1})-({:.1}, {:.1})",
            extent.min_x, extent.min_y, extent.max_x, extent.max_y
        );
        Ok(())
    }
}
