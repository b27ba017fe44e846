//! Spatial analysis orchestration over the geometry capability.
//!
//! Each request is validated synchronously before the first capability
//! call. Per-item failures inside batch operations are skipped and
//! counted; a failure in a single-item operation aborts the request.

use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capability::{CapabilityError, GeometryCapability};
use crate::dataset::AttributeValue;
use crate::geometry::{Geometry, GeometryKind};
use crate::styles::HighlightStyle;
use crate::units::{format_area, format_length, AreaUnit, LinearUnit};

/// Kind discriminant for analysis requests and results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisKind {
    Buffer,
    Intersect,
    Distance,
    Area,
}

impl AnalysisKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Buffer => "Buffer",
            Self::Intersect => "Intersection",
            Self::Distance => "Distance",
            Self::Area => "Area",
        }
    }
}

/// A spatial operation together with its source geometries, parameters and
/// an explicit highlight style.
#[derive(Debug, Clone)]
pub enum AnalysisRequest {
    /// Expands each source by a distance, optionally dissolving all buffers
    /// into one geometry.
    Buffer {
        sources: Vec<Geometry>,
        distance: f64,
        unit: LinearUnit,
        dissolve: bool,
        style: HighlightStyle,
    },
    /// Pairwise intersections between two source sets.
    Intersect {
        set_a: Vec<Geometry>,
        set_b: Vec<Geometry>,
        keep_non_intersecting: bool,
        style: HighlightStyle,
    },
    /// Straight-line distance between exactly two sources.
    Distance {
        sources: Vec<Geometry>,
        style: HighlightStyle,
    },
    /// Summed area of the polygon sources.
    Area {
        sources: Vec<Geometry>,
        style: HighlightStyle,
    },
}

impl AnalysisRequest {
    pub fn kind(&self) -> AnalysisKind {
        match self {
            Self::Buffer { .. } => AnalysisKind::Buffer,
            Self::Intersect { .. } => AnalysisKind::Intersect,
            Self::Distance { .. } => AnalysisKind::Distance,
            Self::Area { .. } => AnalysisKind::Area,
        }
    }

    pub fn style(&self) -> &HighlightStyle {
        match self {
            Self::Buffer { style, .. }
            | Self::Intersect { style, .. }
            | Self::Distance { style, .. }
            | Self::Area { style, .. } => style,
        }
    }

    /// Checks every precondition that can be verified without a capability
    /// call. The orchestrator never starts a request it knows will fail.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        match self {
            Self::Distance { sources, .. } => {
                if sources.len() != 2 {
                    return Err(AnalysisError::InsufficientFeatures {
                        got: sources.len(),
                    });
                }
            }
            Self::Area { sources, .. } => {
                if !sources.iter().any(|g| g.kind() == GeometryKind::Polygon) {
                    return Err(AnalysisError::NoPolygonData);
                }
            }
            Self::Buffer { .. } | Self::Intersect { .. } => {}
        }
        Ok(())
    }
}

/// Errors raised by analysis requests.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("distance analysis needs exactly two source features, got {got}")]
    InsufficientFeatures { got: usize },
    #[error("area analysis needs at least one polygon source")]
    NoPolygonData,
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

/// One output geometry with its provenance attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutput {
    pub geometry: Geometry,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl AnalysisOutput {
    fn new(geometry: Geometry, tags: &[(&str, AttributeValue)]) -> Self {
        let mut attributes = BTreeMap::new();
        for (name, value) in tags {
            attributes.insert((*name).to_string(), value.clone());
        }
        Self {
            geometry,
            attributes,
        }
    }

    /// The `type` provenance attribute, falling back to an empty string.
    pub fn output_type(&self) -> &str {
        match self.attributes.get("type") {
            Some(AttributeValue::Text(s)) => s,
            _ => "",
        }
    }
}

/// Assembled result of one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub kind: AnalysisKind,
    pub outputs: Vec<AnalysisOutput>,
    /// Items skipped because a per-item capability call failed.
    pub skipped: usize,
    /// Unit-scaled magnitude of the operation's measurement.
    pub summary: String,
    pub style: HighlightStyle,
}

/// Runs `request` against `capability`, assembling result geometries with
/// provenance attributes.
pub async fn analyze(
    capability: &dyn GeometryCapability,
    request: &AnalysisRequest,
) -> Result<AnalysisResult, AnalysisError> {
    request.validate()?;
    match request {
        AnalysisRequest::Buffer {
            sources,
            distance,
            unit,
            dissolve,
            style,
        } => run_buffer(capability, sources, *distance, *unit, *dissolve, *style).await,
        AnalysisRequest::Intersect {
            set_a,
            set_b,
            keep_non_intersecting,
            style,
        } => run_intersect(capability, set_a, set_b, *keep_non_intersecting, *style).await,
        AnalysisRequest::Distance { sources, style } => {
            run_distance(capability, sources, *style).await
        }
        AnalysisRequest::Area { sources, style } => run_area(capability, sources, *style).await,
    }
}

fn buffer_tags(distance: f64, unit: LinearUnit) -> [(&'static str, AttributeValue); 3] {
    [
        ("type", AttributeValue::text("Buffer")),
        ("distance", AttributeValue::Number(distance)),
        ("unit", AttributeValue::text(unit.label())),
    ]
}

async fn run_buffer(
    capability: &dyn GeometryCapability,
    sources: &[Geometry],
    distance: f64,
    unit: LinearUnit,
    dissolve: bool,
    style: HighlightStyle,
) -> Result<AnalysisResult, AnalysisError> {
    let meters = unit.to_meters(distance);
    let mut buffered = Vec::with_capacity(sources.len());
    let mut skipped = 0;
    for (index, geometry) in sources.iter().enumerate() {
        match capability.buffer(geometry, meters, LinearUnit::Meters).await {
            Ok(b) => buffered.push(b),
            Err(e) => {
                warn!("buffer skipped source {index}: {e}");
                skipped += 1;
            }
        }
    }

    let geometries = if dissolve && buffered.len() > 1 {
        vec![capability.union(&buffered).await?]
    } else {
        buffered
    };

    let tags = buffer_tags(distance, unit);
    let outputs = geometries
        .into_iter()
        .map(|g| AnalysisOutput::new(g, &tags))
        .collect::<Vec<_>>();
    info!(
        "buffer produced {} geometries, skipped {skipped}",
        outputs.len()
    );
    Ok(AnalysisResult {
        kind: AnalysisKind::Buffer,
        outputs,
        skipped,
        summary: format_length(meters),
        style,
    })
}

async fn run_intersect(
    capability: &dyn GeometryCapability,
    set_a: &[Geometry],
    set_b: &[Geometry],
    keep_non_intersecting: bool,
    style: HighlightStyle,
) -> Result<AnalysisResult, AnalysisError> {
    let mut intersections = Vec::new();
    let mut skipped = 0;
    for a in set_a {
        for b in set_b {
            match capability.intersect(a, b).await {
                Ok(Some(g)) => intersections.push(g),
                Ok(None) => {}
                Err(e) => {
                    warn!("pairwise intersect skipped: {e}");
                    skipped += 1;
                }
            }
        }
    }

    let mut outputs: Vec<AnalysisOutput> = intersections
        .iter()
        .map(|g| {
            AnalysisOutput::new(
                g.clone(),
                &[("type", AttributeValue::text("Intersection"))],
            )
        })
        .collect();

    if keep_non_intersecting {
        // The remainder of each source is its difference against the union
        // of all intersections, not against its own pairwise ones.
        let merged = if intersections.is_empty() {
            None
        } else {
            Some(capability.union(&intersections).await?)
        };
        for (set_label, set) in [("A", set_a), ("B", set_b)] {
            for source in set {
                let remainder = match &merged {
                    Some(merged) => match capability.difference(source, merged).await {
                        Ok(r) => r,
                        Err(e) => {
                            warn!("difference skipped for set {set_label}: {e}");
                            skipped += 1;
                            continue;
                        }
                    },
                    None => Some(source.clone()),
                };
                if let Some(remainder) = remainder {
                    outputs.push(AnalysisOutput::new(
                        remainder,
                        &[
                            ("type", AttributeValue::text("NonIntersecting")),
                            ("set", AttributeValue::text(set_label)),
                        ],
                    ));
                }
            }
        }
    }

    let mut total_area = 0.0;
    for g in &intersections {
        match capability.area(g, AreaUnit::SquareMeters).await {
            Ok(a) => total_area += a,
            Err(e) => {
                warn!("intersection area skipped: {e}");
                skipped += 1;
            }
        }
    }
    info!(
        "intersect produced {} geometries, skipped {skipped}",
        outputs.len()
    );
    Ok(AnalysisResult {
        kind: AnalysisKind::Intersect,
        outputs,
        skipped,
        summary: format_area(total_area),
        style,
    })
}

async fn run_distance(
    capability: &dyn GeometryCapability,
    sources: &[Geometry],
    style: HighlightStyle,
) -> Result<AnalysisResult, AnalysisError> {
    // Validated: exactly two sources.
    let a = sources[0].representative_point();
    let b = sources[1].representative_point();
    let path = Geometry::line(vec![a, b]).with_srid(sources[0].srid());
    let meters = capability.length(&path, LinearUnit::Meters).await?;
    let summary = format_length(meters);
    info!("distance measured {summary}");
    Ok(AnalysisResult {
        kind: AnalysisKind::Distance,
        outputs: vec![AnalysisOutput::new(
            path,
            &[
                ("type", AttributeValue::text("Distance")),
                ("meters", AttributeValue::Number(meters)),
            ],
        )],
        skipped: 0,
        summary,
        style,
    })
}

async fn run_area(
    capability: &dyn GeometryCapability,
    sources: &[Geometry],
    style: HighlightStyle,
) -> Result<AnalysisResult, AnalysisError> {
    let mut outputs = Vec::new();
    let mut total = 0.0;
    let mut skipped = 0;
    for geometry in sources {
        if geometry.kind() != GeometryKind::Polygon {
            continue;
        }
        match capability.area(geometry, AreaUnit::SquareMeters).await {
            Ok(a) => {
                total += a;
                outputs.push(AnalysisOutput::new(
                    geometry.clone(),
                    &[
                        ("type", AttributeValue::text("Area")),
                        ("square_meters", AttributeValue::Number(a)),
                    ],
                ));
            }
            Err(e) => {
                warn!("area skipped a polygon: {e}");
                skipped += 1;
            }
        }
    }
    let summary = format_area(total);
    info!("area measured {summary} over {} polygons", outputs.len());
    Ok(AnalysisResult {
        kind: AnalysisKind::Area,
        outputs,
        skipped,
        summary,
        style,
    })
}
