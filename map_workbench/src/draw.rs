//! Interactive draw session capturing user-authored geometries.
//!
//! One session captures pointer input into one completed geometry per
//! request, for one tool kind at a time.

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{distance, Geometry, Point};

/// Tool kinds a draw session can be armed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawTool {
    Point,
    Line,
    Polygon,
    /// Two opposite corners.
    Rectangle,
    /// Center followed by a point on the radius.
    Circle,
}

impl DrawTool {
    /// Minimum number of vertices `finish` requires.
    pub fn min_vertices(self) -> usize {
        match self {
            Self::Point => 1,
            Self::Line | Self::Rectangle | Self::Circle => 2,
            Self::Polygon => 3,
        }
    }
}

/// Lifecycle state of a draw session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DrawState {
    #[default]
    Idle,
    Drawing,
    Complete,
    Cancelled,
}

/// Errors raised by draw-session misuse.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DrawError {
    #[error("cannot {action} while the draw session is {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: DrawState,
    },
    #[error("{tool:?} needs at least {needed} vertices, got {got}")]
    InsufficientVertices {
        tool: DrawTool,
        needed: usize,
        got: usize,
    },
}

/// Number of segments used to approximate a circle ring.
const CIRCLE_SEGMENTS: usize = 64;

/// State machine turning pointer input into one geometry per request.
///
/// An idle session is armed into `Drawing`, which either finishes into
/// `Complete` or cancels into `Cancelled`; `reset` returns to `Idle` from
/// any state. Arming a non-idle session fails; the engine-level arm
/// cancels a drawing session first.
#[derive(Debug, Default)]
pub struct DrawSession {
    state: DrawState,
    tool: Option<DrawTool>,
    vertices: Vec<Point>,
    result: Option<Geometry>,
}

impl DrawSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DrawState {
        self.state
    }

    pub fn tool(&self) -> Option<DrawTool> {
        self.tool
    }

    /// Vertices captured so far.
    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// The geometry built by the last `finish`, until the next rearm.
    pub fn result_geometry(&self) -> Option<&Geometry> {
        self.result.as_ref()
    }

    /// Arms the session with a tool. Fails unless the session is idle.
    pub fn arm(&mut self, tool: DrawTool) -> Result<(), DrawError> {
        if self.state != DrawState::Idle {
            return Err(DrawError::InvalidTransition {
                action: "arm",
                state: self.state,
            });
        }
        debug!("draw session armed with {tool:?}");
        self.tool = Some(tool);
        self.vertices.clear();
        self.result = None;
        self.state = DrawState::Drawing;
        Ok(())
    }

    /// Appends a vertex. A point tool completes on its first vertex.
    pub fn add_vertex(&mut self, p: Point) -> Result<(), DrawError> {
        if self.state != DrawState::Drawing {
            return Err(DrawError::InvalidTransition {
                action: "add a vertex",
                state: self.state,
            });
        }
        self.vertices.push(p);
        if self.tool == Some(DrawTool::Point) {
            self.finish()?;
        }
        Ok(())
    }

    /// Completes the capture, building the result geometry for the tool.
    pub fn finish(&mut self) -> Result<Geometry, DrawError> {
        if self.state != DrawState::Drawing {
            return Err(DrawError::InvalidTransition {
                action: "finish",
                state: self.state,
            });
        }
        let tool = self.tool.unwrap_or(DrawTool::Point);
        let needed = tool.min_vertices();
        if self.vertices.len() < needed {
            return Err(DrawError::InsufficientVertices {
                tool,
                needed,
                got: self.vertices.len(),
            });
        }
        let geometry = build_geometry(tool, &self.vertices);
        debug!("draw session completed a {:?}", geometry.kind());
        self.result = Some(geometry.clone());
        self.state = DrawState::Complete;
        Ok(geometry)
    }

    /// Discards the captured vertices. Valid while drawing.
    pub fn cancel(&mut self) -> Result<(), DrawError> {
        if self.state != DrawState::Drawing {
            return Err(DrawError::InvalidTransition {
                action: "cancel",
                state: self.state,
            });
        }
        debug!("draw session cancelled with {} vertices", self.vertices.len());
        self.vertices.clear();
        self.result = None;
        self.state = DrawState::Cancelled;
        Ok(())
    }

    /// Returns the session to idle from any state, clearing all fields.
    pub fn reset(&mut self) {
        self.state = DrawState::Idle;
        self.tool = None;
        self.vertices.clear();
        self.result = None;
    }
}

fn build_geometry(tool: DrawTool, vertices: &[Point]) -> Geometry {
    match tool {
        DrawTool::Point => Geometry::point(vertices[0].x, vertices[0].y),
        DrawTool::Line => Geometry::line(vertices.to_vec()),
        DrawTool::Polygon => Geometry::polygon(vertices.to_vec()),
        DrawTool::Rectangle => {
            let a = vertices[0];
            let b = vertices[1];
            Geometry::polygon(vec![
                Point::new(a.x, a.y),
                Point::new(b.x, a.y),
                Point::new(b.x, b.y),
                Point::new(a.x, b.y),
            ])
        }
        DrawTool::Circle => {
            let center = vertices[0];
            let radius = distance(center, vertices[1]);
            let mut ring = Vec::with_capacity(CIRCLE_SEGMENTS + 1);
            for i in 0..CIRCLE_SEGMENTS {
                let angle = (i as f64) * std::f64::consts::TAU / (CIRCLE_SEGMENTS as f64);
                ring.push(Point::new(
                    center.x + radius * angle.cos(),
                    center.y + radius * angle.sin(),
                ));
            }
            Geometry::polygon(ring)
        }
    }
}
