//! Contracts for the external geometry and rendering collaborators.
//!
//! The engine never computes buffers, intersections or projected measures
//! itself; it drives an implementation of [`GeometryCapability`]. Likewise
//! the map display is reached only through [`RenderSurface`]. Both are
//! asynchronous and fallible.

use async_trait::async_trait;
use thiserror::Error;

use crate::geometry::{Extent, Geometry};
use crate::styles::HighlightStyle;
use crate::units::{AreaUnit, LinearUnit};

/// Opaque handle identifying one highlight on the render surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HighlightHandle(pub u64);

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CapabilityError {
    #[error("geometry operation {operation} failed: {message}")]
    Geometry {
        operation: &'static str,
        message: String,
    },
    #[error("render surface rejected {operation}: {message}")]
    Render {
        operation: &'static str,
        message: String,
    },
    #[error("operation {operation} is not supported by this capability")]
    Unsupported { operation: &'static str },
}

/// Asynchronous geometric computation service consumed by the analysis
/// orchestrator.
#[async_trait]
pub trait GeometryCapability: Send + Sync {
    /// Expands `geometry` outward by `distance` expressed in `unit`.
    async fn buffer(
        &self,
        geometry: &Geometry,
        distance: f64,
        unit: LinearUnit,
    ) -> Result<Geometry, CapabilityError>;

    /// Intersection of two geometries; `None` when they do not overlap.
    async fn intersect(
        &self,
        a: &Geometry,
        b: &Geometry,
    ) -> Result<Option<Geometry>, CapabilityError>;

    /// Merges one or more geometries into a single geometry.
    async fn union(&self, geometries: &[Geometry]) -> Result<Geometry, CapabilityError>;

    /// The part of `a` not covered by `b`; `None` when nothing remains.
    async fn difference(
        &self,
        a: &Geometry,
        b: &Geometry,
    ) -> Result<Option<Geometry>, CapabilityError>;

    /// Length of `geometry` expressed in `unit`.
    async fn length(&self, geometry: &Geometry, unit: LinearUnit)
        -> Result<f64, CapabilityError>;

    /// Area of `geometry` expressed in `unit`.
    async fn area(&self, geometry: &Geometry, unit: AreaUnit) -> Result<f64, CapabilityError>;
}

/// Display surface that shows datasets and accepts highlight and zoom
/// commands.
#[async_trait]
pub trait RenderSurface: Send + Sync {
    /// Adds one highlight graphic and returns its handle.
    async fn add_highlight(
        &self,
        geometry: &Geometry,
        style: &HighlightStyle,
    ) -> Result<HighlightHandle, CapabilityError>;

    /// Removes a previously added highlight.
    async fn remove_highlight(&self, handle: HighlightHandle) -> Result<(), CapabilityError>;

    /// Moves the viewport to the given extent.
    async fn zoom_to(&self, extent: &Extent) -> Result<(), CapabilityError>;
}
