#![allow(dead_code)]

//! Planar mock collaborators shared by the integration tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use map_workbench::capability::{
    CapabilityError, GeometryCapability, HighlightHandle, RenderSurface,
};
use map_workbench::geometry::{
    combined_extent, path_length, ring_area, Extent, Geometry, GeometryKind, Point,
};
use map_workbench::styles::HighlightStyle;
use map_workbench::units::{AreaUnit, LinearUnit};

/// Builds the axis-aligned rectangle ring of an extent.
pub fn extent_polygon(extent: &Extent) -> Geometry {
    Geometry::polygon(vec![
        Point::new(extent.min_x, extent.min_y),
        Point::new(extent.max_x, extent.min_y),
        Point::new(extent.max_x, extent.max_y),
        Point::new(extent.min_x, extent.max_y),
    ])
}

/// Axis-aligned rectangle polygon between two opposite corners.
pub fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Geometry {
    Geometry::polygon(vec![
        Point::new(min_x, min_y),
        Point::new(max_x, min_y),
        Point::new(max_x, max_y),
        Point::new(min_x, max_y),
    ])
}

/// Deterministic planar capability operating on bounding extents.
///
/// Any operation on a geometry kind listed in `fail_kinds` errors, which
/// drives the orchestrator's skip-and-count and abort paths.
#[derive(Default)]
pub struct MockCapability {
    pub fail_kinds: Vec<GeometryKind>,
}

impl MockCapability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(kinds: &[GeometryKind]) -> Self {
        Self {
            fail_kinds: kinds.to_vec(),
        }
    }

    fn check(&self, operation: &'static str, g: &Geometry) -> Result<(), CapabilityError> {
        if self.fail_kinds.contains(&g.kind()) {
            return Err(CapabilityError::Geometry {
                operation,
                message: format!("mock failure on {:?}", g.kind()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl GeometryCapability for MockCapability {
    async fn buffer(
        &self,
        geometry: &Geometry,
        distance: f64,
        _unit: LinearUnit,
    ) -> Result<Geometry, CapabilityError> {
        self.check("buffer", geometry)?;
        let mut extent = geometry.extent();
        extent.min_x -= distance;
        extent.min_y -= distance;
        extent.max_x += distance;
        extent.max_y += distance;
        Ok(extent_polygon(&extent))
    }

    async fn intersect(
        &self,
        a: &Geometry,
        b: &Geometry,
    ) -> Result<Option<Geometry>, CapabilityError> {
        self.check("intersect", a)?;
        self.check("intersect", b)?;
        let ea = a.extent();
        let eb = b.extent();
        let overlap = Extent {
            min_x: ea.min_x.max(eb.min_x),
            min_y: ea.min_y.max(eb.min_y),
            max_x: ea.max_x.min(eb.max_x),
            max_y: ea.max_y.min(eb.max_y),
        };
        if overlap.min_x >= overlap.max_x || overlap.min_y >= overlap.max_y {
            return Ok(None);
        }
        Ok(Some(extent_polygon(&overlap)))
    }

    async fn union(&self, geometries: &[Geometry]) -> Result<Geometry, CapabilityError> {
        for g in geometries {
            self.check("union", g)?;
        }
        let extent = combined_extent(geometries.iter()).ok_or(CapabilityError::Geometry {
            operation: "union",
            message: "empty input".to_string(),
        })?;
        Ok(extent_polygon(&extent))
    }

    async fn difference(
        &self,
        a: &Geometry,
        b: &Geometry,
    ) -> Result<Option<Geometry>, CapabilityError> {
        self.check("difference", a)?;
        self.check("difference", b)?;
        let ea = a.extent();
        let eb = b.extent();
        let covered = eb.min_x <= ea.min_x
            && eb.min_y <= ea.min_y
            && eb.max_x >= ea.max_x
            && eb.max_y >= ea.max_y;
        if covered {
            Ok(None)
        } else {
            Ok(Some(a.clone()))
        }
    }

    async fn length(
        &self,
        geometry: &Geometry,
        unit: LinearUnit,
    ) -> Result<f64, CapabilityError> {
        self.check("length", geometry)?;
        Ok(path_length(geometry.vertices()) / unit.meters_per_unit())
    }

    async fn area(&self, geometry: &Geometry, unit: AreaUnit) -> Result<f64, CapabilityError> {
        self.check("area", geometry)?;
        Ok(ring_area(geometry.vertices()) / unit.square_meters_per_unit())
    }
}

/// What happened on the render surface, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Added(u64),
    Removed(u64),
    Zoomed(Extent),
}

/// Render surface double that records every command it receives.
#[derive(Default)]
pub struct RecordingSurface {
    next_handle: AtomicU64,
    events: Mutex<Vec<SurfaceEvent>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Handles of highlights added but not yet removed.
    pub fn active(&self) -> Vec<u64> {
        let mut active = Vec::new();
        for event in self.events.lock().unwrap().iter() {
            match event {
                SurfaceEvent::Added(h) => active.push(*h),
                SurfaceEvent::Removed(h) => active.retain(|a| a != h),
                SurfaceEvent::Zoomed(_) => {}
            }
        }
        active
    }
}

#[async_trait]
impl RenderSurface for RecordingSurface {
    async fn add_highlight(
        &self,
        _geometry: &Geometry,
        _style: &HighlightStyle,
    ) -> Result<HighlightHandle, CapabilityError> {
        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst) + 1;
        self.events.lock().unwrap().push(SurfaceEvent::Added(handle));
        Ok(HighlightHandle(handle))
    }

    async fn remove_highlight(&self, handle: HighlightHandle) -> Result<(), CapabilityError> {
        self.events
            .lock()
            .unwrap()
            .push(SurfaceEvent::Removed(handle.0));
        Ok(())
    }

    async fn zoom_to(&self, extent: &Extent) -> Result<(), CapabilityError> {
        self.events.lock().unwrap().push(SurfaceEvent::Zoomed(*extent));
        Ok(())
    }
}
