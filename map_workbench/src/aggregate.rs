//! Grouping of results and highlight/zoom command generation.

use log::debug;

use crate::analysis::AnalysisResult;
use crate::capability::{CapabilityError, HighlightHandle, RenderSurface};
use crate::geometry::{combined_extent, Extent, Geometry};
use crate::query::SearchResult;
use crate::styles::HighlightStyle;

/// One named group of result features or geometries.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultGroup {
    /// Dataset id for search results, output type for analysis results.
    pub key: String,
    pub count: usize,
}

/// Grouped, countable view over a search or analysis result.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedResult {
    pub groups: Vec<ResultGroup>,
    pub total_count: usize,
    /// Combined extent of every result geometry; the zoom target.
    pub zoom_extent: Option<Extent>,
}

/// Groups search hits by dataset id.
pub fn aggregate_search(result: &SearchResult) -> GroupedResult {
    let groups = result
        .hits
        .iter()
        .map(|h| ResultGroup {
            key: h.dataset_id.clone(),
            count: h.features.len(),
        })
        .collect();
    let zoom_extent = combined_extent(
        result
            .hits
            .iter()
            .flat_map(|h| h.features.iter().map(|f| &f.geometry)),
    );
    GroupedResult {
        groups,
        total_count: result.total_count(),
        zoom_extent,
    }
}

/// Groups analysis outputs by their `type` provenance attribute.
pub fn aggregate_analysis(result: &AnalysisResult) -> GroupedResult {
    let mut groups: Vec<ResultGroup> = Vec::new();
    for output in &result.outputs {
        let key = match output.output_type() {
            "" => result.kind.label(),
            t => t,
        };
        match groups.iter_mut().find(|g| g.key == key) {
            Some(group) => group.count += 1,
            None => groups.push(ResultGroup {
                key: key.to_string(),
                count: 1,
            }),
        }
    }
    let zoom_extent = combined_extent(result.outputs.iter().map(|o| &o.geometry));
    GroupedResult {
        groups,
        total_count: result.outputs.len(),
        zoom_extent,
    }
}

/// Tracks the active highlight set and replaces it atomically.
///
/// Old highlights are always removed before any new highlight is added, so
/// two consecutive runs never interleave on the surface.
#[derive(Debug, Default)]
pub struct HighlightSet {
    handles: Vec<HighlightHandle>,
}

impl HighlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles of the currently active highlights.
    pub fn handles(&self) -> &[HighlightHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Replaces the active highlight set with one highlight per geometry.
    pub async fn replace(
        &mut self,
        surface: &dyn RenderSurface,
        geometries: &[Geometry],
        style: &HighlightStyle,
    ) -> Result<(), CapabilityError> {
        self.clear(surface).await?;
        for geometry in geometries {
            let handle = surface.add_highlight(geometry, style).await?;
            self.handles.push(handle);
        }
        debug!("highlight set replaced with {} graphics", self.handles.len());
        Ok(())
    }

    /// Removes every active highlight.
    pub async fn clear(&mut self, surface: &dyn RenderSurface) -> Result<(), CapabilityError> {
        for handle in self.handles.drain(..) {
            surface.remove_highlight(handle).await?;
        }
        Ok(())
    }
}
