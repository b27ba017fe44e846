//! Highlight styling passed alongside query results and analysis requests.

use serde::{Deserialize, Serialize};

/// Fill-and-outline style applied to one highlight graphic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightStyle {
    /// RGBA fill color.
    pub fill: [u8; 4],
    /// RGB outline color.
    pub outline: [u8; 3],
    /// Outline weight in pixels.
    pub outline_weight: f32,
}

impl HighlightStyle {
    /// Creates a new highlight style.
    pub fn new(fill: [u8; 4], outline: [u8; 3], outline_weight: f32) -> Self {
        Self {
            fill,
            outline,
            outline_weight,
        }
    }
}

impl Default for HighlightStyle {
    /// The single consistent style used for query-result highlights.
    fn default() -> Self {
        Self::new([0, 255, 255, 96], [0, 255, 255], 1.5)
    }
}

/// Returns a basic set of named styles for analysis output.
pub fn default_analysis_styles() -> Vec<(String, HighlightStyle)> {
    vec![
        (
            "Buffer Orange".to_string(),
            HighlightStyle::new([255, 165, 0, 80], [255, 140, 0], 2.0),
        ),
        (
            "Intersection Magenta".to_string(),
            HighlightStyle::new([255, 0, 255, 80], [200, 0, 200], 2.0),
        ),
        (
            "Measurement Yellow".to_string(),
            HighlightStyle::new([255, 255, 0, 80], [220, 220, 0], 1.5),
        ),
    ]
}
