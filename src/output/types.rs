//! Output type definitions.

use serde::{Deserialize, Serialize};

/// One classified media file, flattened for export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Path to the source media file.
    pub file: String,
    /// Capture date, or `NA` when unknown.
    pub date: String,
    /// Sequence id the file belongs to.
    pub sequence: u32,
    /// Fused label; `undefined` when the score fell below the threshold.
    pub label: String,
    /// Fused confidence, truncated to two decimals.
    pub score: f32,
    /// Best class regardless of the threshold.
    pub top1: String,
    /// Number of detected instances.
    pub count: u32,
    /// Number of detected humans.
    pub human_count: u32,
    /// Best box, left edge in pixels.
    pub xmin: f32,
    /// Best box, top edge in pixels.
    pub ymin: f32,
    /// Best box, right edge in pixels.
    pub xmax: f32,
    /// Best box, bottom edge in pixels.
    pub ymax: f32,
    /// Frame index illustrating the verdict; videos only.
    pub key_frame: Option<u64>,
}
