//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "trapscan";

/// Sentinel logit assigned to the human, vehicle and empty columns when a
/// detector flags an item, and to the empty column of untouched items.
///
/// The value only needs to dominate a softmax over real classifier logits;
/// it is never compared across items.
pub const DEFAULT_LOGIT: f32 = 15.0;

/// Temperature divisor applied to averaged logits when a sequence contributed
/// exactly one animal row. Single-frame predictions are softened before the
/// score is compared against the confidence threshold.
pub const SINGLE_ROW_TEMPERATURE: f32 = 1.06;

/// Default confidence threshold below which a fused label is reported as
/// undefined.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.8;

/// Default maximum gap in seconds between consecutive images of the same
/// sequence.
pub const DEFAULT_MAX_LAG_SECONDS: i64 = 10;

/// Default batch size for the image engine (items per `next_batch` call).
pub const DEFAULT_IMAGE_BATCH_SIZE: usize = 8;

/// Default number of frames sampled per video.
pub const DEFAULT_VIDEO_BATCH_SIZE: usize = 12;

/// Default confidence threshold for boxes read from a MegaDetector-style
/// detection file. Boxes at or below this confidence are treated as empty.
pub const DEFAULT_DETECTION_FILE_CONFIDENCE: f32 = 0.4;

/// EXIF / report timestamp format (`2024:03:01 12:30:00`).
pub const TIMESTAMP_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Placeholder emitted for items without a parsable timestamp.
pub const UNKNOWN_DATE: &str = "NA";

/// Supported image file extensions.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "gif"];

/// Supported video file extensions.
pub const VIDEO_EXTENSIONS: &[&str] = &["avi", "mp4", "mov", "mkv"];

/// Output file extensions by format.
pub mod output_extensions {
    /// CSV output extension.
    pub const CSV: &str = ".trapscan.csv";
    /// JSON output extension.
    pub const JSON: &str = ".trapscan.json";
}

/// Confidence value bounds.
pub mod confidence {
    /// Minimum valid confidence value.
    pub const MIN: f32 = 0.0;
    /// Maximum valid confidence value.
    pub const MAX: f32 = 1.0;
}
