//! Configuration type definitions.

use crate::constants::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_DETECTION_FILE_CONFIDENCE, DEFAULT_IMAGE_BATCH_SIZE,
    DEFAULT_MAX_LAG_SECONDS, DEFAULT_VIDEO_BATCH_SIZE,
};
use serde::{Deserialize, Serialize};

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default settings.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Detector settings.
    #[serde(default)]
    pub detector: DetectorConfig,
}

/// Default analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Minimum fused score below which a label is reported as undefined.
    pub threshold: f32,

    /// Maximum gap in seconds between images of one sequence.
    pub max_lag_seconds: i64,

    /// Number of images processed per batch.
    pub batch_size: usize,

    /// Number of frames sampled per video.
    pub frames_per_video: usize,

    /// Output formats.
    pub formats: Vec<OutputFormat>,

    /// Species known absent from the study area, excluded from fusion.
    pub forbidden_species: Vec<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_lag_seconds: DEFAULT_MAX_LAG_SECONDS,
            batch_size: DEFAULT_IMAGE_BATCH_SIZE,
            frames_per_video: DEFAULT_VIDEO_BATCH_SIZE,
            formats: vec![OutputFormat::Csv],
            forbidden_species: Vec::new(),
        }
    }
}

/// Detector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Minimum box confidence for detection-file boxes.
    pub confidence: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_DETECTION_FILE_CONFIDENCE,
        }
    }
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Flat CSV, one row per media file.
    Csv,
    /// JSON report with settings and summary.
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
