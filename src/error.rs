//! Error types for trapscan.

/// Result type alias for trapscan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for trapscan.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// No supported media files found.
    #[error("no supported media files found in the provided paths")]
    NoMediaFiles,

    /// A species name does not exist in the class catalog.
    #[error("unknown species '{name}' (not in the class catalog)")]
    UnknownSpecies {
        /// The unrecognized species name.
        name: String,
    },

    /// Failed to read a detection file.
    #[error("failed to read detection file '{path}'")]
    DetectionFileRead {
        /// Path to the detection file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a detection file.
    #[error("failed to parse detection file '{path}'")]
    DetectionFileParse {
        /// Path to the detection file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Detection failed for a single item.
    #[error("detection failed: {reason}")]
    Detection {
        /// Description of the detection failure.
        reason: String,
    },

    /// Classification failed for a batch of crops.
    #[error("classification failed: {reason}")]
    Classification {
        /// Description of the classification failure.
        reason: String,
    },

    /// Failed to open a video for frame sampling.
    #[error("failed to open video '{path}': {reason}")]
    VideoOpen {
        /// Path to the video file.
        path: std::path::PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// Merge was attempted while an engine still had unprocessed items.
    ///
    /// Merging mid-batch is a programming error; both engines must be driven
    /// to completion first.
    #[error("cannot merge: engine has unprocessed items ({remaining} remaining)")]
    MergeWhileRunning {
        /// Number of items the engine has not yet processed.
        remaining: usize,
    },

    /// Failed to write CSV output.
    #[error("failed to write CSV output '{path}'")]
    CsvWrite {
        /// Path to the CSV file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: csv::Error,
    },

    /// Failed to write JSON output.
    #[error("failed to write JSON output '{path}'")]
    JsonWrite {
        /// Path to the JSON file.
        path: std::path::PathBuf,
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },
}
