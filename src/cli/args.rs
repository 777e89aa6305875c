//! CLI argument definitions.

use crate::config::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Camera-trap media classification with sequence-level aggregation.
#[derive(Debug, Parser)]
#[command(name = "trapscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Input files or directories to classify.
    pub inputs: Vec<PathBuf>,

    /// Common options for classification.
    #[command(flatten)]
    pub classify: ClassifyArgs,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// List the animal classes of the default catalog.
    Species,
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Arguments for the classify command.
#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// MegaDetector-style detection file to replay instead of running a
    /// detector.
    #[arg(short, long, env = "TRAPSCAN_DETECTIONS")]
    pub detections: Option<PathBuf>,

    /// Output formats (comma-separated: csv,json).
    #[arg(short, long, value_delimiter = ',', env = "TRAPSCAN_FORMAT")]
    pub format: Option<Vec<OutputFormat>>,

    /// Output directory (default: current directory).
    #[arg(short, long, env = "TRAPSCAN_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Confidence threshold below which labels are undefined (0.0-1.0).
    #[arg(short = 'c', long, value_parser = parse_confidence, env = "TRAPSCAN_THRESHOLD")]
    pub threshold: Option<f32>,

    /// Maximum gap in seconds between images of one sequence.
    #[arg(long, env = "TRAPSCAN_MAX_LAG")]
    pub max_lag: Option<i64>,

    /// Number of images processed per batch.
    #[arg(short, long, env = "TRAPSCAN_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Species absent from the study area (comma-separated), excluded from
    /// fusion.
    #[arg(long, value_delimiter = ',')]
    pub forbidden: Vec<String>,

    /// Suppress progress output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv/-vvv: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse and validate confidence value.
fn parse_confidence(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(0.0..=1.0).contains(&value) {
        return Err(format!(
            "confidence must be between 0.0 and 1.0, got {value}"
        ));
    }

    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_confidence_valid() {
        assert_eq!(parse_confidence("0.5").ok(), Some(0.5));
        assert_eq!(parse_confidence("0.0").ok(), Some(0.0));
        assert_eq!(parse_confidence("1.0").ok(), Some(1.0));
    }

    #[test]
    fn test_parse_confidence_invalid() {
        assert!(parse_confidence("1.5").is_err());
        assert!(parse_confidence("-0.1").is_err());
        assert!(parse_confidence("abc").is_err());
    }

    #[test]
    fn test_cli_parse_simple() {
        let cli = Cli::try_parse_from(["trapscan", "cam1/"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        assert_eq!(cli.inputs.len(), 1);
    }

    #[test]
    fn test_cli_parse_with_options() {
        let cli = Cli::try_parse_from([
            "trapscan",
            "cam1/",
            "-c",
            "0.25",
            "--max-lag",
            "30",
            "-q",
        ]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        assert_eq!(cli.classify.threshold, Some(0.25));
        assert_eq!(cli.classify.max_lag, Some(30));
        assert!(cli.classify.quiet);
    }

    #[test]
    fn test_cli_parse_forbidden_list() {
        let cli = Cli::try_parse_from(["trapscan", "cam1/", "--forbidden", "bison,reindeer"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        assert_eq!(
            cli.classify.forbidden,
            vec!["bison".to_string(), "reindeer".to_string()]
        );
    }

    #[test]
    fn test_cli_parse_formats() {
        let cli = Cli::try_parse_from(["trapscan", "cam1/", "-f", "csv,json"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        assert_eq!(
            cli.classify.format,
            Some(vec![OutputFormat::Csv, OutputFormat::Json])
        );
    }

    #[test]
    fn test_cli_parse_config_subcommand() {
        let cli = Cli::try_parse_from(["trapscan", "config", "show"]);
        assert!(cli.is_ok());
    }
}
