//! Trapscan - camera-trap media classification CLI tool.
//!
//! Clusters camera-trap images into trigger-event sequences, replays object
//! detections over them and fuses per-item predictions into one verdict per
//! sequence.

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod constants;
pub mod detect;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod predict;
pub mod sequence;
pub mod taxonomy;

use clap::Parser;
use cli::{Cli, ClassifyArgs, Command, ConfigAction};
use config::{Config, load_default_config, save_default_config, validate_config};
use detect::{JsonDetector, PresenceClassifier};
use predict::{ImageOptions, ImagePredictor};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use taxonomy::ClassCatalog;
use tracing::{info, warn};

pub use error::{Error, Result};

/// Main entry point for the trapscan CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.classify.verbose, cli.classify.quiet);

    // Interruption is cooperative: the flag is checked between batches so a
    // batch in flight always completes before the run stops.
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&interrupted);
        if let Err(e) = ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        }) {
            warn!("Failed to install Ctrl+C handler: {e}");
        }
    }

    // Load configuration
    let config = load_default_config()?;
    validate_config(&config)?;

    // Handle subcommands
    if let Some(command) = cli.command {
        return handle_command(command);
    }

    // Show help if there is nothing to classify
    if cli.inputs.is_empty() && cli.classify.detections.is_none() {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        return Ok(());
    }

    classify_media(&cli.inputs, &cli.classify, &config, &interrupted)
}

/// Classify input files with the given options.
fn classify_media(
    inputs: &[PathBuf],
    args: &ClassifyArgs,
    config: &Config,
    interrupted: &AtomicBool,
) -> Result<()> {
    let detections_path = args.detections.as_ref().ok_or_else(|| Error::ConfigValidation {
        message: "no detection file specified (use --detections <file.json>)".to_string(),
    })?;

    info!("Loading detection file: {}", detections_path.display());
    let detector =
        JsonDetector::from_file(detections_path)?.with_confidence(config.detector.confidence);

    // Without explicit inputs the detection file defines the file list.
    let images = if inputs.is_empty() {
        detector.filenames()
    } else {
        let inventory = pipeline::collect_media_files(inputs)?;
        if !inventory.videos.is_empty() {
            warn!(
                "Skipping {} video(s): detection-file runs cover images only",
                inventory.videos.len()
            );
        }
        inventory.images
    };
    if images.is_empty() {
        return Err(Error::NoMediaFiles);
    }
    info!("Found {} image(s) to classify", images.len());

    // Resolve settings
    let threshold = args.threshold.unwrap_or(config.defaults.threshold);
    let max_lag_seconds = args.max_lag.unwrap_or(config.defaults.max_lag_seconds);
    let batch_size = args.batch_size.unwrap_or(config.defaults.batch_size);
    let formats = args
        .format
        .clone()
        .unwrap_or_else(|| config.defaults.formats.clone());
    let forbidden = if args.forbidden.is_empty() {
        config.defaults.forbidden_species.clone()
    } else {
        args.forbidden.clone()
    };

    let mut engine = ImagePredictor::from_paths(
        images,
        detector,
        PresenceClassifier,
        ClassCatalog::generic(),
        ImageOptions {
            threshold,
            max_lag_seconds,
            batch_size,
        },
    );
    if !forbidden.is_empty() {
        engine.set_forbidden_species(&forbidden)?;
    }

    let progress_enabled = !args.quiet;
    let completed = pipeline::drive_engine(&mut engine, interrupted, progress_enabled)?;
    if !completed {
        warn!("Run interrupted; writing partial results");
    }

    let records = output::collect_records(&engine, None);
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    pipeline::write_reports(
        &records,
        &output_dir,
        "observations",
        &formats,
        threshold,
        max_lag_seconds,
    )?;

    let occupied = records
        .iter()
        .filter(|r| !r.label.is_empty() && r.label != taxonomy::EMPTY_LABEL)
        .count();
    info!(
        "Complete: {} file(s) classified, {} with detections",
        records.len(),
        occupied
    );

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter_str = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    fmt().with_env_filter(filter).init();
}

fn handle_command(command: Command) -> Result<()> {
    match command {
        Command::Config { action } => handle_config_command(action),
        Command::Species => {
            println!("Animal classes of the default catalog:");
            for name in ClassCatalog::default_species().animal_classes() {
                println!("  {name}");
            }
            Ok(())
        }
    }
}

fn handle_config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let path = config::config_file_path()?;
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                let config = Config::default();
                let saved_path = save_default_config(&config)?;
                println!("Created configuration file: {}", saved_path.display());
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_default_config()?;
            println!("{config:#?}");
            Ok(())
        }
        ConfigAction::Path => {
            let path = config::config_file_path()?;
            println!("{}", path.display());
            Ok(())
        }
    }
}
