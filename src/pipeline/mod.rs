//! Processing pipeline: collect media files, drive a batch engine to
//! completion and write observation reports.

use crate::config::OutputFormat;
use crate::constants::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS, output_extensions};
use crate::error::Result;
use crate::output::{CsvWriter, JsonResultWriter, ObservationRecord, OutputWriter};
use crate::predict::BatchEngine;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Media files discovered under the input paths, split by kind.
#[derive(Debug, Default)]
pub struct MediaInventory {
    /// Still images, in discovery order.
    pub images: Vec<PathBuf>,
    /// Videos, in discovery order.
    pub videos: Vec<PathBuf>,
}

impl MediaInventory {
    /// Whether nothing was found.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.videos.is_empty()
    }
}

/// Collect media files from paths (files and directories, recursively).
pub fn collect_media_files(paths: &[PathBuf]) -> Result<MediaInventory> {
    let mut inventory = MediaInventory::default();

    for path in paths {
        if path.is_file() {
            classify_path(path.clone(), &mut inventory);
        } else if path.is_dir() {
            collect_recursive(path, &mut inventory)?;
        } else {
            warn!("Skipping non-existent path: {}", path.display());
        }
    }

    Ok(inventory)
}

fn collect_recursive(dir: &Path, inventory: &mut MediaInventory) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            collect_recursive(&path, inventory)?;
        } else {
            classify_path(path, inventory);
        }
    }

    Ok(())
}

fn classify_path(path: PathBuf, inventory: &mut MediaInventory) {
    if has_extension_in(&path, IMAGE_EXTENSIONS) {
        inventory.images.push(path);
    } else if has_extension_in(&path, VIDEO_EXTENSIONS) {
        inventory.videos.push(path);
    }
}

fn has_extension_in(path: &Path, extensions: &[&str]) -> bool {
    use std::ffi::OsStr;

    path.extension().is_some_and(|ext| {
        extensions
            .iter()
            .any(|e| ext.eq_ignore_ascii_case(OsStr::new(e)))
    })
}

/// Output file path for a report of the given format.
pub fn output_path_for(output_dir: &Path, stem: &str, format: OutputFormat) -> PathBuf {
    let extension = match format {
        OutputFormat::Csv => output_extensions::CSV,
        OutputFormat::Json => output_extensions::JSON,
    };
    output_dir.join(format!("{stem}{extension}"))
}

/// Drive an engine until it is drained or the run is interrupted.
///
/// The interrupt flag is checked between batches only; the current batch
/// always finishes, so the engine state stays consistent. Returns `true`
/// when every item was processed.
pub fn drive_engine<E: BatchEngine>(
    engine: &mut E,
    interrupted: &AtomicBool,
    progress_enabled: bool,
) -> Result<bool> {
    let progress = create_item_progress(engine.num_items(), progress_enabled);

    while !engine.is_done() {
        if interrupted.load(Ordering::SeqCst) {
            info!("Interrupted, stopping after current batch");
            if let Some(pb) = &progress {
                pb.abandon();
            }
            return Ok(false);
        }
        let step = engine.next_batch()?;
        if let Some(pb) = &progress {
            pb.inc(step.processed.len() as u64);
        }
    }

    if let Some(pb) = &progress {
        pb.finish();
    }
    Ok(true)
}

fn create_item_progress(total: usize, enabled: bool) -> Option<ProgressBar> {
    if !enabled || total == 0 {
        return None;
    }

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    Some(pb)
}

/// Write observation records to one report file per requested format.
pub fn write_reports(
    records: &[ObservationRecord],
    output_dir: &Path,
    stem: &str,
    formats: &[OutputFormat],
    threshold: f32,
    max_lag_seconds: i64,
) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;

    for format in formats {
        let output_path = output_path_for(output_dir, stem, *format);
        info!("Writing {} report: {}", format, output_path.display());

        let mut writer: Box<dyn OutputWriter> = match format {
            OutputFormat::Csv => Box::new(CsvWriter::new(&output_path)?),
            OutputFormat::Json => Box::new(JsonResultWriter::new(
                &output_path,
                threshold,
                max_lag_seconds,
            )),
        };

        writer.write_header()?;
        for record in records {
            writer.write_record(record)?;
        }
        writer.finalize()?;
    }

    Ok(())
}
