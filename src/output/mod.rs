//! Output format writers.

mod csv;
mod json;
mod types;
mod writer;

pub use csv::CsvWriter;
pub use json::{JsonResultFile, JsonResultWriter, JsonSettings, JsonSummary};
pub use types::ObservationRecord;
pub use writer::OutputWriter;

use crate::predict::BatchEngine;

/// Flatten a drained engine's state into one record per media file.
///
/// `key_frames` carries the per-item key frame indices of a video engine;
/// pass `None` for images. Items whose sequence was never fused (an engine
/// drained mid-run) get a blank label at zero confidence.
pub fn collect_records<E: BatchEngine>(
    engine: &E,
    key_frames: Option<&[u64]>,
) -> Vec<ObservationRecord> {
    let state = engine.state();
    let manager = engine.sequences();
    (0..manager.len())
        .map(|k| {
            let file = manager.file(k);
            let (label, score, top1) = state.fused(k).map_or_else(
                || (String::new(), 0.0, String::new()),
                |f| (f.label.clone(), f.score, f.top1.clone()),
            );
            let [xmin, ymin, xmax, ymax] = state.best_box(k);
            ObservationRecord {
                file: file.path().display().to_string(),
                date: file.timestamp().to_string(),
                sequence: file.seq(),
                label,
                score,
                top1,
                count: state.count(k),
                human_count: state.human_count(k),
                xmin,
                ymin,
                xmax,
                ymax,
                key_frame: key_frames.map(|frames| frames[k]),
            }
        })
        .collect()
}
