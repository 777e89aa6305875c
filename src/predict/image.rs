//! Incremental batch engine for still images.

use super::aggregate::fuse_sequence;
use super::state::PredictionState;
use super::{BatchCursor, BatchEngine, BatchStep};
use crate::constants::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IMAGE_BATCH_SIZE, DEFAULT_LOGIT, DEFAULT_MAX_LAG_SECONDS,
};
use crate::detect::{BoundingBox, Category, Classifier, Detection, Detector, MediaSource};
use crate::error::{Error, Result};
use crate::sequence::{MediaRecord, SequenceManager};
use crate::taxonomy::ClassCatalog;
use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Tuning knobs of the image engine.
#[derive(Debug, Clone, Copy)]
pub struct ImageOptions {
    /// Minimum fused score below which a label is reported as undefined.
    pub threshold: f32,
    /// Maximum gap between consecutive images of one sequence.
    pub max_lag_seconds: i64,
    /// Number of images processed per `next_batch` call.
    pub batch_size: usize,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_lag_seconds: DEFAULT_MAX_LAG_SECONDS,
            batch_size: DEFAULT_IMAGE_BATCH_SIZE,
        }
    }
}

/// Batch engine over still images.
///
/// Construction clusters the files into sequences and reorders the arena so
/// every sequence is a contiguous run. Each `next_batch` call detects a
/// window of images, classifies the animal crops in one classifier batch,
/// then re-fuses every sequence fully covered so far. A sequence that
/// straddles the current batch boundary is deferred: its items stay pending
/// until a later batch completes it.
pub struct ImagePredictor<D, C> {
    manager: SequenceManager,
    detector: D,
    classifier: C,
    catalog: ClassCatalog,
    state: PredictionState,
    cursor: BatchCursor,
    threshold: f32,
    max_lag_seconds: i64,
    batch_size: usize,
    forbidden: Vec<usize>,
    human_boxes: HashMap<PathBuf, Vec<BoundingBox>>,
}

impl<D: Detector, C: Classifier> ImagePredictor<D, C> {
    /// Build an engine over explicit records (path plus capture timestamp).
    pub fn new(
        records: Vec<MediaRecord>,
        detector: D,
        classifier: C,
        catalog: ClassCatalog,
        options: ImageOptions,
    ) -> Self {
        let mut manager = SequenceManager::from_records(records);
        manager.find_sequences(options.max_lag_seconds);
        manager.reorder_by_seqnum();
        let n = manager.len();
        let state = PredictionState::new(n, &catalog);
        let cursor = BatchCursor::new(options.batch_size, n);
        Self {
            manager,
            detector,
            classifier,
            catalog,
            state,
            cursor,
            threshold: options.threshold,
            max_lag_seconds: options.max_lag_seconds,
            batch_size: options.batch_size,
            forbidden: Vec::new(),
            human_boxes: HashMap::new(),
        }
    }

    /// Build an engine over paths, extracting timestamps from the files.
    pub fn from_paths(
        paths: Vec<PathBuf>,
        detector: D,
        classifier: C,
        catalog: ClassCatalog,
        options: ImageOptions,
    ) -> Self {
        let records = paths.into_iter().map(MediaRecord::from_path).collect();
        Self::new(records, detector, classifier, catalog, options)
    }

    /// Class catalog this engine fuses against.
    pub fn catalog(&self) -> &ClassCatalog {
        &self.catalog
    }

    /// Adjust the confidence threshold for future fusions.
    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    /// Mark species as absent from the study area, excluding their columns
    /// from every future fusion.
    pub fn set_forbidden_species(&mut self, names: &[String]) -> Result<()> {
        self.forbidden = self.catalog.resolve_species(names)?;
        Ok(())
    }

    /// Human boxes recorded for a file, if any were detected.
    pub fn human_boxes(&self, path: &Path) -> Option<&[BoundingBox]> {
        self.human_boxes.get(path).map(Vec::as_slice)
    }

    /// Fuse a single item's logits in isolation, ignoring its sequence.
    ///
    /// Gives a per-image verdict for display next to the sequence-level one.
    pub fn fuse_item(&self, k: usize) -> super::Fused {
        fuse_sequence(
            &[self.state.logits(k)],
            &self.catalog,
            &self.forbidden,
            self.threshold,
        )
    }

    /// Override the verdict of item `k` and propagate it to every other item
    /// of the same sequence.
    pub fn set_predicted_class_in_sequence(&mut self, k: usize, label: &str, score: f32) {
        let seq = self.manager.seq(k);
        self.state.set_predicted_class(k, label, score);
        let mut left = k;
        while left > 0 && self.manager.seq(left - 1) == seq {
            left -= 1;
            self.state.set_predicted_class(left, label, score);
        }
        let mut right = k;
        while right + 1 < self.manager.len() && self.manager.seq(right + 1) == seq {
            right += 1;
            self.state.set_predicted_class(right, label, score);
        }
    }

    /// Re-fuse every sequence, including one still straddling the cursor.
    ///
    /// Call after the engine is drained or after manual threshold changes.
    pub fn correct_all(&mut self) {
        self.fuse_range(0, self.manager.len());
    }

    /// Absorb a drained sibling engine, continuing the sequence numbering.
    ///
    /// Both engines must have finished processing; merging mid-run would
    /// leave half-written batches behind, so that is an error. When the
    /// junction files belong to one burst their sequences collapse and the
    /// junction sequence is re-fused immediately. The cursor resumes at the
    /// first absorbed item, so `next_batch` keeps reporting correction
    /// windows over the absorbed range.
    pub fn merge(&mut self, other: Self) -> Result<()> {
        if !self.cursor.is_done() || !other.cursor.is_done() {
            let remaining = (self.manager.len() - self.cursor.k1().min(self.manager.len()))
                + (other.manager.len() - other.cursor.k1().min(other.manager.len()));
            return Err(Error::MergeWhileRunning { remaining });
        }

        let junction = self.manager.len();
        self.manager.merge(other.manager, self.max_lag_seconds);
        self.state.merge(other.state);
        self.detector.merge(other.detector);
        self.human_boxes.extend(other.human_boxes);

        // The junction sequence may now span both halves; re-fuse it.
        if junction > 0 && junction < self.manager.len() {
            let seq = self.manager.seq(junction - 1);
            if self.manager.seq(junction) == seq {
                let mut from = junction - 1;
                while from > 0 && self.manager.seq(from - 1) == seq {
                    from -= 1;
                }
                let mut to = junction + 1;
                while to < self.manager.len() && self.manager.seq(to) == seq {
                    to += 1;
                }
                self.fuse_items(from, to);
            }
        }

        self.cursor = BatchCursor::resume_at(junction, self.batch_size, self.manager.len());
        Ok(())
    }

    /// Fuse and correct every sequence fully covered by `[0, k2)`.
    ///
    /// The window grows left to the start of the first overlapped sequence.
    /// When the last sequence continues into the next batch it is excluded,
    /// so its items keep their pending verdicts until the sequence completes.
    fn correct_window(&mut self, k1: usize, k2: usize) -> Range<usize> {
        let n = self.manager.len();
        let mut k1s = k1;
        while k1s > 0 && self.manager.seq(k1s - 1) == self.manager.seq(k1) {
            k1s -= 1;
        }
        let mut k2s = k2;
        if k2s < n && self.manager.seq(k2s) == self.manager.seq(k2s - 1) {
            while k2s > 1 && self.manager.seq(k2s - 1) == self.manager.seq(k2 - 1) {
                k2s -= 1;
            }
        }
        if k2s <= k1s {
            return k1s..k1s;
        }
        self.fuse_range(k1s, k2s);
        k1s..k2s
    }

    fn fuse_range(&mut self, from: usize, to: usize) {
        let mut i = from;
        while i < to {
            let seq = self.manager.seq(i);
            let mut j = i + 1;
            while j < to && self.manager.seq(j) == seq {
                j += 1;
            }
            self.fuse_items(i, j);
            i = j;
        }
    }

    fn fuse_items(&mut self, from: usize, to: usize) {
        let fused = {
            let rows: Vec<&[f32]> = (from..to).map(|k| self.state.logits(k)).collect();
            fuse_sequence(&rows, &self.catalog, &self.forbidden, self.threshold)
        };
        for k in from..to {
            self.state.set_fused(k, fused.clone());
        }
    }
}

impl<D: Detector, C: Classifier> BatchEngine for ImagePredictor<D, C> {
    fn next_batch(&mut self) -> Result<BatchStep> {
        if self.cursor.is_done() {
            return Ok(BatchStep::done(self.cursor.batch(), self.manager.len()));
        }
        let (k1, k2) = (self.cursor.k1(), self.cursor.k2());

        let mut crops = Vec::new();
        let mut crop_items = Vec::new();
        for k in k1..k2 {
            let path = self.manager.file(k).path().to_path_buf();
            let detection = match self.detector.detect(MediaSource::Path(&path)) {
                Ok(detection) => detection,
                Err(e) => {
                    warn!("Detection failed for {}: {e}", path.display());
                    Detection::empty()
                }
            };
            self.state.set_count(k, detection.count);
            #[allow(clippy::cast_possible_truncation)]
            self.state
                .set_human_count(k, detection.human_boxes.len() as u32);
            if !detection.human_boxes.is_empty() {
                self.human_boxes.insert(path.clone(), detection.human_boxes);
            }
            match detection.category {
                Category::Empty => {}
                Category::Human => {
                    self.state.clear_empty(k);
                    self.state
                        .set_logit(k, self.catalog.human_index(), DEFAULT_LOGIT);
                    self.state.set_best_box(k, detection.bbox);
                }
                Category::Vehicle => {
                    self.state.clear_empty(k);
                    self.state
                        .set_logit(k, self.catalog.vehicle_index(), DEFAULT_LOGIT);
                    self.state.set_best_box(k, detection.bbox);
                }
                Category::Animal => {
                    if let Some(crop) = detection.crop {
                        self.state.clear_empty(k);
                        self.state.set_best_box(k, detection.bbox);
                        crops.push(crop);
                        crop_items.push(k);
                    } else {
                        warn!("Animal box without crop in {}", path.display());
                    }
                }
            }
        }

        if !crops.is_empty() {
            match self.classifier.classify_batch(&crops) {
                Ok(logits) => {
                    for (&k, row) in crop_items.iter().zip(&logits) {
                        self.state.set_animal_logits(k, row);
                    }
                }
                Err(e) => {
                    warn!("Classification failed for batch {}: {e}", self.cursor.batch());
                    for &k in &crop_items {
                        self.state.reset_row(k);
                    }
                }
            }
        }

        let corrected = self.correct_window(k1, k2);
        let step = BatchStep {
            batch: self.cursor.batch(),
            processed: k1..k2,
            corrected,
        };
        self.cursor.advance(self.batch_size);
        Ok(step)
    }

    fn is_done(&self) -> bool {
        self.cursor.is_done()
    }

    fn num_items(&self) -> usize {
        self.manager.len()
    }

    fn state(&self) -> &PredictionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PredictionState {
        &mut self.state
    }

    fn sequences(&self) -> &SequenceManager {
        &self.manager
    }
}
