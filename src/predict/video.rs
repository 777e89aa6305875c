//! Incremental batch engine for videos.
//!
//! One video per batch: a fixed budget of frames is sampled (densely at the
//! start of the clip, sparsely over the remainder, animals usually trigger
//! the camera early), each sampled frame is detected and classified, and the
//! frame rows are fused exactly like an image sequence. The video's verdict
//! never depends on other videos, so every file is its own sequence.

use super::aggregate::fuse_sequence;
use super::state::PredictionState;
use super::{BatchCursor, BatchEngine, BatchStep};
use crate::constants::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_LOGIT, DEFAULT_VIDEO_BATCH_SIZE};
use crate::detect::{BoundingBox, Category, Classifier, Detection, Detector, MediaSource};
use crate::error::{Error, Result};
use crate::sequence::SequenceManager;
use crate::taxonomy::{ClassCatalog, HUMAN_LABEL, VEHICLE_LABEL};
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::warn;

/// An opened video clip.
pub trait VideoClip {
    /// Number of frames in the clip.
    fn total_frames(&self) -> u64;

    /// Frame rate, rounded down to whole frames per second.
    fn fps(&self) -> u32;

    /// Decode the frame at `index`, or `None` when it cannot be read.
    fn read_frame(&mut self, index: u64) -> Option<RgbImage>;
}

/// Opens video files for frame sampling.
pub trait FrameSource {
    /// Clip type produced by this source.
    type Clip: VideoClip;

    /// Open a video file.
    fn open(&mut self, path: &Path) -> Result<Self::Clip>;
}

/// Tuning knobs of the video engine.
#[derive(Debug, Clone, Copy)]
pub struct VideoOptions {
    /// Minimum fused score below which a label is reported as undefined.
    pub threshold: f32,
    /// Number of frames sampled per video.
    pub frames_per_video: usize,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            frames_per_video: DEFAULT_VIDEO_BATCH_SIZE,
        }
    }
}

/// Frame indices to sample from a clip of `total_frames` at `fps`.
///
/// Two thirds of the budget lands at the start of the clip, one frame every
/// third of a second (tightened when the clip is shorter than that span);
/// the rest is spread evenly over the remaining duration. Indices may reach
/// past the last frame on short clips; those reads fail and the slots stay
/// empty. Returns an empty schedule for an empty clip.
pub fn sample_schedule(total_frames: u64, fps: u32, budget: usize) -> Vec<u64> {
    if total_frames == 0 || budget == 0 {
        return Vec::new();
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[allow(clippy::cast_precision_loss)]
    let nb_begin = ((budget as f64 * 2.0 / 3.0 + 0.5) as usize).clamp(1, budget);
    let nb_remain = budget - nb_begin;

    let total = i64::try_from(total_frames).unwrap_or(i64::MAX);
    let mut lag_begin = i64::from(fps / 3);
    while lag_begin > 0 && (nb_begin as i64 - 1) * lag_begin > total {
        lag_begin -= 1;
    }
    let mut schedule: Vec<i64> = (0..nb_begin as i64).map(|k| k * lag_begin).collect();

    if nb_remain > 0 {
        let last = *schedule.last().unwrap_or(&0);
        let lag_remain = (total - last) / nb_remain as i64;
        if lag_remain > 0 {
            schedule.extend((0..nb_remain as i64).map(|k| last + (k + 1) * lag_remain));
        }
    }

    #[allow(clippy::cast_sign_loss)]
    schedule.into_iter().map(|k| k as u64).collect()
}

/// Batch engine over videos.
///
/// A clip that cannot be opened, or reports zero frames, is treated as empty
/// rather than failing the run. Unsampled frame slots keep the empty
/// sentinel and take part in the fusion, diluting weak single-frame
/// evidence on short clips.
pub struct VideoPredictor<D, C, S> {
    manager: SequenceManager,
    detector: D,
    classifier: C,
    source: S,
    catalog: ClassCatalog,
    state: PredictionState,
    cursor: BatchCursor,
    threshold: f32,
    frames_per_video: usize,
    forbidden: Vec<usize>,
    keyframes: Vec<u64>,
}

impl<D: Detector, C: Classifier, S: FrameSource> VideoPredictor<D, C, S> {
    /// Build an engine over video paths; every video is its own sequence.
    pub fn new(
        paths: Vec<PathBuf>,
        detector: D,
        classifier: C,
        source: S,
        catalog: ClassCatalog,
        options: VideoOptions,
    ) -> Self {
        let manager = SequenceManager::from_paths(paths);
        let n = manager.len();
        let state = PredictionState::new(n, &catalog);
        let cursor = BatchCursor::new(1, n);
        Self {
            manager,
            detector,
            classifier,
            source,
            catalog,
            state,
            cursor,
            threshold: options.threshold,
            frames_per_video: options.frames_per_video,
            forbidden: Vec::new(),
            keyframes: vec![0; n],
        }
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

    /// Frame index best illustrating the verdict of video `k`.
    pub fn key_frame(&self, k: usize) -> u64 {
        self.keyframes[k]
    }

    /// Key frame indices for all videos, in arena order.
    pub fn key_frames(&self) -> &[u64] {
        &self.keyframes
    }

    /// Absorb a drained sibling engine.
    ///
    /// Videos never share a sequence, so the junction never collapses and no
    /// verdict needs recomputing: the merged engine stays drained. Merging
    /// mid-run is an error, as for the image engine.
    pub fn merge(&mut self, other: Self) -> Result<()> {
        if !self.cursor.is_done() || !other.cursor.is_done() {
            let remaining = (self.manager.len() - self.cursor.k1().min(self.manager.len()))
                + (other.manager.len() - other.cursor.k1().min(other.manager.len()));
            return Err(Error::MergeWhileRunning { remaining });
        }
        self.manager.append(other.manager);
        self.state.merge(other.state);
        self.keyframes.extend(other.keyframes);
        self.detector.merge(other.detector);
        let n = self.manager.len();
        self.cursor = BatchCursor::resume_at(n, 1, n);
        Ok(())
    }

    /// Detect and classify the sampled frames of the video at `k`, filling
    /// one local logit row per frame slot.
    fn process_frames(
        &mut self,
        k: usize,
        rows: &mut [Vec<f32>],
        boxes: &mut [BoundingBox],
    ) -> (Vec<u64>, Vec<usize>, Vec<usize>) {
        let path = self.manager.file(k).path().to_path_buf();
        let mut clip = match self.source.open(&path) {
            Ok(clip) => clip,
            Err(e) => {
                warn!("Cannot open video {}: {e}", path.display());
                return (Vec::new(), Vec::new(), Vec::new());
            }
        };
        let total = clip.total_frames();
        if total == 0 {
            // Corrupted video, considered as empty.
            return (Vec::new(), Vec::new(), Vec::new());
        }

        let schedule = sample_schedule(total, clip.fps(), self.frames_per_video);
        let empty_index = self.catalog.empty_index();
        let mut nonempty = Vec::new();
        let mut animal_slots = Vec::new();
        let mut crops = Vec::new();
        let mut max_count = 0u32;
        let mut max_humans = 0u32;

        for (slot, &frame_index) in schedule.iter().enumerate() {
            let Some(frame) = clip.read_frame(frame_index) else {
                continue;
            };
            let detection = match self.detector.detect(MediaSource::Frame(&frame)) {
                Ok(detection) => detection,
                Err(e) => {
                    warn!("Detection failed on frame {frame_index} of {}: {e}", path.display());
                    Detection::empty()
                }
            };
            boxes[slot] = detection.bbox;
            max_count = max_count.max(detection.count);
            #[allow(clippy::cast_possible_truncation)]
            {
                max_humans = max_humans.max(detection.human_boxes.len() as u32);
            }
            match detection.category {
                Category::Empty => {}
                Category::Human => {
                    rows[slot][empty_index] = 0.0;
                    rows[slot][self.catalog.human_index()] = DEFAULT_LOGIT;
                    nonempty.push(slot);
                }
                Category::Vehicle => {
                    rows[slot][empty_index] = 0.0;
                    rows[slot][self.catalog.vehicle_index()] = DEFAULT_LOGIT;
                    nonempty.push(slot);
                }
                Category::Animal => {
                    if let Some(crop) = detection.crop {
                        rows[slot][empty_index] = 0.0;
                        nonempty.push(slot);
                        animal_slots.push(slot);
                        crops.push(crop);
                    } else {
                        warn!("Animal box without crop in {}", path.display());
                    }
                }
            }
        }

        if !crops.is_empty() {
            match self.classifier.classify_batch(&crops) {
                Ok(logits) => {
                    for (&slot, row) in animal_slots.iter().zip(&logits) {
                        rows[slot][..row.len()].copy_from_slice(row);
                    }
                }
                Err(e) => {
                    warn!("Classification failed for {}: {e}", path.display());
                    for &slot in &animal_slots {
                        rows[slot] = default_row(self.catalog.row_len(), empty_index);
                        nonempty.retain(|s| s != &slot);
                    }
                    animal_slots.clear();
                }
            }
        }

        self.state.set_count(k, max_count);
        self.state.set_human_count(k, max_humans);
        (schedule, nonempty, animal_slots)
    }

    /// Pick the sampled frame that best supports the fused label.
    fn select_key_slot(&self, label: &str, rows: &[Vec<f32>], nonempty: &[usize]) -> usize {
        let column_max = |col: usize| {
            nonempty
                .iter()
                .copied()
                .max_by(|&a, &b| rows[a][col].total_cmp(&rows[b][col]))
                .unwrap_or(0)
        };
        if label == HUMAN_LABEL {
            column_max(self.catalog.human_index())
        } else if label == VEHICLE_LABEL {
            column_max(self.catalog.vehicle_index())
        } else {
            // Frame holding the single highest animal logit.
            nonempty
                .iter()
                .copied()
                .max_by(|&a, &b| {
                    let max_a = rows[a][..self.catalog.num_animal_classes()]
                        .iter()
                        .fold(f32::MIN, |m, &v| m.max(v));
                    let max_b = rows[b][..self.catalog.num_animal_classes()]
                        .iter()
                        .fold(f32::MIN, |m, &v| m.max(v));
                    max_a.total_cmp(&max_b)
                })
                .unwrap_or(0)
        }
    }
}

fn default_row(row_len: usize, empty_index: usize) -> Vec<f32> {
    let mut row = vec![0.0; row_len];
    row[empty_index] = DEFAULT_LOGIT;
    row
}

impl<D: Detector, C: Classifier, S: FrameSource> BatchEngine for VideoPredictor<D, C, S> {
    fn next_batch(&mut self) -> Result<BatchStep> {
        if self.cursor.is_done() {
            return Ok(BatchStep::done(self.cursor.batch(), self.manager.len()));
        }
        let k = self.cursor.k1();

        let row_len = self.catalog.row_len();
        let empty_index = self.catalog.empty_index();
        let mut rows = vec![default_row(row_len, empty_index); self.frames_per_video];
        let mut boxes = vec![[0.0f32; 4]; self.frames_per_video];

        let (schedule, nonempty, _) = self.process_frames(k, &mut rows, &mut boxes);

        let fused = {
            let refs: Vec<&[f32]> = rows.iter().map(Vec::as_slice).collect();
            fuse_sequence(&refs, &self.catalog, &self.forbidden, self.threshold)
        };
        if !nonempty.is_empty() {
            self.state.clear_empty(k);
            let slot = self.select_key_slot(&fused.label, &rows, &nonempty);
            self.keyframes[k] = schedule[slot];
            self.state.set_best_box(k, boxes[slot]);
        }
        self.state.set_fused(k, fused);

        let step = BatchStep {
            batch: self.cursor.batch(),
            processed: k..k + 1,
            corrected: k..k + 1,
        };
        self.cursor.advance(1);
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
