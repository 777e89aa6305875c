//! Per-item prediction arena shared by the batch engines.

use crate::constants::DEFAULT_LOGIT;
use crate::detect::BoundingBox;
use crate::taxonomy::ClassCatalog;

/// Fused verdict for one item, after sequence-level aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Fused {
    /// Final label; `"undefined"` when the score fell below the threshold.
    pub label: String,
    /// Confidence in `[0, 1]`, truncated to two decimals.
    pub score: f32,
    /// Best class regardless of the threshold.
    pub top1: String,
}

/// Arrays of per-item prediction data, indexed like the engine's file arena.
///
/// Logit rows are laid out `[animal classes.., human, vehicle, empty]`. A
/// fresh row carries the sentinel logit in the empty column and zero
/// everywhere else, so an untouched item fuses as empty.
#[derive(Debug, Clone)]
pub struct PredictionState {
    row_len: usize,
    empty_index: usize,
    logits: Vec<Vec<f32>>,
    fused: Vec<Option<Fused>>,
    best_boxes: Vec<BoundingBox>,
    counts: Vec<u32>,
    human_counts: Vec<u32>,
}

impl PredictionState {
    /// Arena for `n` items under the given catalog's row layout.
    pub fn new(n: usize, catalog: &ClassCatalog) -> Self {
        let row_len = catalog.row_len();
        let empty_index = catalog.empty_index();
        Self {
            row_len,
            empty_index,
            logits: vec![Self::default_row(row_len, empty_index); n],
            fused: vec![None; n],
            best_boxes: vec![[0.0; 4]; n],
            counts: vec![0; n],
            human_counts: vec![0; n],
        }
    }

    fn default_row(row_len: usize, empty_index: usize) -> Vec<f32> {
        let mut row = vec![0.0; row_len];
        row[empty_index] = DEFAULT_LOGIT;
        row
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.logits.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.logits.is_empty()
    }

    /// Logit row of item `k`.
    pub fn logits(&self, k: usize) -> &[f32] {
        &self.logits[k]
    }

    /// Set one logit column of item `k`.
    pub fn set_logit(&mut self, k: usize, col: usize, value: f32) {
        self.logits[k][col] = value;
    }

    /// Write classifier logits into the animal columns of item `k`.
    pub fn set_animal_logits(&mut self, k: usize, logits: &[f32]) {
        self.logits[k][..logits.len()].copy_from_slice(logits);
    }

    /// Clear the empty sentinel of item `k` (the item holds something).
    pub fn clear_empty(&mut self, k: usize) {
        self.logits[k][self.empty_index] = 0.0;
    }

    /// Reset item `k` to the untouched (empty) row.
    pub fn reset_row(&mut self, k: usize) {
        self.logits[k] = Self::default_row(self.row_len, self.empty_index);
    }

    /// Fused verdict of item `k`, if its sequence has been aggregated.
    pub fn fused(&self, k: usize) -> Option<&Fused> {
        self.fused[k].as_ref()
    }

    /// Store the fused verdict of item `k`.
    pub fn set_fused(&mut self, k: usize, fused: Fused) {
        self.fused[k] = Some(fused);
    }

    /// Manually override the verdict of item `k` with full top1 agreement.
    pub fn set_predicted_class(&mut self, k: usize, label: &str, score: f32) {
        self.fused[k] = Some(Fused {
            label: label.to_string(),
            score,
            top1: label.to_string(),
        });
    }

    /// Best box of item `k` in pixel coordinates.
    pub fn best_box(&self, k: usize) -> BoundingBox {
        self.best_boxes[k]
    }

    /// Store the best box of item `k`.
    pub fn set_best_box(&mut self, k: usize, bbox: BoundingBox) {
        self.best_boxes[k] = bbox;
    }

    /// Instance count of item `k`.
    pub fn count(&self, k: usize) -> u32 {
        self.counts[k]
    }

    /// Store the instance count of item `k`.
    pub fn set_count(&mut self, k: usize, count: u32) {
        self.counts[k] = count;
    }

    /// Human count of item `k`.
    pub fn human_count(&self, k: usize) -> u32 {
        self.human_counts[k]
    }

    /// Store the human count of item `k`.
    pub fn set_human_count(&mut self, k: usize, count: u32) {
        self.human_counts[k] = count;
    }

    /// Append every array of `other`, preserving its per-item data.
    ///
    /// Both arenas must share the same row layout.
    pub fn merge(&mut self, other: Self) {
        debug_assert_eq!(self.row_len, other.row_len);
        self.logits.extend(other.logits);
        self.fused.extend(other.fused);
        self.best_boxes.extend(other.best_boxes);
        self.counts.extend(other.counts);
        self.human_counts.extend(other.human_counts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_row_is_empty_sentinel() {
        let catalog = ClassCatalog::generic();
        let state = PredictionState::new(2, &catalog);
        let row = state.logits(0);
        assert_eq!(row.len(), catalog.row_len());
        assert_eq!(row[catalog.empty_index()], DEFAULT_LOGIT);
        assert!(state.fused(0).is_none());
    }

    #[test]
    fn test_clear_and_reset_row() {
        let catalog = ClassCatalog::generic();
        let mut state = PredictionState::new(1, &catalog);
        state.clear_empty(0);
        assert_eq!(state.logits(0)[catalog.empty_index()], 0.0);
        state.set_animal_logits(0, &[3.5]);
        state.reset_row(0);
        assert_eq!(state.logits(0)[0], 0.0);
        assert_eq!(state.logits(0)[catalog.empty_index()], DEFAULT_LOGIT);
    }

    #[test]
    fn test_merge_concatenates_all_arrays() {
        let catalog = ClassCatalog::generic();
        let mut a = PredictionState::new(1, &catalog);
        let mut b = PredictionState::new(2, &catalog);
        b.set_count(1, 3);
        b.set_predicted_class(1, "animal", 0.9);
        b.set_best_box(1, [1.0, 2.0, 3.0, 4.0]);

        a.merge(b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.count(2), 3);
        assert_eq!(a.fused(2).map(|f| f.label.as_str()), Some("animal"));
        assert_eq!(a.best_box(2), [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_set_predicted_class_sets_top1() {
        let catalog = ClassCatalog::generic();
        let mut state = PredictionState::new(1, &catalog);
        state.set_predicted_class(0, "fox", 1.0);
        let fused = state.fused(0).unwrap();
        assert_eq!(fused.label, "fox");
        assert_eq!(fused.top1, "fox");
        assert_eq!(fused.score, 1.0);
    }
}
