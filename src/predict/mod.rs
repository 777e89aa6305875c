//! Incremental batch prediction and sequence-level aggregation.
//!
//! The two engines ([`ImagePredictor`] and [`VideoPredictor`]) share the
//! fusion policy ([`aggregate`]) and the prediction arena
//! ([`PredictionState`]) by composition, and expose the same stepping surface
//! through [`BatchEngine`]. Callers drive an engine one `next_batch` at a
//! time; each step reports which item rows it touched so a UI can redraw only
//! those.

pub mod aggregate;
mod image;
mod state;
mod video;

pub use image::{ImageOptions, ImagePredictor};
pub use state::{Fused, PredictionState};
pub use video::{FrameSource, VideoClip, VideoOptions, VideoPredictor};

use crate::error::Result;
use crate::sequence::SequenceManager;
use std::ops::Range;

/// Progress cursor of a batch engine.
///
/// Invariant: `k1 <= k2 <= n`; `k1` only moves forward. Once `k1 == n` the
/// engine is done and further steps are idempotent sentinels.
#[derive(Debug, Clone, Copy)]
pub struct BatchCursor {
    k1: usize,
    k2: usize,
    batch: u32,
    n: usize,
}

impl BatchCursor {
    /// Cursor at the start of `n` items, advancing `step` items per batch.
    pub fn new(step: usize, n: usize) -> Self {
        Self::resume_at(0, step, n)
    }

    /// Cursor positioned to process `[start, start + step)` next.
    pub fn resume_at(start: usize, step: usize, n: usize) -> Self {
        let k1 = start.min(n);
        Self {
            k1,
            k2: (k1 + step).min(n),
            batch: 1,
            n,
        }
    }

    /// Start of the current window.
    pub fn k1(&self) -> usize {
        self.k1
    }

    /// End (exclusive) of the current window.
    pub fn k2(&self) -> usize {
        self.k2
    }

    /// 1-based number of the current batch.
    pub fn batch(&self) -> u32 {
        self.batch
    }

    /// Whether every item has been processed.
    pub fn is_done(&self) -> bool {
        self.k1 >= self.n
    }

    /// Move the window past the just-processed range.
    pub fn advance(&mut self, step: usize) {
        self.k1 = self.k2;
        self.k2 = (self.k1 + step).min(self.n);
        self.batch += 1;
    }
}

/// Result of one `next_batch` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchStep {
    /// 1-based batch number of the step that just ran.
    pub batch: u32,
    /// Item range processed by this step.
    pub processed: Range<usize>,
    /// Item range whose fused labels were (re)computed, covering every
    /// sequence the processed window overlaps.
    pub corrected: Range<usize>,
}

impl BatchStep {
    /// Sentinel step returned once processing is complete: empty ranges at
    /// the end of the item list.
    pub fn done(batch: u32, n: usize) -> Self {
        Self {
            batch,
            processed: n..n,
            corrected: n..n,
        }
    }

    /// Whether this step is the completion sentinel.
    pub fn is_done(&self) -> bool {
        self.processed.is_empty()
    }
}

/// Common stepping surface of the image and video engines.
///
/// `next_batch` is a synchronous, non-preemptible step; cancellation happens
/// cooperatively between calls. Engines own their prediction state
/// exclusively; cross-thread sharing requires external synchronization.
pub trait BatchEngine {
    /// Process the next batch and re-fuse every sequence it overlaps.
    fn next_batch(&mut self) -> Result<BatchStep>;

    /// Whether every item has been processed.
    fn is_done(&self) -> bool;

    /// Number of items under this engine.
    fn num_items(&self) -> usize;

    /// Prediction arena (logits, fused labels, boxes, counts).
    fn state(&self) -> &PredictionState;

    /// Mutable prediction arena, for manual corrections.
    fn state_mut(&mut self) -> &mut PredictionState;

    /// File and sequence structure.
    fn sequences(&self) -> &SequenceManager;

    /// Drive the engine until every item is processed.
    fn run_to_completion(&mut self) -> Result<()> {
        while !self.is_done() {
            self.next_batch()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_advances_and_clamps() {
        let mut cursor = BatchCursor::new(4, 10);
        assert_eq!((cursor.k1(), cursor.k2()), (0, 4));
        cursor.advance(4);
        assert_eq!((cursor.k1(), cursor.k2()), (4, 8));
        cursor.advance(4);
        assert_eq!((cursor.k1(), cursor.k2()), (8, 10));
        assert!(!cursor.is_done());
        cursor.advance(4);
        assert!(cursor.is_done());
        assert_eq!(cursor.k2(), 10);
    }

    #[test]
    fn test_cursor_empty_set_is_done() {
        let cursor = BatchCursor::new(8, 0);
        assert!(cursor.is_done());
    }

    #[test]
    fn test_done_sentinel() {
        let step = BatchStep::done(4, 12);
        assert!(step.is_done());
        assert_eq!(step.processed, 12..12);
    }
}
