//! Detector and classifier seams.
//!
//! The object detector and the species classifier are external collaborators:
//! the batch engines consume them through the [`Detector`] and [`Classifier`]
//! traits and never depend on a concrete model. [`JsonDetector`] is the one
//! concrete detector shipped here, backed by a MegaDetector-style detection
//! file.

mod crop;
mod json;

pub use crop::square_crop;
pub use json::JsonDetector;

use crate::constants::DEFAULT_LOGIT;
use crate::error::Result;
use image::RgbImage;
use std::path::Path;

/// Bounding box in pixel coordinates: `[xmin, ymin, xmax, ymax]`.
pub type BoundingBox = [f32; 4];

/// Detector category for the best box of one media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Nothing detected, or the item could not be processed.
    Empty,
    /// An animal; the cropped region goes to the species classifier.
    Animal,
    /// A human.
    Human,
    /// A vehicle.
    Vehicle,
}

/// Result of running the detector on one image or frame.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Square-cropped region around the best animal box, when `category` is
    /// [`Category::Animal`].
    pub crop: Option<RgbImage>,
    /// Category of the best box.
    pub category: Category,
    /// Best box in pixel coordinates.
    pub bbox: BoundingBox,
    /// Number of detected instances.
    pub count: u32,
    /// Boxes of every detected human.
    pub human_boxes: Vec<BoundingBox>,
}

impl Detection {
    /// Detection for an empty (or unprocessable) item.
    pub fn empty() -> Self {
        Self {
            crop: None,
            category: Category::Empty,
            bbox: [0.0; 4],
            count: 0,
            human_boxes: Vec::new(),
        }
    }
}

/// Input handed to a detector: a file on disk or an already decoded frame.
#[derive(Debug, Clone, Copy)]
pub enum MediaSource<'a> {
    /// Path to an image file.
    Path(&'a Path),
    /// Decoded video frame.
    Frame(&'a RgbImage),
}

/// Object detector contract.
///
/// `detect` must be deterministic for a fixed input and must return an empty
/// detection (not an error) for media it cannot process; errors are reserved
/// for detector-internal failures, which the engines log and downgrade to
/// empty for that single item.
pub trait Detector {
    /// Run detection on one image or frame and return its best box.
    fn detect(&mut self, source: MediaSource<'_>) -> Result<Detection>;

    /// Combine the backing state of two detectors when their engines merge.
    fn merge(&mut self, other: Self)
    where
        Self: Sized;
}

/// Species classifier contract.
///
/// Returns raw per-class logits, one row per crop, `num_animal_classes`
/// columns, with no internal softmax: the softmax happens at aggregation
/// time, after sequence-level averaging.
pub trait Classifier {
    /// Classify a batch of cropped animal regions.
    fn classify_batch(&mut self, crops: &[RgbImage]) -> Result<Vec<Vec<f32>>>;
}

/// Classifier for detector-only runs with a generic single-class catalog.
///
/// Every crop gets the sentinel logit for the lone "animal" class, so the
/// fusion step labels animal sequences with full confidence without any
/// species model involved.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresenceClassifier;

impl Classifier for PresenceClassifier {
    fn classify_batch(&mut self, crops: &[RgbImage]) -> Result<Vec<Vec<f32>>> {
        Ok(vec![vec![DEFAULT_LOGIT]; crops.len()])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_classifier_one_logit_per_crop() {
        let crops = vec![RgbImage::new(4, 4), RgbImage::new(4, 4)];
        let logits = PresenceClassifier.classify_batch(&crops).unwrap();
        assert_eq!(logits.len(), 2);
        assert_eq!(logits[0], vec![DEFAULT_LOGIT]);
    }
}
