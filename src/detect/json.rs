//! Detector backed by a MegaDetector-style JSON detection file.
//!
//! The file lists, per image, normalized boxes with a category and a
//! confidence, as produced by MegaDetector and compatible tools:
//!
//! ```json
//! {
//!   "images": [
//!     {"file": "cam1/IMG_0001.JPG",
//!      "detections": [{"category": "1", "conf": 0.93, "bbox": [0.1, 0.2, 0.3, 0.4]}]}
//!   ],
//!   "detection_categories": {"1": "animal", "2": "person", "3": "vehicle"}
//! }
//! ```

use super::crop::square_crop;
use super::{Category, Detection, Detector, MediaSource};
use crate::constants::DEFAULT_DETECTION_FILE_CONFIDENCE;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct DetectionFile {
    images: Vec<ImageEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ImageEntry {
    file: PathBuf,
    #[serde(default)]
    detections: Vec<BoxEntry>,
    #[serde(default)]
    failure: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct BoxEntry {
    category: String,
    conf: f32,
    /// Normalized `[x, y, width, height]` relative to the image size.
    bbox: [f32; 4],
}

/// Detector that replays boxes from a detection file instead of running a
/// model.
///
/// Only path inputs are supported; handing it a decoded video frame yields an
/// empty detection. Human boxes are not listed in the file format, so
/// `human_boxes` is always empty.
#[derive(Debug, Clone)]
pub struct JsonDetector {
    entries: Vec<ImageEntry>,
    index: HashMap<PathBuf, usize>,
    confidence: f32,
}

impl JsonDetector {
    /// Load a detection file, skipping entries flagged as failures.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| Error::DetectionFileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed: DetectionFile =
            serde_json::from_str(&raw).map_err(|source| Error::DetectionFileParse {
                path: path.to_path_buf(),
                source,
            })?;

        let entries: Vec<ImageEntry> = parsed
            .images
            .into_iter()
            .filter(|e| {
                if e.failure.is_some() {
                    debug!("Skipping failed entry: {}", e.file.display());
                }
                e.failure.is_none()
            })
            .collect();

        Ok(Self::from_entries(entries, DEFAULT_DETECTION_FILE_CONFIDENCE))
    }

    fn from_entries(entries: Vec<ImageEntry>, confidence: f32) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(k, e)| (e.file.clone(), k))
            .collect();
        Self {
            entries,
            index,
            confidence,
        }
    }

    /// Override the box confidence threshold.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Files listed in the detection file, in file order.
    ///
    /// The image engine is normally constructed over exactly this list.
    pub fn filenames(&self) -> Vec<PathBuf> {
        self.entries.iter().map(|e| e.file.clone()).collect()
    }

    fn detect_path(&self, path: &Path) -> Detection {
        let Some(&k) = self.index.get(path) else {
            return Detection::empty();
        };
        let entry = &self.entries[k];
        if entry.detections.is_empty() {
            return Detection::empty();
        }

        // Most confident box decides the category.
        let best = entry
            .detections
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.conf.total_cmp(&b.conf))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let best_box = &entry.detections[best];
        if best_box.conf <= self.confidence {
            return Detection::empty();
        }
        let category = match best_box.category.as_str() {
            "1" => Category::Animal,
            "2" => Category::Human,
            "3" => Category::Vehicle,
            other => {
                warn!(
                    "Unknown detection category '{other}' in {}",
                    path.display()
                );
                return Detection::empty();
            }
        };

        #[allow(clippy::cast_possible_truncation)]
        let count = entry
            .detections
            .iter()
            .filter(|b| b.conf > self.confidence)
            .count() as u32;

        // Box conversion and cropping both need the pixels on disk.
        let Ok(image) = image::open(path) else {
            debug!("Unreadable image treated as empty: {}", path.display());
            return Detection::empty();
        };
        let image = image.to_rgb8();
        let bbox = to_pixel_box(&best_box.bbox, image.width(), image.height());
        let crop = (category == Category::Animal).then(|| square_crop(&image, bbox));

        Detection {
            crop,
            category,
            bbox,
            count,
            human_boxes: Vec::new(),
        }
    }
}

/// Convert a normalized `[x, y, w, h]` box to pixel `[xmin, ymin, xmax, ymax]`.
#[allow(clippy::cast_precision_loss)]
fn to_pixel_box(bbox: &[f32; 4], width: u32, height: u32) -> [f32; 4] {
    let (w, h) = (width as f32, height as f32);
    let xmin = (bbox[0] * w).floor();
    let ymin = (bbox[1] * h).floor();
    [
        xmin,
        ymin,
        xmin + (bbox[2] * w).floor(),
        ymin + (bbox[3] * h).floor(),
    ]
}

impl Detector for JsonDetector {
    fn detect(&mut self, source: MediaSource<'_>) -> Result<Detection> {
        match source {
            MediaSource::Path(path) => Ok(self.detect_path(path)),
            MediaSource::Frame(_) => Ok(Detection::empty()),
        }
    }

    fn merge(&mut self, other: Self) {
        let entries = std::mem::take(&mut self.entries)
            .into_iter()
            .chain(other.entries)
            .collect();
        *self = Self::from_entries(entries, self.confidence);
    }
}
