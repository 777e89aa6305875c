//! Integration tests for merging drained engines.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use chrono::NaiveDateTime;
use image::RgbImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use trapscan::detect::{Category, Classifier, Detection, Detector, MediaSource};
use trapscan::error::{Error, Result};
use trapscan::predict::{
    BatchEngine, FrameSource, ImageOptions, ImagePredictor, VideoClip, VideoOptions,
    VideoPredictor,
};
use trapscan::sequence::{MediaRecord, Timestamp};
use trapscan::taxonomy::ClassCatalog;

struct ScriptedDetector {
    script: HashMap<PathBuf, Category>,
}

impl ScriptedDetector {
    fn new(entries: &[(&str, Category)]) -> Self {
        Self {
            script: entries
                .iter()
                .map(|(p, c)| (PathBuf::from(p), *c))
                .collect(),
        }
    }
}

impl Detector for ScriptedDetector {
    fn detect(&mut self, source: MediaSource<'_>) -> Result<Detection> {
        let MediaSource::Path(path) = source else {
            return Ok(Detection::empty());
        };
        let category = self.script.get(path).copied().unwrap_or(Category::Empty);
        if category == Category::Empty {
            return Ok(Detection::empty());
        }
        Ok(Detection {
            crop: (category == Category::Animal).then(|| RgbImage::new(8, 8)),
            category,
            bbox: [1.0, 2.0, 3.0, 4.0],
            count: 1,
            human_boxes: Vec::new(),
        })
    }

    fn merge(&mut self, other: Self) {
        self.script.extend(other.script);
    }
}

struct ConstClassifier {
    logits: Vec<f32>,
}

impl Classifier for ConstClassifier {
    fn classify_batch(&mut self, crops: &[RgbImage]) -> Result<Vec<Vec<f32>>> {
        Ok(vec![self.logits.clone(); crops.len()])
    }
}

fn catalog() -> ClassCatalog {
    ClassCatalog::new(vec![
        "badger".to_string(),
        "fox".to_string(),
        "bird".to_string(),
    ])
}

fn record(path: &str, stamp: &str) -> MediaRecord {
    MediaRecord {
        path: PathBuf::from(path),
        timestamp: Timestamp::Known(
            NaiveDateTime::parse_from_str(stamp, "%Y:%m:%d %H:%M:%S").unwrap(),
        ),
    }
}

fn options() -> ImageOptions {
    ImageOptions {
        threshold: 0.8,
        max_lag_seconds: 10,
        batch_size: 8,
    }
}

fn fox_classifier() -> ConstClassifier {
    ConstClassifier {
        logits: vec![0.0, 15.0, 0.0],
    }
}

fn seqs<E: BatchEngine>(engine: &E) -> Vec<u32> {
    (0..engine.num_items())
        .map(|k| engine.sequences().seq(k))
        .collect()
}

#[test]
fn test_image_merge_collapses_junction_and_refuses_it() {
    let mut a = ImagePredictor::new(
        vec![
            record("x/a.jpg", "2024:05:01 10:00:00"),
            record("x/b.jpg", "2024:05:01 10:00:02"),
        ],
        ScriptedDetector::new(&[("x/a.jpg", Category::Animal)]),
        fox_classifier(),
        catalog(),
        options(),
    );
    let mut b = ImagePredictor::new(
        vec![
            record("x/c.jpg", "2024:05:01 10:00:04"),
            record("x/d.jpg", "2024:05:01 10:01:30"),
        ],
        ScriptedDetector::new(&[("x/d.jpg", Category::Vehicle)]),
        fox_classifier(),
        catalog(),
        options(),
    );
    a.run_to_completion().unwrap();
    b.run_to_completion().unwrap();
    assert_eq!(b.state().fused(0).unwrap().label, "empty");

    a.merge(b).unwrap();

    // c joins the first burst, d keeps its own sequence.
    assert_eq!(seqs(&a), vec![1, 1, 1, 2]);
    // The junction sequence was re-fused immediately: the absorbed empty
    // item now carries the burst's animal verdict.
    for k in 0..3 {
        assert_eq!(a.state().fused(k).unwrap().label, "fox");
    }
    assert_eq!(a.state().fused(3).unwrap().label, "vehicle");
    // Per-item arrays were carried over.
    assert_eq!(a.state().count(3), 1);
    assert_eq!(a.state().best_box(3), [1.0, 2.0, 3.0, 4.0]);

    // The cursor resumed over the absorbed items; draining again is stable.
    assert!(!a.is_done());
    a.run_to_completion().unwrap();
    for k in 0..3 {
        assert_eq!(a.state().fused(k).unwrap().label, "fox");
    }
    assert_eq!(a.state().fused(3).unwrap().label, "vehicle");
}

#[test]
fn test_image_merge_without_collapse_keeps_verdicts() {
    let mut a = ImagePredictor::new(
        vec![record("x/a.jpg", "2024:05:01 10:00:00")],
        ScriptedDetector::new(&[("x/a.jpg", Category::Animal)]),
        fox_classifier(),
        catalog(),
        options(),
    );
    let mut b = ImagePredictor::new(
        vec![record("y/z.jpg", "2024:05:01 10:00:02")],
        ScriptedDetector::new(&[]),
        fox_classifier(),
        catalog(),
        options(),
    );
    a.run_to_completion().unwrap();
    b.run_to_completion().unwrap();

    a.merge(b).unwrap();
    // Different directories never share a sequence.
    assert_eq!(seqs(&a), vec![1, 2]);
    assert_eq!(a.state().fused(0).unwrap().label, "fox");
    assert_eq!(a.state().fused(1).unwrap().label, "empty");
}

#[test]
fn test_merge_while_running_is_an_error() {
    let mut a = ImagePredictor::new(
        vec![
            record("x/a.jpg", "2024:05:01 10:00:00"),
            record("x/b.jpg", "2024:05:01 10:00:02"),
        ],
        ScriptedDetector::new(&[]),
        fox_classifier(),
        catalog(),
        options(),
    );
    let mut b = ImagePredictor::new(
        vec![record("x/c.jpg", "2024:05:01 10:00:04")],
        ScriptedDetector::new(&[]),
        fox_classifier(),
        catalog(),
        options(),
    );
    b.run_to_completion().unwrap();

    let err = a.merge(b).unwrap_err();
    assert!(matches!(err, Error::MergeWhileRunning { remaining: 2 }));
}

// Minimal video fakes for the video merge path.

struct FakeClip {
    total_frames: u64,
}

impl VideoClip for FakeClip {
    fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn fps(&self) -> u32 {
        30
    }

    fn read_frame(&mut self, index: u64) -> Option<RgbImage> {
        (index < self.total_frames).then(|| RgbImage::new(4, 4))
    }
}

struct FakeSource {
    clips: HashMap<PathBuf, u64>,
}

impl FrameSource for FakeSource {
    type Clip = FakeClip;

    fn open(&mut self, path: &Path) -> Result<Self::Clip> {
        self.clips
            .get(path)
            .copied()
            .map(|total_frames| FakeClip { total_frames })
            .ok_or_else(|| Error::VideoOpen {
                path: path.to_path_buf(),
                reason: "no such clip".to_string(),
            })
    }
}

struct EveryFrameAnimal;

impl Detector for EveryFrameAnimal {
    fn detect(&mut self, source: MediaSource<'_>) -> Result<Detection> {
        let MediaSource::Frame(_) = source else {
            return Ok(Detection::empty());
        };
        Ok(Detection {
            crop: Some(RgbImage::new(8, 8)),
            category: Category::Animal,
            bbox: [0.0; 4],
            count: 1,
            human_boxes: Vec::new(),
        })
    }

    fn merge(&mut self, _other: Self) {}
}

fn video_engine(path: &str, total_frames: u64) -> VideoPredictor<EveryFrameAnimal, ConstClassifier, FakeSource> {
    let source = FakeSource {
        clips: std::iter::once((PathBuf::from(path), total_frames)).collect(),
    };
    VideoPredictor::new(
        vec![PathBuf::from(path)],
        EveryFrameAnimal,
        fox_classifier(),
        source,
        catalog(),
        VideoOptions {
            threshold: 0.8,
            frames_per_video: 12,
        },
    )
}

#[test]
fn test_video_merge_concatenates_and_stays_drained() {
    let mut a = video_engine("cam/a.mp4", 300);
    let mut b = video_engine("cam/b.mp4", 0);
    a.run_to_completion().unwrap();
    b.run_to_completion().unwrap();
    let verdict_a = a.state().fused(0).unwrap().label.clone();

    a.merge(b).unwrap();
    assert!(a.is_done());
    assert_eq!(a.num_items(), 2);
    assert_eq!(seqs(&a), vec![1, 2]);
    assert_eq!(a.state().fused(0).unwrap().label, verdict_a);
    assert_eq!(a.state().fused(1).unwrap().label, "empty");
    assert_eq!(a.key_frames().len(), 2);
}

#[test]
fn test_video_merge_while_running_is_an_error() {
    let mut a = video_engine("cam/a.mp4", 300);
    let b = video_engine("cam/b.mp4", 300);
    a.run_to_completion().unwrap();

    let err = a.merge(b).unwrap_err();
    assert!(matches!(err, Error::MergeWhileRunning { remaining: 1 }));
}
