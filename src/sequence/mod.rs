//! Temporal sequence construction over camera-trap media files.
//!
//! A sequence is a burst of images from one camera trigger event: a maximal
//! run of files in the same directory whose consecutive capture timestamps
//! differ by at most a configurable lag.

mod manager;
mod order;
mod timestamp;

pub use manager::{MediaFile, MediaRecord, SequenceManager};
pub use order::directory_order;
pub use timestamp::{Timestamp, extract_timestamp};
