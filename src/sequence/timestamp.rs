//! Capture timestamp extraction and comparison.

use crate::constants::{IMAGE_EXTENSIONS, TIMESTAMP_FORMAT, UNKNOWN_DATE};
use chrono::NaiveDateTime;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Capture timestamp of a media file.
///
/// `Unknown` sorts before any known timestamp and never satisfies the lag
/// test, so items without a parsable date form singleton sequences instead of
/// silently merging with a neighbouring burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Timestamp {
    /// Timestamp could not be extracted or parsed.
    Unknown,
    /// Parsed capture time (camera local time, no zone information in EXIF).
    Known(NaiveDateTime),
}

impl Timestamp {
    /// Whether `next` follows this timestamp within `max_lag_seconds`.
    ///
    /// Unknown timestamps never satisfy the test. The comparison is signed:
    /// an earlier `next` passes, matching the original behaviour where items
    /// are timestamp-sorted before the lag scan runs.
    pub fn lag_within(&self, next: &Self, max_lag_seconds: i64) -> bool {
        match (self, next) {
            (Self::Known(a), Self::Known(b)) => {
                b.signed_duration_since(*a).num_seconds() <= max_lag_seconds
            }
            _ => false,
        }
    }

    /// Whether the timestamp was successfully extracted.
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str(UNKNOWN_DATE),
            Self::Known(dt) => write!(f, "{}", dt.format(TIMESTAMP_FORMAT)),
        }
    }
}

/// Extract the capture timestamp of a media file.
///
/// Images are read from EXIF `DateTimeOriginal`; videos fall back to the
/// filesystem modification time. Any failure yields [`Timestamp::Unknown`]
/// rather than an error: a missing date must never abort sequence detection.
///
/// Images without usable EXIF stay `Unknown`. Copied or exported files share
/// a modification time, so an mtime fallback would cluster unrelated images
/// into one trigger event.
pub fn extract_timestamp(path: &Path) -> Timestamp {
    if is_image(path) {
        return exif_timestamp(path).unwrap_or(Timestamp::Unknown);
    }
    mtime_timestamp(path).unwrap_or(Timestamp::Unknown)
}

fn is_image(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        IMAGE_EXTENSIONS
            .iter()
            .any(|e| ext.eq_ignore_ascii_case(std::ffi::OsStr::new(e)))
    })
}

fn exif_timestamp(path: &Path) -> Option<Timestamp> {
    let file = File::open(path).ok()?;
    let exif = exif::Reader::new()
        .read_from_container(&mut BufReader::new(&file))
        .ok()?;
    let field = exif.get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)?;
    let raw = match field.value {
        exif::Value::Ascii(ref v) => v.first()?,
        _ => return None,
    };
    let text = std::str::from_utf8(raw).ok()?;
    match NaiveDateTime::parse_from_str(text.trim_end_matches('\0').trim(), TIMESTAMP_FORMAT) {
        Ok(dt) => Some(Timestamp::Known(dt)),
        Err(e) => {
            debug!("Unparsable EXIF date in {}: {e}", path.display());
            None
        }
    }
}

fn mtime_timestamp(path: &Path) -> Option<Timestamp> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    let dt: chrono::DateTime<chrono::Local> = modified.into();
    Some(Timestamp::Known(dt.naive_local()))
}
