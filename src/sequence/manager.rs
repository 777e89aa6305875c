//! Sequence manager: orders files, timestamps them and clusters them into
//! trigger-event sequences.

use super::order::directory_order;
use super::timestamp::{Timestamp, extract_timestamp};
use std::path::{Path, PathBuf};

/// Input record for the manager: a file and its capture timestamp.
#[derive(Debug, Clone)]
pub struct MediaRecord {
    /// Path to the media file.
    pub path: PathBuf,
    /// Extracted capture timestamp.
    pub timestamp: Timestamp,
}

impl MediaRecord {
    /// Build a record by extracting the timestamp from the file itself.
    pub fn from_path(path: PathBuf) -> Self {
        let timestamp = extract_timestamp(&path);
        Self { path, timestamp }
    }
}

/// One media file in the manager's arena.
#[derive(Debug, Clone)]
pub struct MediaFile {
    path: PathBuf,
    dir: PathBuf,
    timestamp: Timestamp,
    seq: u32,
}

impl MediaFile {
    /// Path to the media file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the file.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Capture timestamp.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Sequence id (1-based, monotonically increasing per discovery order).
    pub fn seq(&self) -> u32 {
        self.seq
    }
}

/// Owns the file arena and the sequence structure over it.
///
/// Until [`find_sequences`](Self::find_sequences) runs, every file is its own
/// sequence (ids `1..=n`), which is exactly what the video engine needs: one
/// video, one observation event.
#[derive(Debug, Clone, Default)]
pub struct SequenceManager {
    files: Vec<MediaFile>,
}

impl SequenceManager {
    /// Build a manager from paths, extracting capture timestamps from each
    /// file (EXIF for images, modification time for videos).
    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self::from_records(paths.into_iter().map(MediaRecord::from_path).collect())
    }

    /// Build a manager from explicit records.
    pub fn from_records(records: Vec<MediaRecord>) -> Self {
        let files = records
            .into_iter()
            .enumerate()
            .map(|(k, record)| {
                let dir = record
                    .path
                    .parent()
                    .map_or_else(PathBuf::new, Path::to_path_buf);
                #[allow(clippy::cast_possible_truncation)]
                MediaFile {
                    path: record.path,
                    dir,
                    timestamp: record.timestamp,
                    seq: k as u32 + 1,
                }
            })
            .collect();
        Self { files }
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the manager holds no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The file at arena index `k`.
    pub fn file(&self, k: usize) -> &MediaFile {
        &self.files[k]
    }

    /// Sequence id of the file at index `k`.
    pub fn seq(&self, k: usize) -> u32 {
        self.files[k].seq
    }

    /// All files in arena order.
    pub fn files(&self) -> &[MediaFile] {
        &self.files
    }

    /// Highest sequence id assigned so far (0 when empty).
    pub fn max_seq(&self) -> u32 {
        self.files.iter().map(|f| f.seq).max().unwrap_or(0)
    }

    /// Arena indices of all files with the given sequence id.
    pub fn files_in_sequence(&self, seq: u32) -> Vec<usize> {
        (0..self.files.len())
            .filter(|&k| self.files[k].seq == seq)
            .collect()
    }

    /// Cluster files into sequences.
    ///
    /// Single pass over directory-grouped, timestamp-sorted files: a new
    /// sequence starts whenever the directory changes, the gap to the previous
    /// timestamp exceeds `max_lag_seconds`, or the timestamp is unknown.
    /// Unknown timestamps never merge with a neighbour.
    pub fn find_sequences(&mut self, max_lag_seconds: i64) {
        if self.files.is_empty() {
            return;
        }

        let order = directory_order(self.files.iter().map(|f| f.dir.as_path()));
        let mut seq = 0u32;

        let mut start = 0;
        while start < order.len() {
            // [start, end) is one directory group within the permutation
            let dir = &self.files[order[start]].dir;
            let mut end = start + 1;
            while end < order.len() && &self.files[order[end]].dir == dir {
                end += 1;
            }

            let mut group: Vec<usize> = order[start..end].to_vec();
            group.sort_by_key(|&k| self.files[k].timestamp);

            seq += 1;
            self.files[group[0]].seq = seq;
            for j in 1..group.len() {
                let prev = self.files[group[j - 1]].timestamp;
                let curr = self.files[group[j]].timestamp;
                if !prev.lag_within(&curr, max_lag_seconds) {
                    seq += 1;
                }
                self.files[group[j]].seq = seq;
            }

            start = end;
        }
    }

    /// Stable-reorder the arena into sequence-id order.
    ///
    /// Sequence ids were assigned per directory in timestamp order, so after
    /// this the arena is directory-grouped and every sequence is a contiguous
    /// run, which is what the batch engines rely on.
    pub fn reorder_by_seqnum(&mut self) {
        self.files.sort_by_key(MediaFile::seq);
    }

    /// Append `other`, continuing this manager's sequence numbering.
    ///
    /// When the last file of `self` and the first file of `other` share a
    /// directory and are within `max_lag_seconds`, the boundary collapses:
    /// `other`'s ids are shifted one less so the shared burst becomes a single
    /// sequence.
    pub fn merge(&mut self, other: Self, max_lag_seconds: i64) {
        let m = self.max_seq();
        let collapse = match (self.files.last(), other.files.first()) {
            (Some(a), Some(b)) => {
                a.dir == b.dir && a.timestamp.lag_within(&b.timestamp, max_lag_seconds)
            }
            _ => false,
        };
        let shift = if collapse { m.saturating_sub(1) } else { m };
        self.extend_with_shift(other, shift);
    }

    /// Append `other` with fresh sequence ids, never collapsing the boundary.
    ///
    /// Used by the video engine, where every file is its own sequence.
    pub fn append(&mut self, other: Self) {
        let m = self.max_seq();
        self.extend_with_shift(other, m);
    }

    fn extend_with_shift(&mut self, other: Self, shift: u32) {
        self.files.extend(other.files.into_iter().map(|mut f| {
            f.seq += shift;
            f
        }));
    }
}
