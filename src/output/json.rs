//! JSON output format writer.

use crate::error::{Error, Result};
use crate::output::{ObservationRecord, OutputWriter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// JSON result file structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonResultFile {
    /// Analysis timestamp.
    pub analysis_date: DateTime<Utc>,
    /// Analysis settings.
    pub settings: JsonSettings,
    /// Classified files.
    pub observations: Vec<ObservationRecord>,
    /// Summary statistics.
    pub summary: JsonSummary,
}

/// Analysis settings for JSON output.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonSettings {
    /// Minimum confidence threshold.
    pub threshold: f32,
    /// Maximum gap between images of one sequence.
    pub max_lag_seconds: i64,
}

/// Summary statistics.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonSummary {
    /// Total number of classified files.
    pub total_files: usize,
    /// Files fused as empty.
    pub empty_files: usize,
    /// Files below the confidence threshold.
    pub undefined_files: usize,
    /// Number of distinct labels observed.
    pub unique_labels: usize,
}

/// Writer for JSON observation output files.
pub struct JsonResultWriter {
    records: Vec<ObservationRecord>,
    output_path: PathBuf,
    threshold: f32,
    max_lag_seconds: i64,
}

impl JsonResultWriter {
    /// Create a new JSON result writer.
    pub fn new(output_path: &Path, threshold: f32, max_lag_seconds: i64) -> Self {
        Self {
            records: Vec::new(),
            output_path: output_path.to_path_buf(),
            threshold,
            max_lag_seconds,
        }
    }

    fn compute_summary(&self) -> JsonSummary {
        let unique: HashSet<&str> = self.records.iter().map(|r| r.label.as_str()).collect();
        JsonSummary {
            total_files: self.records.len(),
            empty_files: self
                .records
                .iter()
                .filter(|r| r.label == crate::taxonomy::EMPTY_LABEL)
                .count(),
            undefined_files: self
                .records
                .iter()
                .filter(|r| r.label == crate::taxonomy::UNDEFINED_LABEL)
                .count(),
            unique_labels: unique.len(),
        }
    }
}

impl OutputWriter for JsonResultWriter {
    fn write_header(&mut self) -> Result<()> {
        // No header for JSON - written at finalize
        Ok(())
    }

    fn write_record(&mut self, record: &ObservationRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        let result = JsonResultFile {
            analysis_date: Utc::now(),
            settings: JsonSettings {
                threshold: self.threshold,
                max_lag_seconds: self.max_lag_seconds,
            },
            summary: self.compute_summary(),
            observations: std::mem::take(&mut self.records),
        };

        let file = File::create(&self.output_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &result).map_err(|e| Error::JsonWrite {
            path: self.output_path.clone(),
            source: e,
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(file: &str, label: &str) -> ObservationRecord {
        ObservationRecord {
            file: file.to_string(),
            date: "NA".to_string(),
            sequence: 1,
            label: label.to_string(),
            score: 1.0,
            top1: label.to_string(),
            count: 0,
            human_count: 0,
            xmin: 0.0,
            ymin: 0.0,
            xmax: 0.0,
            ymax: 0.0,
            key_frame: None,
        }
    }

    #[test]
    fn test_json_writer_basic() {
        let dir = tempdir().expect("create temp dir");
        let output_path = dir.path().join("observations.trapscan.json");

        let mut writer = JsonResultWriter::new(&output_path, 0.8, 10);
        writer.write_header().expect("write header");
        writer
            .write_record(&record("a.jpg", "fox"))
            .expect("write record");
        writer.finalize().expect("finalize");

        let content = std::fs::read_to_string(&output_path).expect("read file");
        let result: JsonResultFile = serde_json::from_str(&content).expect("parse JSON");
        assert_eq!(result.observations.len(), 1);
        assert_eq!(result.observations[0].label, "fox");
        assert_eq!(result.summary.total_files, 1);
        assert!((result.settings.threshold - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_json_summary_counts() {
        let dir = tempdir().expect("create temp dir");
        let output_path = dir.path().join("observations.trapscan.json");

        let mut writer = JsonResultWriter::new(&output_path, 0.8, 10);
        writer.write_record(&record("a.jpg", "fox")).expect("a");
        writer.write_record(&record("b.jpg", "empty")).expect("b");
        writer.write_record(&record("c.jpg", "empty")).expect("c");
        writer
            .write_record(&record("d.jpg", "undefined"))
            .expect("d");
        writer.finalize().expect("finalize");

        let content = std::fs::read_to_string(&output_path).expect("read file");
        let result: JsonResultFile = serde_json::from_str(&content).expect("parse JSON");
        assert_eq!(result.summary.total_files, 4);
        assert_eq!(result.summary.empty_files, 2);
        assert_eq!(result.summary.undefined_files, 1);
        assert_eq!(result.summary.unique_labels, 3);
    }
}
