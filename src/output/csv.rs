//! CSV output format writer.

use crate::error::{Error, Result};
use crate::output::{ObservationRecord, OutputWriter};
use std::fs::File;
use std::path::{Path, PathBuf};

/// CSV format output writer.
pub struct CsvWriter {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl CsvWriter {
    /// Create a new CSV writer.
    pub fn new(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: csv::Writer::from_writer(file),
            path: path.to_path_buf(),
        })
    }

    fn csv_error(&self, source: csv::Error) -> Error {
        Error::CsvWrite {
            path: self.path.clone(),
            source,
        }
    }
}

impl OutputWriter for CsvWriter {
    fn write_header(&mut self) -> Result<()> {
        // The csv crate emits the header with the first serialized record.
        Ok(())
    }

    fn write_record(&mut self, record: &ObservationRecord) -> Result<()> {
        self.writer
            .serialize(record)
            .map_err(|e| self.csv_error(e))
    }

    fn finalize(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
