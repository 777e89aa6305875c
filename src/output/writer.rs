//! Output writer trait definition.

use crate::error::Result;
use crate::output::ObservationRecord;

/// Trait for writing classification results.
pub trait OutputWriter {
    /// Write the file header (if applicable).
    fn write_header(&mut self) -> Result<()>;

    /// Write a single observation.
    fn write_record(&mut self, record: &ObservationRecord) -> Result<()>;

    /// Finalize the output (flush, close, etc.).
    fn finalize(&mut self) -> Result<()>;
}
