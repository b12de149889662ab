//! CSV sample table.
//!
//! ```text
//! index,timestamp,pressure
//! 0,0.000012,1.5e-7
//! 1,5.100340,
//! ```
//!
//! The file is opened, appended to and closed for every sample, so rows
//! already written survive a crash. A failed read leaves the pressure empty.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::error::{Result, StorageError};
use crate::recorder::Recorder;
use crate::types::PressureReading;

/// Column names, in order.
pub const HEADER: [&str; 3] = ["index", "timestamp", "pressure"];

/// Recorder appending rows to a CSV file.
#[derive(Debug, Clone)]
pub struct CsvRecorder {
    path: PathBuf,
}

impl CsvRecorder {
    /// Creates a recorder for the given file. Nothing is opened until the
    /// first append.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the table path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_row(&self, reading: &PressureReading) -> std::result::Result<(), StorageError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let is_new = file.metadata()?.len() == 0;

        let mut writer = ::csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer.write_record(HEADER)?;
        }

        let pressure = reading.pressure.map(|p| format!("{p:e}")).unwrap_or_default();
        writer.write_record([
            reading.index.to_string(),
            reading.timestamp_text(),
            pressure,
        ])?;
        writer.flush()?;
        Ok(())
    }
}

impl Recorder for CsvRecorder {
    fn append(&mut self, reading: &PressureReading) -> Result<()> {
        self.write_row(reading)?;
        tracing::trace!("appended sample {} to {}", reading.index, self.path.display());
        Ok(())
    }
}
