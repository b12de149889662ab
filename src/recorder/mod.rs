//! Sample storage.
//!
//! A [`Recorder`] receives every reading of a polling run in order, failed
//! reads included, and appends it to a growable table of three columns:
//! index, timestamp and pressure.

pub mod csv;

use crate::error::Result;
use crate::types::PressureReading;

pub use self::csv::CsvRecorder;

/// Append-only sink for pressure readings.
pub trait Recorder {
    /// Appends one reading after all previously appended ones.
    fn append(&mut self, reading: &PressureReading) -> Result<()>;
}

impl<R: Recorder + ?Sized> Recorder for &mut R {
    fn append(&mut self, reading: &PressureReading) -> Result<()> {
        (**self).append(reading)
    }
}

/// Recorder that keeps readings in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryRecorder {
    readings: Vec<PressureReading>,
}

impl MemoryRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded readings in append order.
    #[must_use]
    pub fn readings(&self) -> &[PressureReading] {
        &self.readings
    }
}

impl Recorder for MemoryRecorder {
    fn append(&mut self, reading: &PressureReading) -> Result<()> {
        self.readings.push(*reading);
        Ok(())
    }
}
