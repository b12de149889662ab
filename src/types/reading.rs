//! Pressure samples produced by a polling run.

use std::time::Duration;

/// One polling sample.
///
/// A failed read is kept as a sample with no pressure so the run's sequence
/// stays gapless.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureReading {
    /// Position of the sample within the run, starting at 0.
    pub index: u64,
    /// Time since the run started.
    pub elapsed: Duration,
    /// Pressure in Torr, `None` if the read failed.
    pub pressure: Option<f32>,
}

impl PressureReading {
    /// Creates a new reading.
    #[must_use]
    pub const fn new(index: u64, elapsed: Duration, pressure: Option<f32>) -> Self {
        Self {
            index,
            elapsed,
            pressure,
        }
    }

    /// Returns the elapsed time in seconds.
    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Returns the elapsed time as text with microsecond precision.
    #[must_use]
    pub fn timestamp_text(&self) -> String {
        format!("{:.6}", self.elapsed_secs())
    }

    /// Returns true if the read succeeded.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.pressure.is_some()
    }
}
