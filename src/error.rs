//! Error types for the iongauge library.

use thiserror::Error;

/// The main error type for gauge operations.
///
/// Everything in here ends a polling run. Recoverable protocol problems are
/// reported as [`FrameError`] and never escape the gauge client.
#[derive(Debug, Error)]
pub enum Error {
    /// Serial port error.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame encoding/decoding error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Connection is not established.
    #[error("not connected")]
    NotConnected,

    /// The serial channel was closed by the other side.
    #[error("serial channel closed")]
    ChannelClosed,

    /// Writing a request did not complete in time.
    #[error("write timed out after {timeout_ms}ms")]
    WriteTimeout { timeout_ms: u64 },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The sample store could not be written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl Error {
    /// Returns true if a polling run may continue after this error.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Frame(_))
    }
}

/// Response validation errors.
///
/// Each one turns a single sample into a failed read.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FrameError {
    /// Response shorter than the minimum response length.
    #[error("frame too short: need at least 10 bytes, got {len}")]
    TooShort { len: usize },

    /// First byte is not the response start marker.
    #[error("bad start marker: 0x{0:02x}")]
    BadStartMarker(u8),

    /// Response came from a different device.
    #[error("unexpected address: expected 0x{expected:02x}, got 0x{got:02x}")]
    AddressMismatch { expected: u8, got: u8 },

    /// Response echoes a different command.
    #[error("unexpected command echo: expected 0x{expected:02x}, got 0x{got:02x}")]
    CommandMismatch { expected: u8, got: u8 },

    /// Response checksum does not match its contents.
    #[error("checksum mismatch: expected 0x{expected:04x}, got 0x{got:04x}")]
    ChecksumMismatch { expected: u16, got: u16 },

    /// Pressure bytes do not hold a finite float.
    #[error("invalid pressure value: {0}")]
    InvalidPressure(f32),
}

/// Configuration errors, raised before polling starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration sources could not be read or merged.
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// A configuration file does not exist.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(std::path::PathBuf),

    /// Device address is not a two-digit hex string.
    #[error("invalid device address {0:?}: expected two hex digits")]
    InvalidAddress(String),

    /// A field holds an unusable value.
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

/// Sample store errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store file could not be opened or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias for gauge operations.
pub type Result<T> = std::result::Result<T, Error>;
