//! # iongauge
//!
//! A Rust driver for RS-485 ionization vacuum gauges.
//!
//! This library polls a gauge with a framed binary request/response protocol,
//! decodes the pressure reading and appends timestamped samples to a table.
//!
//! ## Features
//!
//! - Async/await based API using Tokio, one exchange at a time
//! - CRC-16 (Modbus) framed requests, validated responses
//! - Fixed-cadence polling with cooperative stop
//! - Append-only CSV sample storage
//! - Layered TOML/environment configuration
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use iongauge::{Address, CsvRecorder, GaugeClient, GaugeConfig, PollingConfig, PollingLoop};
//! use iongauge::transport::SerialConfig;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), iongauge::Error> {
//!     let serial = SerialConfig::new("/dev/ttyUSB0").baud_rate(19_200);
//!     let mut client = GaugeClient::serial(serial, GaugeConfig::new(Address::new(0x01)));
//!     client.connect().await?;
//!
//!     // One reading
//!     if let Some(torr) = client.read_pressure().await? {
//!         println!("pressure: {torr:e} Torr");
//!     }
//!
//!     // A one-minute run, one sample every five seconds
//!     let config = PollingConfig::new(Duration::from_secs(5), Duration::from_secs(60));
//!     let mut recorder = CsvRecorder::new("pressure.csv");
//!     PollingLoop::new(config).run(&mut client, &mut recorder).await?;
//!
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`protocol`] - CRC, frame encoding/decoding and command codes
//! - [`transport`] - Transport trait and the serial implementation
//! - [`client`] - [`GaugeClient`], one request/response exchange at a time
//! - [`polling`] - [`PollingLoop`], the timed read loop
//! - [`recorder`] - Sample storage
//! - [`config`] - Configuration loading
//! - [`types`] - Addresses and readings

pub mod client;
pub mod config;
pub mod error;
pub mod polling;
pub mod protocol;
pub mod recorder;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::{GaugeClient, GaugeConfig};
pub use config::AppConfig;
pub use error::{ConfigError, Error, FrameError, Result, StorageError};
pub use polling::{LoopState, PollingConfig, PollingLoop, RunSummary, StopHandle};
pub use protocol::{CommandCode, PressureFrame};
pub use recorder::{CsvRecorder, MemoryRecorder, Recorder};
pub use transport::{SerialTransport, Transport, list_ports};
pub use types::{Address, PressureReading};
