//! Transport layer for gauge communication.
//!
//! This module provides the abstraction the gauge client talks through.
//! Currently only RS-485 over a serial port is implemented.

#[cfg(test)]
pub(crate) mod mock;
pub mod serial;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::error::Result;

/// Trait for byte-oriented, timeout-capable transports.
pub trait Transport: Send {
    /// Opens the channel.
    fn open(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Closes the channel.
    fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Writes all of `data`.
    fn write(&mut self, data: Bytes) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Reads up to `max_bytes`.
    ///
    /// Returns whatever arrived before the read timeout, which may be short or
    /// empty. Fails only if the channel itself is broken.
    fn read(&mut self, max_bytes: usize)
    -> Pin<Box<dyn Future<Output = Result<Bytes>> + Send + '_>>;

    /// Flushes pending output.
    fn flush(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Discards any buffered input.
    fn reset_input_buffer(&mut self) -> Result<()>;

    /// Returns true if the channel is open.
    fn is_open(&self) -> bool;
}

pub use serial::{SerialConfig, SerialTransport, list_ports};
