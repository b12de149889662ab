//! Gauge client.
//!
//! [`GaugeClient`] owns the transport and runs one request/response exchange
//! at a time.

use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use crate::error::{Error, FrameError, Result};
use crate::protocol::{
    CommandCode, MAX_RESPONSE_LEN, PressureFrame, decode_frame, encode_frame, verify_checksum,
};
use crate::transport::{SerialConfig, SerialTransport, Transport};
use crate::types::Address;

/// Default wait between writing a request and reading the response.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Default minimum gap between two commands.
pub const DEFAULT_MIN_COMMAND_DELAY: Duration = Duration::from_millis(50);

/// Per-device settings for a [`GaugeClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaugeConfig {
    /// Device address on the bus.
    pub address: Address,
    /// Wait after a request before the response is read.
    pub settle_delay: Duration,
    /// Minimum gap between the end of one command and the start of the next.
    pub min_command_delay: Duration,
    /// Reject responses whose trailing checksum does not match.
    pub verify_response_crc: bool,
}

impl GaugeConfig {
    /// Creates a configuration with default timings for the given address.
    #[must_use]
    pub const fn new(address: Address) -> Self {
        Self {
            address,
            settle_delay: DEFAULT_SETTLE_DELAY,
            min_command_delay: DEFAULT_MIN_COMMAND_DELAY,
            verify_response_crc: false,
        }
    }

    /// Sets the settle delay.
    #[must_use]
    pub const fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Sets the minimum gap between commands.
    #[must_use]
    pub const fn min_command_delay(mut self, delay: Duration) -> Self {
        self.min_command_delay = delay;
        self
    }

    /// Enables or disables response checksum verification.
    #[must_use]
    pub const fn verify_response_crc(mut self, enabled: bool) -> Self {
        self.verify_response_crc = enabled;
        self
    }
}

/// Client for a single ionization gauge.
pub struct GaugeClient<T> {
    transport: T,
    config: GaugeConfig,
    last_command: Option<Instant>,
}

impl GaugeClient<SerialTransport> {
    /// Creates a client for a gauge on a serial port.
    #[must_use]
    pub const fn serial(serial: SerialConfig, config: GaugeConfig) -> Self {
        Self::new(SerialTransport::new(serial), config)
    }
}

impl<T: Transport> GaugeClient<T> {
    /// Creates a new client with the given transport.
    #[must_use]
    pub const fn new(transport: T, config: GaugeConfig) -> Self {
        Self {
            transport,
            config,
            last_command: None,
        }
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &GaugeConfig {
        &self.config
    }

    /// Returns the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Opens the transport.
    pub async fn connect(&mut self) -> Result<()> {
        self.transport.open().await?;
        tracing::info!("gauge {} ready", self.config.address);
        Ok(())
    }

    /// Closes the transport.
    pub async fn disconnect(&mut self) -> Result<()> {
        self.transport.close().await
    }

    /// Returns true if the transport is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.is_open()
    }

    /// Sends a command and returns the raw response.
    ///
    /// The response is whatever arrived within the transport's read timeout
    /// after the settle delay, up to [`MAX_RESPONSE_LEN`] bytes. It is not
    /// validated.
    pub async fn exchange(&mut self, command: CommandCode, payload: &[u8]) -> Result<Bytes> {
        if !self.transport.is_open() {
            return Err(Error::NotConnected);
        }

        self.pace().await;

        let frame = encode_frame(self.config.address, command, payload);
        tracing::trace!("sending {:?}: {}", command, hex::encode(&frame));

        // Drop anything left over from an earlier exchange
        self.transport.reset_input_buffer()?;
        self.transport.write(frame).await?;
        self.transport.flush().await?;

        tokio::time::sleep(self.config.settle_delay).await;

        let response = self.transport.read(MAX_RESPONSE_LEN).await;
        self.last_command = Some(Instant::now());
        response
    }

    /// Reads the ionization gauge pressure in Torr.
    ///
    /// Returns `Ok(None)` if the response was missing or failed validation;
    /// the reason is logged. Only transport failures are returned as errors.
    pub async fn read_pressure(&mut self) -> Result<Option<f32>> {
        let command = CommandCode::ReadIonGaugePressure;
        let response = self.exchange(command, &[]).await?;

        match self.validate(&response, command.into()) {
            Ok(frame) => {
                tracing::trace!(
                    "{:?} reply, units code 0x{:02x}",
                    CommandCode::from_byte(frame.command),
                    frame.units
                );
                Ok(Some(frame.pressure))
            }
            Err(e) => {
                tracing::warn!(
                    "rejected pressure response [{}]: {}",
                    hex::encode(&response[..]),
                    e
                );
                Ok(None)
            }
        }
    }

    fn validate(
        &self,
        response: &[u8],
        echo: u8,
    ) -> std::result::Result<PressureFrame, FrameError> {
        let frame = decode_frame(response, self.config.address, echo)?;
        if self.config.verify_response_crc {
            verify_checksum(response)?;
        }
        Ok(frame)
    }

    /// Waits until the minimum command gap has passed.
    async fn pace(&self) {
        if let Some(last) = self.last_command {
            let ready = last + self.config.min_command_delay;
            if Instant::now() < ready {
                tokio::time::sleep_until(ready).await;
            }
        }
    }
}
