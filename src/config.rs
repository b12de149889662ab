//! Configuration loading.
//!
//! Settings are layered, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. TOML files, in the order given (for example a gauge file and a
//!    recording file)
//! 3. Environment variables prefixed with `IONGAUGE_`, sections separated by
//!    `__` (e.g. `IONGAUGE_SERIAL__PORT=/dev/ttyUSB1`)
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 19200
//! address = "01"
//! timeout = 1.0
//! min_delay = 0.05
//!
//! [logging]
//! store_data = true
//! output = "data/vacuum.csv"
//! interval = 5.0
//! duration = 300
//! ```
//!
//! Times are in seconds. `$VAR` and `${VAR}` in `logging.output` are
//! replaced with environment variables; unset variables are left as written.
//! The loaded [`AppConfig`] is immutable and is turned
//! into per-component settings with [`AppConfig::serial_config`],
//! [`AppConfig::gauge_config`] and [`AppConfig::polling_config`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Deserializer, Serialize};

use crate::client::GaugeConfig;
use crate::error::ConfigError;
use crate::polling::PollingConfig;
use crate::transport::SerialConfig;
use crate::types::Address;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "IONGAUGE_";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Serial link and device settings.
    pub serial: SerialSection,
    /// Sampling and storage settings.
    pub logging: LoggingSection,
}

/// `[serial]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSection {
    /// Serial port path.
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Device address as two hex digits.
    #[serde(deserialize_with = "address_text")]
    pub address: String,
    /// Read timeout in seconds.
    pub timeout: f64,
    /// Write timeout in seconds.
    pub write_timeout: f64,
    /// Minimum gap between commands in seconds.
    pub min_delay: f64,
    /// Wait between request and response in seconds.
    pub settle_delay: f64,
    /// Check the checksum trailing each response.
    pub verify_response_crc: bool,
}

impl Default for SerialSection {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".into(),
            baud_rate: 19_200,
            address: "01".into(),
            timeout: 1.0,
            write_timeout: 2.0,
            min_delay: 0.05,
            settle_delay: 0.1,
            verify_response_crc: false,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Append samples to the output table.
    pub store_data: bool,
    /// Output table path.
    pub output: PathBuf,
    /// Seconds between samples.
    pub interval: f64,
    /// Run length in seconds, 0 for no limit.
    pub duration: f64,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            store_data: true,
            output: PathBuf::from("pressure.csv"),
            interval: 5.0,
            duration: 300.0,
        }
    }
}

/// Reads the address as text.
///
/// Environment values such as `01` arrive as integers; their digits are the
/// hex digits that were written.
fn address_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Text {
        Hex(String),
        Digits(u64),
    }

    Ok(match Text::deserialize(deserializer)? {
        Text::Hex(text) => text,
        Text::Digits(digits) => format!("{digits:02}"),
    })
}

/// Replaces `$NAME` and `${NAME}` with the value of environment variable
/// `NAME`. Unset variables and malformed references are kept.
fn expand_env(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match std::env::var(name) {
            Ok(value) if !name.is_empty() => out.push_str(&value),
            _ => out.push_str(&rest[pos..=pos + consumed]),
        }
        rest = &after[consumed..];
    }

    out.push_str(rest);
    out
}

/// Converts a seconds field into a `Duration`.
fn seconds(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::Invalid {
        field,
        reason: format!("{value} is not a valid number of seconds"),
    })
}

impl AppConfig {
    /// Builds the layered provider for the given files.
    pub fn figment<P: AsRef<Path>>(files: &[P]) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        for file in files {
            figment = figment.merge(Toml::file(file.as_ref()));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads and validates the configuration.
    ///
    /// Every listed file must exist.
    pub fn load<P: AsRef<Path>>(files: &[P]) -> Result<Self, ConfigError> {
        for file in files {
            let path = file.as_ref();
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
        }

        let config: Self = Self::figment(files).extract()?;
        config.validate()?;
        tracing::debug!("loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Checks every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.address()?;

        if self.serial.port.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "serial.port",
                reason: "must not be empty".into(),
            });
        }
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "serial.baud_rate",
                reason: "must be positive".into(),
            });
        }

        seconds("serial.timeout", self.serial.timeout)?;
        seconds("serial.write_timeout", self.serial.write_timeout)?;
        seconds("serial.min_delay", self.serial.min_delay)?;
        seconds("serial.settle_delay", self.serial.settle_delay)?;
        seconds("logging.duration", self.logging.duration)?;

        if seconds("logging.interval", self.logging.interval)?.is_zero() {
            return Err(ConfigError::Invalid {
                field: "logging.interval",
                reason: "must be positive".into(),
            });
        }

        if self.logging.store_data && self.logging.output.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "logging.output",
                reason: "required when store_data is set".into(),
            });
        }

        Ok(())
    }

    /// Returns the parsed device address.
    pub fn address(&self) -> Result<Address, ConfigError> {
        self.serial.address.parse()
    }

    /// Returns the output table path with environment variables expanded.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        match self.logging.output.to_str() {
            Some(text) => PathBuf::from(expand_env(text)),
            None => self.logging.output.clone(),
        }
    }

    /// Returns the serial transport settings.
    pub fn serial_config(&self) -> Result<SerialConfig, ConfigError> {
        Ok(SerialConfig::new(self.serial.port.clone())
            .baud_rate(self.serial.baud_rate)
            .read_timeout(seconds("serial.timeout", self.serial.timeout)?)
            .write_timeout(seconds("serial.write_timeout", self.serial.write_timeout)?))
    }

    /// Returns the gauge client settings.
    pub fn gauge_config(&self) -> Result<GaugeConfig, ConfigError> {
        Ok(GaugeConfig::new(self.address()?)
            .settle_delay(seconds("serial.settle_delay", self.serial.settle_delay)?)
            .min_command_delay(seconds("serial.min_delay", self.serial.min_delay)?)
            .verify_response_crc(self.serial.verify_response_crc))
    }

    /// Returns the polling loop settings.
    pub fn polling_config(&self) -> Result<PollingConfig, ConfigError> {
        Ok(PollingConfig::new(
            seconds("logging.interval", self.logging.interval)?,
            seconds("logging.duration", self.logging.duration)?,
        )
        .store(self.logging.store_data))
    }
}
