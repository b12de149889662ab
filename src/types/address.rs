//! RS-485 device addresses.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Single-byte device address on the RS-485 bus.
///
/// Configured as a two-digit hex string such as `"01"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address(u8);

impl Address {
    /// Creates an address from its raw byte.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Returns the raw address byte.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl FromStr for Address {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() != 2 {
            return Err(ConfigError::InvalidAddress(s.to_owned()));
        }

        let mut byte = [0u8; 1];
        hex::decode_to_slice(trimmed, &mut byte)
            .map_err(|_| ConfigError::InvalidAddress(s.to_owned()))?;
        Ok(Self(byte[0]))
    }
}

impl From<u8> for Address {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}", self.0)
    }
}
