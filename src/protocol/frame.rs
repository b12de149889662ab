//! Frame encoding and decoding for the gauge's binary protocol.
//!
//! Requests:
//! ```text
//! ┌──────┬─────────┬─────────┬───────────┬────────────┐
//! │ 0x21 │ address │ command │  payload  │ crc16 (LE) │
//! │  1   │    1    │    1    │  0..N     │     2      │
//! └──────┴─────────┴─────────┴───────────┴────────────┘
//! ```
//!
//! Pressure responses:
//! ```text
//! ┌──────┬─────────┬──────────┬───────┬──────────────────┬────────────┐
//! │ 0x2a │ address │ cmd echo │ units │ pressure (f32 BE)│ crc16 (LE) │
//! │  1   │    1    │    1     │   1   │        4         │     2      │
//! └──────┴─────────┴──────────┴───────┴──────────────────┴────────────┘
//! ```
//!
//! The checksum covers everything between the start marker and the checksum.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::FrameError;
use crate::protocol::crc;
use crate::types::Address;

/// Request start marker (`!`).
pub const REQUEST_START: u8 = b'!';

/// Response start marker (`*`).
pub const RESPONSE_START: u8 = b'*';

/// Shortest response that carries a pressure value.
pub const MIN_RESPONSE_LEN: usize = 10;

/// Read buffer size for a single response.
pub const MAX_RESPONSE_LEN: usize = 20;

/// Offset of the pressure float in a response.
const PRESSURE_OFFSET: usize = 4;

/// Offset of the checksum in a pressure response.
const CRC_OFFSET: usize = 8;

/// A validated pressure response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureFrame {
    /// Responding device address.
    pub address: u8,
    /// Echoed command code.
    pub command: u8,
    /// Units code reported by the gauge (not interpreted).
    pub units: u8,
    /// Pressure value.
    pub pressure: f32,
}

/// Encodes a request frame.
///
/// The checksum is computed over the address, command and payload; the start
/// marker is not included.
#[must_use]
pub fn encode(address: Address, command: impl Into<u8>, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(5 + payload.len());
    buf.put_u8(REQUEST_START);
    buf.put_u8(address.value());
    buf.put_u8(command.into());
    buf.put_slice(payload);
    let crc = crc::checksum(&buf[1..]);
    buf.put_u16_le(crc);
    buf.freeze()
}

/// Decodes and validates a pressure response.
///
/// Checks are applied in order: length, start marker, address, command echo.
/// The units byte is accepted as-is. The response checksum is not checked
/// here, see [`verify_checksum`].
pub fn decode(
    response: &[u8],
    expected_address: Address,
    expected_echo: u8,
) -> Result<PressureFrame, FrameError> {
    if response.len() < MIN_RESPONSE_LEN {
        return Err(FrameError::TooShort {
            len: response.len(),
        });
    }

    if response[0] != RESPONSE_START {
        return Err(FrameError::BadStartMarker(response[0]));
    }

    let address = response[1];
    if address != expected_address.value() {
        return Err(FrameError::AddressMismatch {
            expected: expected_address.value(),
            got: address,
        });
    }

    let command = response[2];
    if command != expected_echo {
        return Err(FrameError::CommandMismatch {
            expected: expected_echo,
            got: command,
        });
    }

    let units = response[3];
    let pressure = f32::from_be_bytes([
        response[PRESSURE_OFFSET],
        response[PRESSURE_OFFSET + 1],
        response[PRESSURE_OFFSET + 2],
        response[PRESSURE_OFFSET + 3],
    ]);
    if !pressure.is_finite() {
        return Err(FrameError::InvalidPressure(pressure));
    }

    Ok(PressureFrame {
        address,
        command,
        units,
        pressure,
    })
}

/// Checks the checksum trailing a pressure response.
///
/// Bytes 8..10 must hold the little-endian CRC of bytes 1..8.
pub fn verify_checksum(response: &[u8]) -> Result<(), FrameError> {
    if response.len() < MIN_RESPONSE_LEN {
        return Err(FrameError::TooShort {
            len: response.len(),
        });
    }

    let expected = crc::checksum(&response[1..CRC_OFFSET]);
    let got = u16::from_le_bytes([response[CRC_OFFSET], response[CRC_OFFSET + 1]]);
    if expected == got {
        Ok(())
    } else {
        Err(FrameError::ChecksumMismatch { expected, got })
    }
}
