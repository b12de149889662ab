//! Protocol definitions for gauge communication.
//!
//! This module contains the low-level protocol types:
//! - CRC-16 (Modbus) checksum
//! - Request frame encoding and response frame decoding
//! - Command codes

pub mod command;
pub mod crc;
pub mod frame;

pub use command::CommandCode;
pub use crc::{checksum, checksum_bytes};
pub use frame::{
    MAX_RESPONSE_LEN, MIN_RESPONSE_LEN, PressureFrame, REQUEST_START, RESPONSE_START,
    decode as decode_frame, encode as encode_frame, verify_checksum,
};
