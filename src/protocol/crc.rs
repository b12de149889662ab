//! CRC-16 (Modbus) checksum used by the gauge frames.

/// Initial accumulator value.
const CRC_INIT: u16 = 0xFFFF;

/// Reflected polynomial 0x8005.
const CRC_POLY: u16 = 0xA001;

/// Computes the CRC-16/MODBUS checksum of `data`.
#[must_use]
pub fn checksum(data: &[u8]) -> u16 {
    let mut crc = CRC_INIT;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ CRC_POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Computes the checksum of `data` in wire order (low byte first).
#[must_use]
pub fn checksum_bytes(data: &[u8]) -> [u8; 2] {
    checksum(data).to_le_bytes()
}
