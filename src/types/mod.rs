//! Data types for gauge entities.
//!
//! This module contains the core data structures used throughout the library:
//! - Device addresses
//! - Pressure readings

pub mod address;
pub mod reading;

pub use address::Address;
pub use reading::PressureReading;
