//! Command codes for the gauge's binary protocol.

/// Command codes sent to the gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandCode {
    /// Read the ionization gauge pressure only.
    ReadIonGaugePressure = 0x02,
}

impl CommandCode {
    /// Parses a command code from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x02 => Some(Self::ReadIonGaugePressure),
            _ => None,
        }
    }
}

impl From<CommandCode> for u8 {
    fn from(cmd: CommandCode) -> Self {
        cmd as Self
    }
}
