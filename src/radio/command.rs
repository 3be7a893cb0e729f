//! Host commands
//!
//! Typed form of the vendor control requests the host sends on endpoint 0.
//!
//! ```text
//!  bRequest  wValue      wIndex     data stage
//!     1      mode        -          -
//!     2      value       register   -
//!     3      -           register   2 bytes LE (device to host)
//! ```

use crate::types::{ChipPowerState, TransceiverMode};

/// Vendor request codes understood by the device
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum VendorRequest {
    /// Select OFF / RECEIVE / TRANSMIT
    SetTransceiverMode = 1,
    /// Write one transceiver register
    WriteRegister = 2,
    /// Read one transceiver register
    ReadRegister = 3,
}

impl VendorRequest {
    /// Decode `bRequest`
    #[must_use]
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::SetTransceiverMode),
            2 => Some(Self::WriteRegister),
            3 => Some(Self::ReadRegister),
            _ => None,
        }
    }
}

/// One host command
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Switch the transceiver mode
    SetTransceiverMode(TransceiverMode),
    /// Write `value` to register `index`
    WriteRegister {
        /// Register index
        index: u8,
        /// Register value
        value: u16,
    },
    /// Read register `index`
    ReadRegister {
        /// Register index
        index: u8,
    },
    /// Report the current transceiver mode
    GetTransceiverMode,
    /// Report the chip power state read back from the control lines
    GetChipPowerState,
}

impl Command {
    /// Decode a vendor control request
    ///
    /// Returns `None` for unknown requests and unknown modes. Register
    /// indices are passed through as-is; range checks happen when the
    /// command runs.
    #[must_use]
    pub fn from_vendor_request(request: u8, value: u16, index: u16) -> Option<Self> {
        match VendorRequest::from_u8(request)? {
            VendorRequest::SetTransceiverMode => {
                let mode = TransceiverMode::from_u8(u8::try_from(value).ok()?)?;
                Some(Self::SetTransceiverMode(mode))
            }
            VendorRequest::WriteRegister => Some(Self::WriteRegister {
                index: u8::try_from(index).unwrap_or(u8::MAX),
                value,
            }),
            VendorRequest::ReadRegister => Some(Self::ReadRegister {
                index: u8::try_from(index).unwrap_or(u8::MAX),
            }),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Command {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::SetTransceiverMode(mode) => defmt::write!(f, "set mode {}", mode),
            Self::WriteRegister { index, value } => {
                defmt::write!(f, "write reg {=u8} = {=u16:#x}", index, value);
            }
            Self::ReadRegister { index } => defmt::write!(f, "read reg {=u8}", index),
            Self::GetTransceiverMode => defmt::write!(f, "get mode"),
            Self::GetChipPowerState => defmt::write!(f, "get power state"),
        }
    }
}

/// Result of a successful command
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Response {
    /// Command done, nothing to report
    Ack,
    /// Current transceiver mode
    Mode(TransceiverMode),
    /// Current chip power state
    PowerState(ChipPowerState),
    /// Register contents
    Register {
        /// Register index
        index: u8,
        /// Register value
        value: u16,
    },
}

impl Response {
    /// Data stage sent back to the host (little-endian), if any
    #[must_use]
    pub fn data_stage(self) -> Option<[u8; 2]> {
        match self {
            Self::Ack => None,
            Self::Mode(mode) => Some([mode.as_u8(), 0]),
            Self::PowerState(state) => Some([state as u8, 0]),
            Self::Register { value, .. } => Some(value.to_le_bytes()),
        }
    }
}
