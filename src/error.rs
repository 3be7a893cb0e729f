//! Firmware error type
//!
//! HAL errors are reduced to their embedded-hal `ErrorKind` so the type stays
//! `Copy` and independent of the concrete peripheral drivers.

use core::fmt;

use embedded_hal::digital::{self, Error as _};
use embedded_hal::spi::{self, Error as _};

/// Result alias used throughout the firmware
pub type Result<T> = core::result::Result<T, Error>;

/// Errors surfaced by the register bus, the front-end lines and the
/// streaming hardware seams
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub enum Error {
    /// The SPI peripheral failed a register bus transaction
    Spi(spi::ErrorKind),
    /// A control line (chip select, enable, clock gate) could not be driven
    Pin(digital::ErrorKind),
    /// Register index outside the chip's register file
    InvalidRegister(u8),
    /// Register value does not fit the chip's data width
    ValueOutOfRange {
        /// Register index
        index: u8,
        /// Rejected value
        value: u16,
    },
    /// The bulk endpoint cannot accept another transfer
    TransferQueueFull,
    /// Unknown vendor request or request argument
    UnsupportedRequest(u8),
}

impl Error {
    /// Wrap an SPI peripheral error
    pub fn spi<E: spi::Error>(err: E) -> Self {
        Self::Spi(err.kind())
    }

    /// Wrap a digital pin error
    pub fn pin<E: digital::Error>(err: E) -> Self {
        Self::Pin(err.kind())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spi(kind) => write!(f, "register bus error: {kind}"),
            Self::Pin(kind) => write!(f, "control line error: {kind}"),
            Self::InvalidRegister(index) => write!(f, "invalid register index {index}"),
            Self::ValueOutOfRange { index, value } => {
                write!(f, "value {value:#05x} out of range for register {index}")
            }
            Self::TransferQueueFull => f.write_str("bulk transfer queue full"),
            Self::UnsupportedRequest(request) => write!(f, "unsupported request {request}"),
        }
    }
}
