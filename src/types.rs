//! Shared types used across the firmware
//!
//! Operating modes for the whole device and for the RF front-end chip, plus
//! the transfer direction they imply.

use core::fmt;

/// Host-selected operating mode of the whole device
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TransceiverMode {
    /// Nothing streaming, RF circuits powered down
    #[default]
    Off = 0,
    /// Samples flow from the shift register to the host
    Receive = 1,
    /// Samples flow from the host to the shift register
    Transmit = 2,
}

impl TransceiverMode {
    /// Decode the wire/atomic representation
    #[must_use]
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Off),
            1 => Some(Self::Receive),
            2 => Some(Self::Transmit),
            _ => None,
        }
    }

    /// Wire/atomic representation
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if this mode moves samples
    #[must_use]
    pub const fn is_streaming(self) -> bool {
        !matches!(self, Self::Off)
    }

    /// Bulk transfer direction used while streaming in this mode
    #[must_use]
    pub const fn direction(self) -> Option<Direction> {
        match self {
            Self::Off => None,
            Self::Receive => Some(Direction::DeviceToHost),
            Self::Transmit => Some(Direction::HostToDevice),
        }
    }

    /// Chip power state this mode requires
    #[must_use]
    pub const fn chip_state(self) -> ChipPowerState {
        match self {
            Self::Off => ChipPowerState::Shutdown,
            Self::Receive => ChipPowerState::Receive,
            Self::Transmit => ChipPowerState::Transmit,
        }
    }
}

impl fmt::Display for TransceiverMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("OFF"),
            Self::Receive => f.write_str("RX"),
            Self::Transmit => f.write_str("TX"),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for TransceiverMode {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Off => defmt::write!(f, "OFF"),
            Self::Receive => defmt::write!(f, "RX"),
            Self::Transmit => defmt::write!(f, "TX"),
        }
    }
}

/// Power/circuit configuration of the RF front-end chip
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ChipPowerState {
    /// All RF blocks down; the register bus stays usable
    #[default]
    Shutdown,
    /// Synthesizer and LO running, ready for fast TX/RX entry
    Standby,
    /// Transmit chain powered
    Transmit,
    /// Receive chain powered
    Receive,
}

impl ChipPowerState {
    /// Decode from the master, TX and RX enable line levels
    ///
    /// TX wins over RX if both read back asserted.
    #[must_use]
    pub const fn from_lines(lines: ControlLines) -> Self {
        if !lines.enable {
            Self::Shutdown
        } else if lines.tx_enable {
            Self::Transmit
        } else if lines.rx_enable {
            Self::Receive
        } else {
            Self::Standby
        }
    }

    /// Line levels that realize this state
    #[must_use]
    pub const fn lines(self) -> ControlLines {
        match self {
            Self::Shutdown => ControlLines::new(false, false, false),
            Self::Standby => ControlLines::new(true, false, false),
            Self::Transmit => ControlLines::new(true, true, false),
            Self::Receive => ControlLines::new(true, false, true),
        }
    }
}

impl fmt::Display for ChipPowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => f.write_str("SHUTDOWN"),
            Self::Standby => f.write_str("STANDBY"),
            Self::Transmit => f.write_str("TRANSMIT"),
            Self::Receive => f.write_str("RECEIVE"),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ChipPowerState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Shutdown => defmt::write!(f, "SHUTDOWN"),
            Self::Standby => defmt::write!(f, "STANDBY"),
            Self::Transmit => defmt::write!(f, "TRANSMIT"),
            Self::Receive => defmt::write!(f, "RECEIVE"),
        }
    }
}

/// Levels of the three front-end control lines (true = asserted)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ControlLines {
    /// Master enable
    pub enable: bool,
    /// Transmit enable
    pub tx_enable: bool,
    /// Receive enable
    pub rx_enable: bool,
}

impl ControlLines {
    /// Create from individual levels
    #[must_use]
    pub const fn new(enable: bool, tx_enable: bool, rx_enable: bool) -> Self {
        Self {
            enable,
            tx_enable,
            rx_enable,
        }
    }

    /// Check the front-end exclusion rule
    ///
    /// TX and RX are never both asserted, and neither is asserted while the
    /// master enable is low.
    #[must_use]
    pub const fn is_consistent(self) -> bool {
        !(self.tx_enable && self.rx_enable)
            && (self.enable || (!self.tx_enable && !self.rx_enable))
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ControlLines {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Lines(en={}, tx={}, rx={})",
            self.enable,
            self.tx_enable,
            self.rx_enable
        );
    }
}

/// Bulk transfer direction, named from the device's point of view
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Bulk IN: shift register samples drained to the host
    DeviceToHost,
    /// Bulk OUT: host samples filled into the buffer
    HostToDevice,
}

#[cfg(feature = "embedded")]
impl defmt::Format for Direction {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::DeviceToHost => defmt::write!(f, "IN"),
            Self::HostToDevice => defmt::write!(f, "OUT"),
        }
    }
}
