//! Indicator LEDs
//!
//! Heartbeat LED plus one LED per streaming direction, so the board shows
//! which mode the host selected.

use embassy_stm32::gpio::Output;

use crate::types::TransceiverMode;

/// LED level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LedState {
    /// Dark
    #[default]
    Off,
    /// Lit
    On,
}

impl LedState {
    /// Opposite level
    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Off => Self::On,
            Self::On => Self::Off,
        }
    }
}

impl defmt::Format for LedState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Off => defmt::write!(f, "OFF"),
            Self::On => defmt::write!(f, "ON"),
        }
    }
}

/// Heartbeat LED
pub struct StatusLed<'d> {
    pin: Output<'d>,
    state: LedState,
}

impl<'d> StatusLed<'d> {
    /// Take the pin, LED off
    #[must_use]
    pub fn new(mut pin: Output<'d>) -> Self {
        pin.set_low();
        Self {
            pin,
            state: LedState::Off,
        }
    }

    /// Drive the LED to `state`
    pub fn set(&mut self, state: LedState) {
        match state {
            LedState::On => self.pin.set_high(),
            LedState::Off => self.pin.set_low(),
        }
        self.state = state;
    }

    /// Flip the LED
    pub fn toggle(&mut self) {
        self.set(self.state.toggle());
    }
}

/// RX/TX indicator pair
pub struct ModeLeds<'d> {
    rx: Output<'d>,
    tx: Output<'d>,
}

impl<'d> ModeLeds<'d> {
    /// Take both pins, both LEDs off
    #[must_use]
    pub fn new(rx: Output<'d>, tx: Output<'d>) -> Self {
        let mut leds = Self { rx, tx };
        leds.show(TransceiverMode::Off);
        leds
    }

    /// Light the LED matching `mode`
    pub fn show(&mut self, mode: TransceiverMode) {
        let (rx, tx) = match mode {
            TransceiverMode::Off => (LedState::Off, LedState::Off),
            TransceiverMode::Receive => (LedState::On, LedState::Off),
            TransceiverMode::Transmit => (LedState::Off, LedState::On),
        };
        Self::drive(&mut self.rx, rx);
        Self::drive(&mut self.tx, tx);
    }

    fn drive(pin: &mut Output<'d>, state: LedState) {
        match state {
            LedState::On => pin.set_high(),
            LedState::Off => pin.set_low(),
        }
    }
}
