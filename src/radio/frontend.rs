//! RF Front-End Mode Controller
//!
//! Projects a chip power state onto the transceiver's three control lines:
//! master enable, TX enable and RX enable. Every transition releases the
//! conflicting lines before asserting the target ones, so TX and RX are never
//! enabled together, and neither is enabled while the master enable is low.
//!
//! ```text
//!              enable  tx  rx
//!  SHUTDOWN      0      0   0
//!  STANDBY       1      0   0
//!  TRANSMIT      1      1   0
//!  RECEIVE       1      0   1
//! ```

use embedded_hal::digital::StatefulOutputPin;

use crate::error::{Error, Result};
use crate::types::{ChipPowerState, ControlLines};

/// Transceiver power/mode control lines (active high)
pub struct FrontEnd<P> {
    enable: P,
    tx_enable: P,
    rx_enable: P,
}

impl<P: StatefulOutputPin> FrontEnd<P> {
    /// Take the control lines and drive the chip into shutdown
    pub fn new(enable: P, tx_enable: P, rx_enable: P) -> Result<Self> {
        let mut frontend = Self {
            enable,
            tx_enable,
            rx_enable,
        };
        frontend.shutdown()?;
        Ok(frontend)
    }

    /// Power down all RF blocks; the register bus stays usable
    pub fn shutdown(&mut self) -> Result<()> {
        self.rx_enable.set_low().map_err(Error::pin)?;
        self.tx_enable.set_low().map_err(Error::pin)?;
        self.enable.set_low().map_err(Error::pin)
    }

    /// Keep the synthesizer warm with TX and RX off
    pub fn standby(&mut self) -> Result<()> {
        self.rx_enable.set_low().map_err(Error::pin)?;
        self.tx_enable.set_low().map_err(Error::pin)?;
        self.enable.set_high().map_err(Error::pin)
    }

    /// Power the transmit chain
    pub fn transmit(&mut self) -> Result<()> {
        self.rx_enable.set_low().map_err(Error::pin)?;
        self.enable.set_high().map_err(Error::pin)?;
        self.tx_enable.set_high().map_err(Error::pin)
    }

    /// Power the receive chain
    pub fn receive(&mut self) -> Result<()> {
        self.tx_enable.set_low().map_err(Error::pin)?;
        self.enable.set_high().map_err(Error::pin)?;
        self.rx_enable.set_high().map_err(Error::pin)
    }

    /// Drive the lines for `state`
    pub fn set_state(&mut self, state: ChipPowerState) -> Result<()> {
        debug!("xcvr -> {}", state);
        match state {
            ChipPowerState::Shutdown => self.shutdown(),
            ChipPowerState::Standby => self.standby(),
            ChipPowerState::Transmit => self.transmit(),
            ChipPowerState::Receive => self.receive(),
        }
    }

    /// Current line levels, read back from the pins
    pub fn lines(&mut self) -> Result<ControlLines> {
        Ok(ControlLines::new(
            self.enable.is_set_high().map_err(Error::pin)?,
            self.tx_enable.is_set_high().map_err(Error::pin)?,
            self.rx_enable.is_set_high().map_err(Error::pin)?,
        ))
    }

    /// Chip state as the hardware lines currently express it
    ///
    /// Reflects changes made by anything else driving the same pins.
    pub fn current_state(&mut self) -> Result<ChipPowerState> {
        self.lines().map(ChipPowerState::from_lines)
    }

    /// Give the pins back as (enable, tx, rx)
    pub fn release(self) -> (P, P, P) {
        (self.enable, self.tx_enable, self.rx_enable)
    }
}
