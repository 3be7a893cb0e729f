//! Sample clock gate
//!
//! The sample clock paces the shift register. While it is gated off the
//! hardware side never advances the buffer offset.

use embedded_hal::digital::OutputPin;

use crate::error::{Error, Result};

/// Start/stop control over the sample clock
pub trait SampleClock {
    /// Let the clock run
    fn enable(&mut self) -> Result<()>;

    /// Stop the clock; no further sample exchanges happen after this returns
    fn disable(&mut self) -> Result<()>;

    /// Check if the clock is running
    fn is_enabled(&self) -> bool;
}

/// Sample clock gated by one active-high output line
pub struct GatedSampleClock<P> {
    gate: P,
    enabled: bool,
}

impl<P: OutputPin> GatedSampleClock<P> {
    /// Take the gate line and hold the clock stopped
    pub fn new(mut gate: P) -> Result<Self> {
        gate.set_low().map_err(Error::pin)?;
        Ok(Self {
            gate,
            enabled: false,
        })
    }

    /// Give the gate line back
    pub fn release(self) -> P {
        self.gate
    }
}

impl<P: OutputPin> SampleClock for GatedSampleClock<P> {
    fn enable(&mut self) -> Result<()> {
        self.gate.set_high().map_err(Error::pin)?;
        self.enabled = true;
        trace!("sample clock on");
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        self.gate.set_low().map_err(Error::pin)?;
        self.enabled = false;
        trace!("sample clock off");
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}
