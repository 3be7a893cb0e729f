//! Transceiver Register Bus Driver
//!
//! Bit-exact register access to the RF transceiver over a synchronous serial
//! bus. One register access is one 16-bit frame framed by chip select:
//!
//! ```text
//!  15   14..10    9..0
//! ┌───┬────────┬──────────┐
//! │ R │ index  │  value   │   write: R = 0, value = data
//! └───┴────────┴──────────┘   read:  R = 1, response low bits = data
//! ```
//!
//! The bus has no acknowledgement. A missing or faulty chip reads back
//! whatever the data line floats to.

use core::marker::PhantomData;

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use crate::error::{Error, Result};

/// Register frame layout of a particular chip
pub trait FrameFormat {
    /// Number of addressable registers
    const REGISTER_COUNT: usize;
    /// Bit position of the register index field
    const INDEX_SHIFT: u32;
    /// Width of the register data field
    const DATA_BITS: u32;
    /// Bit set in a read request frame
    const READ_FLAG: u16;

    /// Mask selecting the data field
    const DATA_MASK: u16 = (1 << Self::DATA_BITS) - 1;

    /// Build a write frame (value masked to the data width)
    #[must_use]
    fn write_frame(index: u8, value: u16) -> u16 {
        (u16::from(index) << Self::INDEX_SHIFT) | (value & Self::DATA_MASK)
    }

    /// Build a read request frame
    #[must_use]
    fn read_frame(index: u8) -> u16 {
        Self::READ_FLAG | (u16::from(index) << Self::INDEX_SHIFT)
    }

    /// Extract register data from a response frame
    #[must_use]
    fn response_value(frame: u16) -> u16 {
        frame & Self::DATA_MASK
    }
}

/// MAX2837-style framing: 32 registers of 10 bits
#[derive(Clone, Copy, Debug, Default)]
pub struct Max2837Frame;

impl FrameFormat for Max2837Frame {
    const REGISTER_COUNT: usize = 32;
    const INDEX_SHIFT: u32 = 10;
    const DATA_BITS: u32 = 10;
    const READ_FLAG: u16 = 1 << 15;
}

/// Register read/write seam used by the command surface
pub trait RegisterAccess {
    /// Read a register from the chip
    fn read_register(&mut self, index: u8) -> Result<u16>;

    /// Write a register on the chip
    fn write_register(&mut self, index: u8, value: u16) -> Result<()>;
}

/// Synchronous register bus driver
///
/// Owns the SPI bus and the active-low chip select line. Every operation
/// blocks until its frame has been clocked out.
pub struct RegisterBus<SPI, CS, F = Max2837Frame> {
    spi: SPI,
    cs: CS,
    _format: PhantomData<F>,
}

impl<SPI, CS, F> RegisterBus<SPI, CS, F>
where
    SPI: SpiBus<u16>,
    CS: OutputPin,
    F: FrameFormat,
{
    /// Create a driver and park chip select deasserted
    pub fn new(spi: SPI, mut cs: CS) -> Result<Self> {
        cs.set_high().map_err(Error::pin)?;
        Ok(Self {
            spi,
            cs,
            _format: PhantomData,
        })
    }

    /// Number of registers on the chip
    #[must_use]
    pub const fn register_count(&self) -> usize {
        F::REGISTER_COUNT
    }

    /// Write `value` (masked to the data width) to register `index`
    pub fn write(&mut self, index: u8, value: u16) -> Result<()> {
        let frame = F::write_frame(Self::check_index(index)?, value);
        self.transaction(&mut [frame])?;
        trace!("xcvr reg {=u8} <- {=u16:#x}", index, value & F::DATA_MASK);
        Ok(())
    }

    /// Read register `index`
    pub fn read(&mut self, index: u8) -> Result<u16> {
        let mut frame = [F::read_frame(Self::check_index(index)?)];
        self.transaction(&mut frame)?;
        Ok(F::response_value(frame[0]))
    }

    /// Give the bus and chip select back
    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }

    fn check_index(index: u8) -> Result<u8> {
        if usize::from(index) < F::REGISTER_COUNT {
            Ok(index)
        } else {
            Err(Error::InvalidRegister(index))
        }
    }

    /// Clock one frame with chip select asserted
    ///
    /// Chip select is released even if the transfer failed.
    fn transaction(&mut self, frame: &mut [u16]) -> Result<()> {
        self.cs.set_low().map_err(Error::pin)?;
        let transfer = self
            .spi
            .transfer_in_place(frame)
            .and_then(|()| self.spi.flush());
        self.cs.set_high().map_err(Error::pin)?;
        transfer.map_err(Error::spi)
    }
}

impl<SPI, CS, F> RegisterAccess for RegisterBus<SPI, CS, F>
where
    SPI: SpiBus<u16>,
    CS: OutputPin,
    F: FrameFormat,
{
    fn read_register(&mut self, index: u8) -> Result<u16> {
        self.read(index)
    }

    fn write_register(&mut self, index: u8, value: u16) -> Result<()> {
        self.write(index, value)
    }
}
