//! System configuration and hardware constants
//!
//! This module defines compile-time constants for the SDR peripheral.
//! Buffer geometry, register bus limits, USB identity and the sample port
//! memory map are centralized here. Pin wiring lives next to the
//! peripheral setup in `main.rs`.

/// System clock frequency (STM32G474 @ 170MHz)
pub const SYSTEM_CLOCK_HZ: u32 = 170_000_000;

/// Total size of the USB bulk streaming buffer in bytes
pub const STREAM_BUFFER_SIZE: usize = 0x8000;

/// Size of one streaming half-buffer (one bulk transfer block)
pub const STREAM_HALF_SIZE: usize = STREAM_BUFFER_SIZE / 2;

/// Bytes moved per sample clock exchange with the shift register
///
/// One exchange is eight 32-bit slice registers.
pub const SAMPLE_WORD_BYTES: usize = 32;

/// 32-bit registers in one sample word
pub const SAMPLE_WORD_REGS: usize = SAMPLE_WORD_BYTES / 4;

/// Distance before the half boundary at which receive streaming starts
///
/// Two sample words: the first crossing happens almost immediately after the
/// clock is enabled.
pub const RX_PRIME_MARGIN: usize = 2 * SAMPLE_WORD_BYTES;

/// Sample words written straight into the port before transmit starts
///
/// The shift register output is double buffered, so two words must already
/// be latched when the clock is enabled.
pub const TX_PRIME_WORDS: usize = 2;

/// Outstanding bulk transfers the endpoint queue can hold
pub const TRANSFER_QUEUE_DEPTH: usize = 4;

/// Number of transceiver registers addressable over the register bus
pub const XCVR_NUM_REGS: usize = 32;

/// Exclusive upper bound for a transceiver register value (10-bit data)
pub const XCVR_REG_VALUE_LIMIT: u16 = 0x400;

/// Register bus SPI clock
pub const XCVR_SPI_FREQUENCY_HZ: u32 = 10_000_000;

/// USB VID (use test VID for development)
pub const USB_VID: u16 = 0x1209;

/// USB PID (get from pid.codes for production)
pub const USB_PID: u16 = 0x0002;

/// Bulk endpoint max packet size (full-speed device)
pub const USB_BULK_PACKET_SIZE: u16 = 64;

/// Memory map of the sample shift register port
pub mod sample_port {
    //! The shift register logic sits on the external memory bus.

    use super::SAMPLE_WORD_REGS;

    /// Base address of the slice data registers (FMC bank 1)
    pub const BASE: usize = 0x6000_0000;

    /// Shadow data registers the next clock tick shifts out, relative to
    /// `BASE`
    pub const SHADOW_OFFSET: usize = 0x100;

    /// Slice status clear register, relative to `BASE`
    pub const STATUS_CLEAR_OFFSET: usize = 0x200;

    /// Status bit of the slice that paces the port
    pub const STATUS_CLEAR_MASK: u32 = 1 << 0;

    /// Slice register receiving each 32-bit lane of a sample word
    ///
    /// Lane `i` of a sample word is written to slice `SLOT_MAP[i]`. This is
    /// board wiring taken from the shift register documentation; it is not
    /// a generic ordering.
    pub const SLOT_MAP: [usize; SAMPLE_WORD_REGS] = [11, 5, 10, 2, 9, 4, 8, 0];
}
