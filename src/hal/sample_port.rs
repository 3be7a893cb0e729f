//! Memory-mapped sample port
//!
//! The shift register logic is reached through plain 32-bit registers on the
//! external memory bus. Every operation is a fixed handful of volatile
//! accesses, so it is safe to call from a completion interrupt or on every
//! clock strobe. Captures read the shadow registers through the same lane
//! map that loads write them with.

#![allow(unsafe_code)]

use crate::config::sample_port::{
    BASE, SHADOW_OFFSET, SLOT_MAP, STATUS_CLEAR_MASK, STATUS_CLEAR_OFFSET,
};
use crate::config::SAMPLE_WORD_REGS;
use crate::streaming::buffer::SampleWord;
use crate::streaming::port::SamplePort;

/// Sample port at a fixed MMIO address
pub struct MmioSamplePort {
    base: usize,
    slots: [usize; SAMPLE_WORD_REGS],
}

impl MmioSamplePort {
    /// Port at the board's address with the board's lane wiring
    ///
    /// # Safety
    ///
    /// The caller must own the shift register registers at
    /// [`BASE`](crate::config::sample_port::BASE); nothing else may write
    /// them while this value exists.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self {
            base: BASE,
            slots: SLOT_MAP,
        }
    }

    fn read(&self, offset: usize) -> u32 {
        let register = (self.base + offset) as *const u32;
        // SAFETY: as for `write`.
        unsafe { core::ptr::read_volatile(register) }
    }

    fn write(&mut self, offset: usize, value: u32) {
        let register = (self.base + offset) as *mut u32;
        // SAFETY: `new` hands out exclusive access to this register block and
        // every offset used here lies inside it.
        unsafe { core::ptr::write_volatile(register, value) };
    }
}

impl SamplePort for MmioSamplePort {
    fn clear(&mut self) {
        self.write(STATUS_CLEAR_OFFSET, STATUS_CLEAR_MASK);
    }

    fn prime(&mut self, word: &SampleWord) {
        self.clear();
        for (lane, slot) in word.iter().zip(self.slots) {
            self.write(SHADOW_OFFSET + slot * 4, *lane);
        }
    }

    fn capture(&mut self) -> SampleWord {
        self.clear();
        let mut word = [0; SAMPLE_WORD_REGS];
        for (lane, slot) in word.iter_mut().zip(self.slots) {
            *lane = self.read(SHADOW_OFFSET + slot * 4);
        }
        word
    }
}
