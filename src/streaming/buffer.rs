//! Double-buffered sample storage
//!
//! One contiguous byte region split into exactly two equal halves. Whichever
//! side (USB transfer or sample clock) currently owns a half is the only one
//! touching it.

use core::ops::Range;

use crate::config::{SAMPLE_WORD_BYTES, SAMPLE_WORD_REGS};

/// One exchange with the shift register: eight 32-bit lanes
pub type SampleWord = [u32; SAMPLE_WORD_REGS];

/// One of the two buffer halves
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Half {
    /// Bytes `0..N/2`
    First = 0,
    /// Bytes `N/2..N`
    Second = 1,
}

impl Half {
    /// Index 0/1
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Decode an index (anything non-zero is the second half)
    #[must_use]
    pub const fn from_index(index: u8) -> Self {
        if index == 0 {
            Self::First
        } else {
            Self::Second
        }
    }

    /// The other half
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    /// Half containing byte `offset` of an `capacity`-byte buffer
    #[must_use]
    pub const fn containing(offset: usize, capacity: usize) -> Self {
        if offset < capacity / 2 {
            Self::First
        } else {
            Self::Second
        }
    }

    /// Byte range of this half in an `capacity`-byte buffer
    #[must_use]
    pub const fn range(self, capacity: usize) -> Range<usize> {
        let half = capacity / 2;
        match self {
            Self::First => 0..half,
            Self::Second => half..capacity,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Half {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "half{=usize}", self.index());
    }
}

/// Check buffer geometry at compile time
///
/// Two equal, non-empty halves made of whole sample words.
pub(crate) const fn check_geometry(capacity: usize) {
    assert!(capacity > 0, "stream buffer must not be empty");
    assert!(
        capacity % (2 * SAMPLE_WORD_BYTES) == 0,
        "stream buffer must split into two halves of whole sample words"
    );
}

/// Fixed-capacity streaming buffer
pub struct StreamBuffer<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> StreamBuffer<N> {
    const GEOMETRY: () = check_geometry(N);

    /// Total capacity in bytes
    pub const CAPACITY: usize = N;

    /// Size of one half in bytes
    pub const HALF: usize = N / 2;

    /// Zero-filled buffer
    #[must_use]
    pub const fn new() -> Self {
        let () = Self::GEOMETRY;
        Self { bytes: [0; N] }
    }

    /// Bytes of one half
    #[must_use]
    pub fn half(&self, half: Half) -> &[u8] {
        &self.bytes[half.range(N)]
    }

    /// Mutable bytes of one half
    pub fn half_mut(&mut self, half: Half) -> &mut [u8] {
        &mut self.bytes[half.range(N)]
    }

    /// Whole buffer
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whole buffer, mutable
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Sample word starting at `offset` (little-endian lanes)
    ///
    /// `offset` wraps at the buffer end and is rounded down to a word
    /// boundary.
    #[must_use]
    pub fn sample_word(&self, offset: usize) -> SampleWord {
        let start = (offset % N) / SAMPLE_WORD_BYTES * SAMPLE_WORD_BYTES;
        let mut word = [0u32; SAMPLE_WORD_REGS];
        for (lane, chunk) in word
            .iter_mut()
            .zip(self.bytes[start..start + SAMPLE_WORD_BYTES].chunks_exact(4))
        {
            *lane = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        word
    }

    /// Store a sample word at `offset` (little-endian lanes)
    pub fn store_sample_word(&mut self, offset: usize, word: &SampleWord) {
        let start = (offset % N) / SAMPLE_WORD_BYTES * SAMPLE_WORD_BYTES;
        for (lane, chunk) in word
            .iter()
            .zip(self.bytes[start..start + SAMPLE_WORD_BYTES].chunks_exact_mut(4))
        {
            chunk.copy_from_slice(&lane.to_le_bytes());
        }
    }
}

impl<const N: usize> Default for StreamBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
