//! Write-caching register file
//!
//! Batches register changes and pushes only the changed ones to the chip.
//! The cache never answers reads; `CachedRegisterBus::read` always goes to
//! the bus.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use super::register_bus::{FrameFormat, Max2837Frame, RegisterAccess, RegisterBus};
use crate::error::{Error, Result};

/// Set of register indices (0..32)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirtySet(u32);

impl DirtySet {
    /// Largest number of indices the set can track
    pub const CAPACITY: usize = 32;

    /// Empty set
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Set containing `0..count`
    #[must_use]
    pub const fn first(count: usize) -> Self {
        if count >= Self::CAPACITY {
            Self(u32::MAX)
        } else {
            Self((1 << count) - 1)
        }
    }

    /// Add an index
    pub fn insert(&mut self, index: usize) {
        self.0 |= 1 << index;
    }

    /// Remove an index
    pub fn remove(&mut self, index: usize) {
        self.0 &= !(1 << index);
    }

    /// Check membership
    #[must_use]
    pub const fn contains(&self, index: usize) -> bool {
        index < Self::CAPACITY && self.0 & (1 << index) != 0
    }

    /// Number of members
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Check if empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Members in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> {
        let bits = self.0;
        (0..Self::CAPACITY).filter(move |&i| bits & (1 << i) != 0)
    }
}

/// Cached copy of a chip's registers with per-register dirty flags
#[derive(Clone, Debug)]
pub struct RegisterFile<const N: usize> {
    values: [u16; N],
    dirty: DirtySet,
}

impl<const N: usize> RegisterFile<N> {
    const FITS: () = assert!(N <= DirtySet::CAPACITY, "register file larger than dirty set");

    /// All registers zero and clean
    #[must_use]
    pub const fn new() -> Self {
        let () = Self::FITS;
        Self {
            values: [0; N],
            dirty: DirtySet::new(),
        }
    }

    /// Start from the chip's power-on defaults, all marked dirty
    ///
    /// The first flush then programs every register.
    #[must_use]
    pub const fn with_defaults(values: [u16; N]) -> Self {
        let () = Self::FITS;
        Self {
            values,
            dirty: DirtySet::first(N),
        }
    }

    /// Update the cached value, marking it dirty if it changed
    ///
    /// Returns whether the value changed.
    pub fn set(&mut self, index: usize, value: u16) -> Result<bool> {
        let slot = self.slot(index)?;
        if *slot == value {
            return Ok(false);
        }
        *slot = value;
        self.dirty.insert(index);
        Ok(true)
    }

    /// Cached value of a register
    #[must_use]
    pub fn cached(&self, index: usize) -> Option<u16> {
        self.values.get(index).copied()
    }

    /// Check if a register still has to be written to the chip
    #[must_use]
    pub const fn is_dirty(&self, index: usize) -> bool {
        self.dirty.contains(index)
    }

    /// Registers waiting to be written
    #[must_use]
    pub const fn dirty(&self) -> DirtySet {
        self.dirty
    }

    /// Record that a register reached the chip
    pub fn mark_clean(&mut self, index: usize) {
        if index < N {
            self.dirty.remove(index);
        }
    }

    fn slot(&mut self, index: usize) -> Result<&mut u16> {
        self.values
            .get_mut(index)
            .ok_or(Error::InvalidRegister(u8::try_from(index).unwrap_or(u8::MAX)))
    }
}

impl<const N: usize> Default for RegisterFile<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Register bus with a write-back cache in front
pub struct CachedRegisterBus<SPI, CS, const N: usize, F = Max2837Frame> {
    bus: RegisterBus<SPI, CS, F>,
    file: RegisterFile<N>,
}

impl<SPI, CS, const N: usize, F> CachedRegisterBus<SPI, CS, N, F>
where
    SPI: SpiBus<u16>,
    CS: OutputPin,
    F: FrameFormat,
{
    /// Put a cache in front of a bus
    #[must_use]
    pub fn new(bus: RegisterBus<SPI, CS, F>, file: RegisterFile<N>) -> Self {
        Self { bus, file }
    }

    /// Stage a register value; no bus traffic
    pub fn set(&mut self, index: u8, value: u16) -> Result<()> {
        self.file.set(usize::from(index), value & F::DATA_MASK)?;
        Ok(())
    }

    /// Write every dirty register in ascending index order
    ///
    /// A register's dirty flag is cleared only after its frame went out, so a
    /// failed flush leaves the rest queued. Returns the number written.
    pub fn flush(&mut self) -> Result<usize> {
        let pending = self.file.dirty();
        let mut written = 0;
        for index in pending.iter() {
            let value = self.file.cached(index).unwrap_or_default();
            // index < N <= 32, so it fits the bus index type
            self.bus.write(index as u8, value)?;
            self.file.mark_clean(index);
            written += 1;
        }
        if written > 0 {
            debug!("xcvr flushed {=usize} registers", written);
        }
        Ok(written)
    }

    /// Stage and immediately write one register
    pub fn write(&mut self, index: u8, value: u16) -> Result<()> {
        self.set(index, value)?;
        self.bus.write(index, value)?;
        self.file.mark_clean(usize::from(index));
        Ok(())
    }

    /// Read a register from the chip (never from the cache)
    pub fn read(&mut self, index: u8) -> Result<u16> {
        self.bus.read(index)
    }

    /// Borrow the cache
    #[must_use]
    pub const fn file(&self) -> &RegisterFile<N> {
        &self.file
    }

    /// Take the bus and cache apart
    pub fn release(self) -> (RegisterBus<SPI, CS, F>, RegisterFile<N>) {
        (self.bus, self.file)
    }
}

impl<SPI, CS, const N: usize, F> RegisterAccess for CachedRegisterBus<SPI, CS, N, F>
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
