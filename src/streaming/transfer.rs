//! Bulk transfer scheduling seam
//!
//! The scheduler never touches the USB peripheral. It describes a transfer of
//! one buffer half and hands the description to a [`BulkEndpoint`]; whoever
//! moves the bytes gives the embedded [`CompletionToken`] back when done.

use core::ops::Range;

use heapless::Deque;

use super::buffer::Half;
use crate::error::{Error, Result};
use crate::types::Direction;

/// What a completion finishes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionKind {
    /// Initial host-to-device fill of half 0 before transmit starts
    InitialFill,
    /// Steady-state half transfer
    Block,
}

#[cfg(feature = "embedded")]
impl defmt::Format for CompletionKind {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::InitialFill => defmt::write!(f, "fill"),
            Self::Block => defmt::write!(f, "block"),
        }
    }
}

/// Single-shot completion handle
///
/// Not `Clone`: a transfer completes at most once. A token scheduled before
/// the last mode change carries an old epoch and is ignored.
#[derive(Debug, PartialEq, Eq)]
pub struct CompletionToken {
    kind: CompletionKind,
    half: Half,
    epoch: u32,
}

impl CompletionToken {
    pub(crate) const fn new(kind: CompletionKind, half: Half, epoch: u32) -> Self {
        Self { kind, half, epoch }
    }

    /// What this completion finishes
    #[must_use]
    pub const fn kind(&self) -> CompletionKind {
        self.kind
    }

    /// Buffer half the transfer covered
    #[must_use]
    pub const fn half(&self) -> Half {
        self.half
    }

    /// Mode epoch the transfer was scheduled in
    #[must_use]
    pub const fn epoch(&self) -> u32 {
        self.epoch
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for CompletionToken {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{} {} @{=u32}", self.kind, self.half, self.epoch);
    }
}

/// One scheduled bulk transfer of a buffer half
#[derive(Debug, PartialEq, Eq)]
pub struct TransferDescriptor {
    /// Which way the bytes go
    pub direction: Direction,
    /// Half being transferred
    pub half: Half,
    /// Byte range of the half inside the stream buffer
    pub range: Range<usize>,
    /// Handed back on completion
    pub completion: CompletionToken,
}

impl TransferDescriptor {
    /// Transfer length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Check for a zero-length transfer
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Something that can run bulk transfers over buffer halves
pub trait BulkEndpoint {
    /// Queue a transfer; must not block
    fn schedule(&mut self, transfer: TransferDescriptor) -> Result<()>;

    /// Drop every queued transfer without completing it
    fn cancel_all(&mut self);
}

/// Fixed-depth FIFO of pending transfers
///
/// The USB pump pops from the front and completes in order.
pub struct TransferQueue<const D: usize> {
    pending: Deque<TransferDescriptor, D>,
}

impl<const D: usize> TransferQueue<D> {
    /// Empty queue
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Deque::new(),
        }
    }

    /// Take the oldest transfer
    pub fn pop(&mut self) -> Option<TransferDescriptor> {
        self.pending.pop_front()
    }

    /// Look at the oldest transfer
    #[must_use]
    pub fn peek(&self) -> Option<&TransferDescriptor> {
        self.pending.front()
    }

    /// Number of queued transfers
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if nothing is queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queued transfers, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &TransferDescriptor> {
        self.pending.iter()
    }
}

impl<const D: usize> Default for TransferQueue<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const D: usize> BulkEndpoint for TransferQueue<D> {
    fn schedule(&mut self, transfer: TransferDescriptor) -> Result<()> {
        self.pending
            .push_back(transfer)
            .map_err(|_| Error::TransferQueueFull)
    }

    fn cancel_all(&mut self) {
        if !self.pending.is_empty() {
            debug!("usb: cancelled {=usize} transfers", self.pending.len());
        }
        self.pending.clear();
    }
}
