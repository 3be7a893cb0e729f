//! Shared streaming state
//!
//! The transceiver mode, buffer offset and phase are read and written from
//! both the cooperative main loop and interrupt-context handlers (sample
//! clock ticks, transfer completions). Single fields are atomics; updates
//! that touch several fields run inside a critical section.
//!
//! `offset` is the position of the next byte the sample clock exchanges with
//! the shift register. Only the hardware side advances it. `phase` is the
//! half currently handed to the USB side.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering};

use super::buffer::{check_geometry, Half};
use crate::types::TransceiverMode;

/// Mode, offset, phase and bookkeeping shared between the main loop and
/// interrupt handlers
pub struct StreamState<const N: usize> {
    mode: AtomicU8,
    offset: AtomicUsize,
    phase: AtomicU8,
    /// Bumped on every mode change; completions carry the epoch they were
    /// scheduled in
    epoch: AtomicU32,
    start_requested: AtomicBool,
    awaiting_fill: AtomicBool,
    in_flight: [AtomicBool; 2],
    xruns: AtomicU32,
}

impl<const N: usize> StreamState<N> {
    const GEOMETRY: () = check_geometry(N);

    /// Half-buffer size in bytes
    pub const HALF: usize = N / 2;

    /// Idle state: mode OFF, offset 0, phase first half
    #[must_use]
    pub const fn new() -> Self {
        let () = Self::GEOMETRY;
        Self {
            mode: AtomicU8::new(TransceiverMode::Off.as_u8()),
            offset: AtomicUsize::new(0),
            phase: AtomicU8::new(Half::First as u8),
            epoch: AtomicU32::new(0),
            start_requested: AtomicBool::new(false),
            awaiting_fill: AtomicBool::new(false),
            in_flight: [AtomicBool::new(false), AtomicBool::new(false)],
            xruns: AtomicU32::new(0),
        }
    }

    /// Current transceiver mode
    #[must_use]
    pub fn mode(&self) -> TransceiverMode {
        TransceiverMode::from_u8(self.mode.load(Ordering::Acquire)).unwrap_or_default()
    }

    /// Buffer position of the next sample exchange
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset.load(Ordering::Acquire)
    }

    /// Half currently handed to the USB side
    #[must_use]
    pub fn phase(&self) -> Half {
        Half::from_index(self.phase.load(Ordering::Acquire))
    }

    /// Mode-change generation counter
    #[must_use]
    pub fn epoch(&self) -> u32 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Number of times the sample clock entered a half still owned by an
    /// unfinished transfer
    #[must_use]
    pub fn xrun_count(&self) -> u32 {
        self.xruns.load(Ordering::Relaxed)
    }

    /// Check whether a transmit start is waiting for its initial fill
    #[must_use]
    pub fn is_awaiting_fill(&self) -> bool {
        self.awaiting_fill.load(Ordering::Acquire)
    }

    /// Check whether a scheduled transfer on `half` has not completed yet
    #[must_use]
    pub fn is_in_flight(&self, half: Half) -> bool {
        self.in_flight[half.index()].load(Ordering::Acquire)
    }

    /// Publish a new mode
    ///
    /// Starts a new epoch, which invalidates every outstanding completion,
    /// and drops transfer bookkeeping from the previous mode. Returns the new
    /// epoch.
    pub fn enter_mode(&self, mode: TransceiverMode) -> u32 {
        critical_section::with(|_| {
            self.mode.store(mode.as_u8(), Ordering::Release);
            self.awaiting_fill.store(false, Ordering::Release);
            self.start_requested.store(false, Ordering::Release);
            for flag in &self.in_flight {
                flag.store(false, Ordering::Release);
            }
            self.epoch.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
        })
    }

    /// Set offset and phase together
    pub fn reset(&self, offset: usize, phase: Half) {
        debug_assert!(offset <= N);
        critical_section::with(|_| {
            self.offset.store(offset, Ordering::Release);
            self.phase.store(phase as u8, Ordering::Release);
        });
    }

    /// Hand `half` to the USB side
    pub fn set_phase(&self, half: Half) {
        self.phase.store(half as u8, Ordering::Release);
    }

    /// Move the hardware position, used by the transmit priming path
    pub fn set_offset(&self, offset: usize) {
        debug_assert!(offset <= N);
        self.offset.store(offset, Ordering::Release);
    }

    /// Advance the hardware position by `bytes`, wrapping at the buffer end
    ///
    /// Called from the sample clock interrupt. Returns the half entered if
    /// the advance crossed a half boundary. Entering a half that still has a
    /// transfer in flight counts as an under/overrun.
    pub fn advance(&self, bytes: usize) -> Option<Half> {
        critical_section::with(|_| {
            let old = self.offset.load(Ordering::Acquire);
            let new = (old + bytes) % N;
            self.offset.store(new, Ordering::Release);

            let from = Half::containing(old % N, N);
            let to = Half::containing(new, N);
            if from == to && bytes < Self::HALF {
                return None;
            }
            if self.in_flight[to.index()].load(Ordering::Acquire) {
                self.xruns.fetch_add(1, Ordering::Relaxed);
            }
            Some(to)
        })
    }

    /// Ask the main loop to run the streaming start sequence
    pub fn request_start(&self) {
        self.start_requested.store(true, Ordering::Release);
    }

    /// Consume a pending start request
    pub fn take_start_request(&self) -> bool {
        self.start_requested.swap(false, Ordering::AcqRel)
    }

    /// Mark the transmit initial fill as outstanding
    pub fn begin_fill(&self) {
        self.awaiting_fill.store(true, Ordering::Release);
    }

    /// Consume the outstanding initial fill, if any
    pub fn finish_fill(&self) -> bool {
        self.awaiting_fill.swap(false, Ordering::AcqRel)
    }

    /// Record a transfer scheduled on `half`
    pub fn mark_in_flight(&self, half: Half) {
        self.in_flight[half.index()].store(true, Ordering::Release);
    }

    /// Record a transfer on `half` completed
    pub fn mark_complete(&self, half: Half) {
        self.in_flight[half.index()].store(false, Ordering::Release);
    }
}

impl<const N: usize> Default for StreamState<N> {
    fn default() -> Self {
        Self::new()
    }
}
