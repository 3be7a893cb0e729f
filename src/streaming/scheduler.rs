//! Streaming Buffer Scheduler
//!
//! Keeps USB bulk transfers and the sample clock working on opposite halves
//! of the stream buffer. The hardware side advances `offset`; the main loop
//! watches it and hands the half the hardware just left to the USB side.
//!
//! ```text
//!              offset (hardware)
//!                    │
//!  ┌─────────────────▼──┬────────────────────┐
//!  │ half 0  clock owns │ half 1  USB owns   │   phase = 1
//!  └────────────────────┴────────────────────┘
//!
//!  offset crosses into half 1  ──►  schedule half 0, phase = 0
//!  offset wraps into half 0    ──►  schedule half 1, phase = 1
//! ```
//!
//! Receive starts with the offset just short of the boundary, so the first
//! half drained is mostly pipeline fill. Transmit starts with one full-half
//! fill from the host; its completion primes the shift register and starts
//! the clock.

use super::buffer::{Half, StreamBuffer};
use super::clock::SampleClock;
use super::port::SamplePort;
use super::state::StreamState;
use super::transfer::{BulkEndpoint, CompletionKind, CompletionToken, TransferDescriptor};
use crate::config::{RX_PRIME_MARGIN, SAMPLE_WORD_BYTES, TX_PRIME_WORDS};
use crate::error::Result;
use crate::types::{Direction, TransceiverMode};

/// What a completion did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// Token from an earlier mode, or a fill nobody waits for; ignored
    Stale,
    /// Steady-state transfer finished, the half is free again
    Block(Half),
    /// Initial fill landed, port primed and clock started
    Primed,
    /// Transfer failed; the half is free again but its bytes never moved
    Dropped(Half),
}

#[cfg(feature = "embedded")]
impl defmt::Format for Completion {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Stale => defmt::write!(f, "stale"),
            Self::Block(half) => defmt::write!(f, "block {}", half),
            Self::Primed => defmt::write!(f, "primed"),
            Self::Dropped(half) => defmt::write!(f, "dropped {}", half),
        }
    }
}

/// Double-buffer scheduler over shared stream state
pub struct Scheduler<'s, const N: usize> {
    state: &'s StreamState<N>,
}

impl<'s, const N: usize> Scheduler<'s, N> {
    /// Half-buffer size in bytes
    pub const HALF: usize = N / 2;

    /// Scheduler working on `state`
    #[must_use]
    pub const fn new(state: &'s StreamState<N>) -> Self {
        Self { state }
    }

    /// Shared state this scheduler drives
    #[must_use]
    pub const fn state(&self) -> &'s StreamState<N> {
        self.state
    }

    /// Run the entry sequence for the current mode
    ///
    /// # Panics
    ///
    /// If the transceiver is OFF.
    pub fn start<E, C, P>(&mut self, endpoint: &mut E, clock: &mut C, port: &mut P) -> Result<()>
    where
        E: BulkEndpoint,
        C: SampleClock,
        P: SamplePort,
    {
        match self.state.mode() {
            TransceiverMode::Off => panic!("stream start while transceiver is OFF"),
            TransceiverMode::Receive => {
                port.clear();
                self.state
                    .reset(Self::HALF - RX_PRIME_MARGIN, Half::Second);
                clock.enable()?;
                info!("stream: rx started");
            }
            TransceiverMode::Transmit => {
                self.state.reset(Self::HALF, Half::First);
                self.state.begin_fill();
                self.schedule(endpoint, Half::First, CompletionKind::InitialFill)?;
                info!("stream: tx waiting for initial fill");
            }
        }
        Ok(())
    }

    /// One non-blocking scheduling step
    ///
    /// Returns the half scheduled, if any. A failed schedule leaves the
    /// phase unchanged so the next poll retries the same half.
    ///
    /// # Panics
    ///
    /// If the transceiver is OFF.
    pub fn poll<E: BulkEndpoint>(&mut self, endpoint: &mut E) -> Result<Option<Half>> {
        assert!(
            self.state.mode().is_streaming(),
            "stream poll while transceiver is OFF"
        );
        let offset = self.state.offset();
        let next = match self.state.phase() {
            Half::Second if offset >= Self::HALF => Half::First,
            Half::First if offset < Self::HALF => Half::Second,
            _ => return Ok(None),
        };
        self.schedule(endpoint, next, CompletionKind::Block)?;
        self.state.set_phase(next);
        Ok(Some(next))
    }

    /// Completion entry point; may run in interrupt context
    ///
    /// Only bookkeeping, offset reset, port priming and clock enable happen
    /// here.
    pub fn on_transfer_complete<C, P>(
        &mut self,
        token: CompletionToken,
        buffer: &StreamBuffer<N>,
        clock: &mut C,
        port: &mut P,
    ) -> Result<Completion>
    where
        C: SampleClock,
        P: SamplePort,
    {
        if token.epoch() != self.state.epoch() || !self.state.mode().is_streaming() {
            trace!("stream: stale completion for {}", token.half());
            return Ok(Completion::Stale);
        }
        self.state.mark_complete(token.half());

        match token.kind() {
            CompletionKind::Block => Ok(Completion::Block(token.half())),
            CompletionKind::InitialFill => {
                if !self.state.finish_fill() {
                    return Ok(Completion::Stale);
                }
                self.state.set_offset(0);
                for _ in 0..TX_PRIME_WORDS {
                    let offset = self.state.offset();
                    port.prime(&buffer.sample_word(offset));
                    self.state.set_offset(offset + SAMPLE_WORD_BYTES);
                }
                clock.enable()?;
                info!("stream: tx primed");
                Ok(Completion::Primed)
            }
        }
    }

    /// A transfer ended without moving its bytes
    ///
    /// Releases the half. A lost initial fill asks for the entry sequence
    /// again, which schedules a fresh fill.
    pub fn on_transfer_failed(&mut self, token: CompletionToken) -> Completion {
        if token.epoch() != self.state.epoch() || !self.state.mode().is_streaming() {
            return Completion::Stale;
        }
        self.state.mark_complete(token.half());
        if token.kind() == CompletionKind::InitialFill && self.state.finish_fill() {
            self.state.request_start();
        }
        warn!("stream: transfer on {} dropped", token.half());
        Completion::Dropped(token.half())
    }

    fn schedule<E: BulkEndpoint>(
        &mut self,
        endpoint: &mut E,
        half: Half,
        kind: CompletionKind,
    ) -> Result<()> {
        let direction = self.direction();
        endpoint.schedule(TransferDescriptor {
            direction,
            half,
            range: half.range(N),
            completion: CompletionToken::new(kind, half, self.state.epoch()),
        })?;
        self.state.mark_in_flight(half);
        trace!("stream: scheduled {} {}", direction, half);
        Ok(())
    }

    fn direction(&self) -> Direction {
        match self.state.mode().direction() {
            Some(direction) => direction,
            None => panic!("stream transfer while transceiver is OFF"),
        }
    }
}
