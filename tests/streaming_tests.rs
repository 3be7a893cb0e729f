//! Tests for the streaming buffer scheduler
//!
//! Drives the scheduler the way the firmware does: the main loop polls,
//! the "hardware" advances the offset, the "USB side" pops transfers and
//! hands their completions back.

mod common;

use sdr_usb_firmware::config::{
    RX_PRIME_MARGIN, SAMPLE_WORD_BYTES, STREAM_BUFFER_SIZE, STREAM_HALF_SIZE,
};
use sdr_usb_firmware::error::Error;
use sdr_usb_firmware::streaming::buffer::{Half, StreamBuffer};
use sdr_usb_firmware::streaming::port::exchange_sample_word;
use sdr_usb_firmware::streaming::scheduler::{Completion, Scheduler};
use sdr_usb_firmware::streaming::state::StreamState;
use sdr_usb_firmware::streaming::transfer::{BulkEndpoint, CompletionKind, TransferQueue};
use sdr_usb_firmware::types::{Direction, TransceiverMode};

use common::{RecordingClock, RecordingPort};

const N: usize = STREAM_BUFFER_SIZE;
const HALF: usize = STREAM_HALF_SIZE;

type Queue = TransferQueue<4>;

struct Rig {
    queue: Queue,
    clock: RecordingClock,
    port: RecordingPort,
    buffer: Box<StreamBuffer<N>>,
}

impl Rig {
    fn new() -> Self {
        Self {
            queue: Queue::new(),
            clock: RecordingClock::default(),
            port: RecordingPort::default(),
            buffer: Box::new(StreamBuffer::new()),
        }
    }

    fn start(&mut self, scheduler: &mut Scheduler<'_, N>) {
        scheduler
            .start(&mut self.queue, &mut self.clock, &mut self.port)
            .unwrap();
    }

    /// Pop the oldest transfer and complete it
    fn complete_next(&mut self, scheduler: &mut Scheduler<'_, N>) -> Completion {
        let transfer = self.queue.pop().expect("a transfer is queued");
        scheduler
            .on_transfer_complete(
                transfer.completion,
                &self.buffer,
                &mut self.clock,
                &mut self.port,
            )
            .unwrap()
    }
}

/// Advance one sample word at a time, polling after each tick and completing
/// transfers immediately; returns the halves scheduled
fn run_ticks(
    scheduler: &mut Scheduler<'_, N>,
    rig: &mut Rig,
    state: &StreamState<N>,
    ticks: usize,
) -> Vec<Half> {
    let mut scheduled = Vec::new();
    for _ in 0..ticks {
        state.advance(SAMPLE_WORD_BYTES);
        if let Some(half) = scheduler.poll(&mut rig.queue).unwrap() {
            scheduled.push(half);
            rig.complete_next(scheduler);
        }
    }
    scheduled
}

// ============================================================================
// Receive Tests
// ============================================================================

#[test]
fn receive_entry_sets_start_pair() {
    let state = StreamState::<N>::new();
    let mut scheduler = Scheduler::new(&state);
    let mut rig = Rig::new();

    state.enter_mode(TransceiverMode::Receive);
    rig.start(&mut scheduler);

    assert_eq!(state.offset(), HALF - RX_PRIME_MARGIN);
    assert_eq!(state.phase(), Half::Second);
    assert!(rig.clock.enabled);
    assert_eq!(rig.port.clears, 1);
    assert!(rig.queue.is_empty());
}

#[test]
fn receive_crossing_schedules_half_zero_once() {
    let state = StreamState::<N>::new();
    let mut scheduler = Scheduler::new(&state);
    let mut rig = Rig::new();
    state.enter_mode(TransceiverMode::Receive);
    rig.start(&mut scheduler);

    // still short of the boundary: nothing to do
    assert_eq!(scheduler.poll(&mut rig.queue), Ok(None));
    state.advance(SAMPLE_WORD_BYTES);
    assert_eq!(scheduler.poll(&mut rig.queue), Ok(None));

    // second tick reaches the boundary
    assert_eq!(state.advance(SAMPLE_WORD_BYTES), Some(Half::Second));
    assert_eq!(scheduler.poll(&mut rig.queue), Ok(Some(Half::First)));
    assert_eq!(state.phase(), Half::First);

    assert_eq!(rig.queue.len(), 1);
    let transfer = rig.queue.peek().unwrap();
    assert_eq!(transfer.direction, Direction::DeviceToHost);
    assert_eq!(transfer.half, Half::First);
    assert_eq!(transfer.range, 0..HALF);
    assert_eq!(transfer.completion.kind(), CompletionKind::Block);

    // more ticks inside half 1 schedule nothing further
    state.advance(SAMPLE_WORD_BYTES * 10);
    assert_eq!(scheduler.poll(&mut rig.queue), Ok(None));
    assert_eq!(rig.queue.len(), 1);
}

#[test]
fn receive_wrap_schedules_half_one() {
    let state = StreamState::<N>::new();
    let mut scheduler = Scheduler::new(&state);
    let mut rig = Rig::new();
    state.enter_mode(TransceiverMode::Receive);
    rig.start(&mut scheduler);

    state.advance(RX_PRIME_MARGIN);
    assert_eq!(scheduler.poll(&mut rig.queue), Ok(Some(Half::First)));
    assert_eq!(rig.complete_next(&mut scheduler), Completion::Block(Half::First));

    assert_eq!(state.advance(HALF), Some(Half::First));
    assert_eq!(state.offset(), 0);
    assert_eq!(scheduler.poll(&mut rig.queue), Ok(Some(Half::Second)));
    let transfer = rig.queue.peek().unwrap();
    assert_eq!(transfer.range, HALF..N);
    assert_eq!(state.phase(), Half::Second);
}

#[test]
fn halves_alternate_over_many_laps() {
    let state = StreamState::<N>::new();
    let mut scheduler = Scheduler::new(&state);
    let mut rig = Rig::new();
    state.enter_mode(TransceiverMode::Receive);
    rig.start(&mut scheduler);

    let words_per_half = HALF / SAMPLE_WORD_BYTES;
    let scheduled = run_ticks(&mut scheduler, &mut rig, &state, 2 + 6 * words_per_half);

    assert_eq!(scheduled.len(), 7);
    for pair in scheduled.windows(2) {
        assert_ne!(pair[0], pair[1], "same half scheduled twice in a row");
    }
    assert_eq!(scheduled[0], Half::First);
    assert_eq!(state.xrun_count(), 0);
}

#[test]
fn never_two_transfers_for_the_same_half_in_flight() {
    let state = StreamState::<N>::new();
    let mut scheduler = Scheduler::new(&state);
    let mut rig = Rig::new();
    state.enter_mode(TransceiverMode::Receive);
    rig.start(&mut scheduler);

    // poll on every tick for a full lap without completing anything
    for _ in 0..(N / SAMPLE_WORD_BYTES) {
        state.advance(SAMPLE_WORD_BYTES);
        scheduler.poll(&mut rig.queue).unwrap();
        let first = rig.queue.iter().filter(|t| t.half == Half::First).count();
        let second = rig.queue.iter().filter(|t| t.half == Half::Second).count();
        assert!(first <= 1 && second <= 1);
    }
    assert_eq!(rig.queue.len(), 2);
}

// ============================================================================
// Transmit Tests
// ============================================================================

#[test]
fn transmit_entry_requests_initial_fill() {
    let state = StreamState::<N>::new();
    let mut scheduler = Scheduler::new(&state);
    let mut rig = Rig::new();

    state.enter_mode(TransceiverMode::Transmit);
    rig.start(&mut scheduler);

    assert_eq!(state.offset(), HALF);
    assert_eq!(state.phase(), Half::First);
    assert!(state.is_awaiting_fill());
    assert!(!rig.clock.enabled);

    assert_eq!(rig.queue.len(), 1);
    let transfer = rig.queue.peek().unwrap();
    assert_eq!(transfer.direction, Direction::HostToDevice);
    assert_eq!(transfer.half, Half::First);
    assert_eq!(transfer.len(), HALF);
    assert_eq!(transfer.completion.kind(), CompletionKind::InitialFill);
}

#[test]
fn transmit_clock_stays_off_until_fill_completes() {
    let state = StreamState::<N>::new();
    let mut scheduler = Scheduler::new(&state);
    let mut rig = Rig::new();
    state.enter_mode(TransceiverMode::Transmit);
    rig.start(&mut scheduler);

    for _ in 0..100 {
        assert_eq!(scheduler.poll(&mut rig.queue), Ok(None));
    }
    assert_eq!(rig.clock.enables, 0);
    assert!(rig.port.primed.is_empty());
    assert_eq!(rig.queue.len(), 1);
}

#[test]
fn transmit_fill_primes_port_and_starts_clock() {
    let state = StreamState::<N>::new();
    let mut scheduler = Scheduler::new(&state);
    let mut rig = Rig::new();
    state.enter_mode(TransceiverMode::Transmit);
    rig.start(&mut scheduler);

    // the host fills half 0
    let first = [1, 2, 3, 4, 5, 6, 7, 8];
    let second = [11, 12, 13, 14, 15, 16, 17, 18];
    rig.buffer.store_sample_word(0, &first);
    rig.buffer.store_sample_word(SAMPLE_WORD_BYTES, &second);

    assert_eq!(rig.complete_next(&mut scheduler), Completion::Primed);
    assert_eq!(rig.port.primed, vec![first, second]);
    assert!(rig.clock.enabled);
    assert!(!state.is_awaiting_fill());
    // restarted at 0, then moved past the two primed words
    assert_eq!(state.offset(), 2 * SAMPLE_WORD_BYTES);

    // the clock now plays half 0, so half 1 is fetched next
    assert_eq!(scheduler.poll(&mut rig.queue), Ok(Some(Half::Second)));
    let transfer = rig.queue.peek().unwrap();
    assert_eq!(transfer.direction, Direction::HostToDevice);
    assert_eq!(transfer.completion.kind(), CompletionKind::Block);
}

#[test]
fn transmit_steady_state_alternates() {
    let state = StreamState::<N>::new();
    let mut scheduler = Scheduler::new(&state);
    let mut rig = Rig::new();
    state.enter_mode(TransceiverMode::Transmit);
    rig.start(&mut scheduler);
    rig.complete_next(&mut scheduler);

    assert_eq!(scheduler.poll(&mut rig.queue), Ok(Some(Half::Second)));
    rig.complete_next(&mut scheduler);

    let words_per_half = HALF / SAMPLE_WORD_BYTES;
    let scheduled = run_ticks(&mut scheduler, &mut rig, &state, 4 * words_per_half);
    assert_eq!(
        scheduled,
        vec![Half::First, Half::Second, Half::First, Half::Second]
    );
    assert_eq!(state.xrun_count(), 0);
}

// ============================================================================
// Completion and Cancellation Tests
// ============================================================================

#[test]
fn completion_from_previous_mode_is_ignored() {
    let state = StreamState::<N>::new();
    let mut scheduler = Scheduler::new(&state);
    let mut rig = Rig::new();
    state.enter_mode(TransceiverMode::Transmit);
    rig.start(&mut scheduler);
    let fill = rig.queue.pop().unwrap();

    // mode changes while the fill is in flight
    state.enter_mode(TransceiverMode::Off);
    state.reset(0, Half::First);

    let outcome = scheduler
        .on_transfer_complete(fill.completion, &rig.buffer, &mut rig.clock, &mut rig.port)
        .unwrap();
    assert_eq!(outcome, Completion::Stale);
    assert!(!rig.clock.enabled);
    assert!(rig.port.primed.is_empty());
    assert_eq!(state.offset(), 0);
}

#[test]
fn completion_from_previous_stream_of_same_mode_is_ignored() {
    let state = StreamState::<N>::new();
    let mut scheduler = Scheduler::new(&state);
    let mut rig = Rig::new();
    state.enter_mode(TransceiverMode::Transmit);
    rig.start(&mut scheduler);
    let old_fill = rig.queue.pop().unwrap();

    // TX -> OFF -> TX before the first fill landed
    state.enter_mode(TransceiverMode::Off);
    state.enter_mode(TransceiverMode::Transmit);
    rig.start(&mut scheduler);

    let outcome = scheduler
        .on_transfer_complete(old_fill.completion, &rig.buffer, &mut rig.clock, &mut rig.port)
        .unwrap();
    assert_eq!(outcome, Completion::Stale);
    assert!(!rig.clock.enabled);
    assert!(state.is_awaiting_fill());

    // the fill of the current stream still works
    assert_eq!(rig.complete_next(&mut scheduler), Completion::Primed);
    assert!(rig.clock.enabled);
}

#[test]
fn full_queue_leaves_phase_for_retry() {
    let state = StreamState::<N>::new();
    let mut scheduler = Scheduler::new(&state);
    let mut queue = TransferQueue::<1>::new();
    let mut clock = RecordingClock::default();
    let mut port = RecordingPort::default();
    state.enter_mode(TransceiverMode::Receive);
    scheduler.start(&mut queue, &mut clock, &mut port).unwrap();

    state.advance(RX_PRIME_MARGIN);
    assert_eq!(scheduler.poll(&mut queue), Ok(Some(Half::First)));
    state.advance(HALF);

    // the USB side has not taken the previous transfer yet
    assert_eq!(scheduler.poll(&mut queue), Err(Error::TransferQueueFull));
    assert_eq!(state.phase(), Half::First);

    queue.pop();
    assert_eq!(scheduler.poll(&mut queue), Ok(Some(Half::Second)));
}

#[test]
fn cancel_drops_queued_transfers() {
    let state = StreamState::<N>::new();
    let mut scheduler = Scheduler::new(&state);
    let mut rig = Rig::new();
    state.enter_mode(TransceiverMode::Transmit);
    rig.start(&mut scheduler);
    rig.queue.cancel_all();
    assert!(rig.queue.is_empty());
}

#[test]
fn failed_block_releases_its_half() {
    let state = StreamState::<N>::new();
    let mut scheduler = Scheduler::new(&state);
    let mut rig = Rig::new();
    state.enter_mode(TransceiverMode::Receive);
    rig.start(&mut scheduler);

    state.advance(RX_PRIME_MARGIN);
    assert_eq!(scheduler.poll(&mut rig.queue), Ok(Some(Half::First)));
    let drain = rig.queue.pop().unwrap();

    assert_eq!(
        scheduler.on_transfer_failed(drain.completion),
        Completion::Dropped(Half::First)
    );
    assert!(!state.is_in_flight(Half::First));

    // lapping back into half 0 is not an xrun any more
    state.advance(HALF);
    assert_eq!(state.xrun_count(), 0);
    assert_eq!(scheduler.poll(&mut rig.queue), Ok(Some(Half::Second)));
}

#[test]
fn failed_transfer_from_previous_mode_is_ignored() {
    let state = StreamState::<N>::new();
    let mut scheduler = Scheduler::new(&state);
    let mut rig = Rig::new();
    state.enter_mode(TransceiverMode::Transmit);
    rig.start(&mut scheduler);
    let fill = rig.queue.pop().unwrap();

    state.enter_mode(TransceiverMode::Transmit);
    rig.start(&mut scheduler);
    assert_eq!(scheduler.on_transfer_failed(fill.completion), Completion::Stale);
    assert!(state.is_awaiting_fill());
    assert!(state.is_in_flight(Half::First));
}

// ============================================================================
// Sample Exchange Tests
// ============================================================================

#[test]
fn receive_strobes_store_captured_words() {
    let state = StreamState::<N>::new();
    let mut scheduler = Scheduler::new(&state);
    let mut rig = Rig::new();
    state.enter_mode(TransceiverMode::Receive);
    rig.start(&mut scheduler);

    let first = [0x11; 8];
    let second = [0x22; 8];
    rig.port.incoming.extend([first, second]);

    assert_eq!(
        exchange_sample_word(&mut rig.port, &state, &mut *rig.buffer),
        None
    );
    assert_eq!(
        exchange_sample_word(&mut rig.port, &state, &mut *rig.buffer),
        Some(Half::Second)
    );

    assert_eq!(rig.port.captures, 2);
    assert_eq!(rig.buffer.sample_word(HALF - RX_PRIME_MARGIN), first);
    assert_eq!(rig.buffer.sample_word(HALF - SAMPLE_WORD_BYTES), second);
    assert_eq!(state.offset(), HALF);
    assert!(rig.port.primed.is_empty());

    // the drained half is the one the words landed in
    assert_eq!(scheduler.poll(&mut rig.queue), Ok(Some(Half::First)));
}

#[test]
fn transmit_strobes_load_filled_words() {
    let state = StreamState::<N>::new();
    let mut scheduler = Scheduler::new(&state);
    let mut rig = Rig::new();
    state.enter_mode(TransceiverMode::Transmit);
    rig.start(&mut scheduler);

    let words: Vec<[u32; 8]> = (0..4u32).map(|i| [i + 1; 8]).collect();
    for (i, word) in words.iter().enumerate() {
        rig.buffer.store_sample_word(i * SAMPLE_WORD_BYTES, word);
    }
    assert_eq!(rig.complete_next(&mut scheduler), Completion::Primed);

    exchange_sample_word(&mut rig.port, &state, &mut *rig.buffer);
    exchange_sample_word(&mut rig.port, &state, &mut *rig.buffer);

    // two primed by the fill, then one per strobe
    assert_eq!(rig.port.primed, words);
    assert_eq!(state.offset(), 4 * SAMPLE_WORD_BYTES);
    assert_eq!(rig.port.captures, 0);
}

#[test]
fn strobes_are_ignored_while_off_or_waiting_for_fill() {
    let state = StreamState::<N>::new();
    let mut scheduler = Scheduler::new(&state);
    let mut rig = Rig::new();

    assert_eq!(
        exchange_sample_word(&mut rig.port, &state, &mut *rig.buffer),
        None
    );
    assert_eq!(state.offset(), 0);
    assert_eq!(rig.port.captures, 0);

    state.enter_mode(TransceiverMode::Transmit);
    rig.start(&mut scheduler);
    assert_eq!(
        exchange_sample_word(&mut rig.port, &state, &mut *rig.buffer),
        None
    );
    assert_eq!(state.offset(), HALF);
    assert!(rig.port.primed.is_empty());
}

// ============================================================================
// Under/overrun Counter Tests
// ============================================================================

#[test]
fn entering_an_in_flight_half_counts_an_xrun() {
    let state = StreamState::<N>::new();
    let mut scheduler = Scheduler::new(&state);
    let mut rig = Rig::new();
    state.enter_mode(TransceiverMode::Receive);
    rig.start(&mut scheduler);

    state.advance(RX_PRIME_MARGIN);
    assert_eq!(scheduler.poll(&mut rig.queue), Ok(Some(Half::First)));
    assert!(state.is_in_flight(Half::First));

    // the hardware laps back into half 0 before its drain completed
    state.advance(HALF);
    assert_eq!(state.xrun_count(), 1);

    // once it completes, the next lap is clean
    rig.complete_next(&mut scheduler);
    assert!(!state.is_in_flight(Half::First));
    assert_eq!(scheduler.poll(&mut rig.queue), Ok(Some(Half::Second)));
    rig.complete_next(&mut scheduler);
    state.advance(HALF);
    assert_eq!(state.xrun_count(), 1);
}

#[test]
fn mode_change_forgets_in_flight_halves() {
    let state = StreamState::<N>::new();
    state.enter_mode(TransceiverMode::Receive);
    state.mark_in_flight(Half::First);
    state.mark_in_flight(Half::Second);
    state.enter_mode(TransceiverMode::Off);
    assert!(!state.is_in_flight(Half::First));
    assert!(!state.is_in_flight(Half::Second));
}

// ============================================================================
// Contract Violation Tests
// ============================================================================

#[test]
#[should_panic(expected = "OFF")]
fn poll_while_off_panics() {
    let state = StreamState::<N>::new();
    let mut scheduler = Scheduler::new(&state);
    let mut queue = Queue::new();
    let _ = scheduler.poll(&mut queue);
}

#[test]
#[should_panic(expected = "OFF")]
fn start_while_off_panics() {
    let state = StreamState::<N>::new();
    let mut scheduler = Scheduler::new(&state);
    let mut rig = Rig::new();
    rig.start(&mut scheduler);
}
