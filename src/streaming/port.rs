//! Hardware sample port
//!
//! The shift register that exchanges one sample word per clock tick. The
//! transmit start path writes the first words straight into it from
//! interrupt context, and every clock strobe moves one more word, so all
//! operations are a fixed number of register accesses with no allocation
//! and no failure path.

use super::buffer::{Half, SampleWord, StreamBuffer};
use super::state::StreamState;
use crate::config::SAMPLE_WORD_BYTES;
use crate::types::TransceiverMode;

/// Direct access to the sample shift register
pub trait SamplePort {
    /// Discard whatever the shift register holds
    fn clear(&mut self);

    /// Load one sample word so it goes out on the next clock tick
    fn prime(&mut self, word: &SampleWord);

    /// Take the sample word the last clock tick shifted in
    fn capture(&mut self) -> SampleWord;
}

/// Move one sample word between the port and the buffer at the current
/// offset, then advance past it
///
/// Runs once per sample clock strobe. Receive stores the captured word,
/// transmit loads the word the host filled in. Does nothing while OFF or
/// while a transmit start still waits for its initial fill. Returns the
/// half entered if the advance crossed a half boundary.
pub fn exchange_sample_word<P, const N: usize>(
    port: &mut P,
    state: &StreamState<N>,
    buffer: &mut StreamBuffer<N>,
) -> Option<Half>
where
    P: SamplePort + ?Sized,
{
    let offset = state.offset();
    match state.mode() {
        TransceiverMode::Off => return None,
        TransceiverMode::Receive => {
            let word = port.capture();
            buffer.store_sample_word(offset, &word);
        }
        TransceiverMode::Transmit => {
            if state.is_awaiting_fill() {
                return None;
            }
            port.prime(&buffer.sample_word(offset));
        }
    }
    state.advance(SAMPLE_WORD_BYTES)
}
