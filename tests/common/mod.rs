//! Host-side test doubles for the hardware seams
//!
//! Every double keeps its observable state behind `Rc<RefCell<_>>` so a test
//! can hand the double to the code under test and still inspect it.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{
    ErrorKind as PinErrorKind, ErrorType as DigitalErrorType, OutputPin, StatefulOutputPin,
};
use embedded_hal::spi::{ErrorKind, ErrorType as SpiErrorType, SpiBus};

use sdr_usb_firmware::drivers::register_bus::RegisterBus;
use sdr_usb_firmware::error::Result;
use sdr_usb_firmware::radio::frontend::FrontEnd;
use sdr_usb_firmware::streaming::buffer::SampleWord;
use sdr_usb_firmware::streaming::clock::SampleClock;
use sdr_usb_firmware::streaming::port::SamplePort;
use sdr_usb_firmware::types::ControlLines;

// ============================================================================
// Front-end control lines
// ============================================================================

/// Levels of the three control lines plus a snapshot after every edge
#[derive(Default)]
pub struct LineBoard {
    levels: [bool; 3],
    history: Vec<ControlLines>,
    /// Every write fails with this error while set
    fault: Option<PinErrorKind>,
}

impl LineBoard {
    fn lines(&self) -> ControlLines {
        ControlLines::new(self.levels[0], self.levels[1], self.levels[2])
    }
}

/// One control line on a shared board
pub struct MockPin {
    board: Rc<RefCell<LineBoard>>,
    line: usize,
}

impl DigitalErrorType for MockPin {
    type Error = PinErrorKind;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
        self.drive(true)
    }
}

impl StatefulOutputPin for MockPin {
    fn is_set_high(&mut self) -> core::result::Result<bool, Self::Error> {
        Ok(self.board.borrow().levels[self.line])
    }

    fn is_set_low(&mut self) -> core::result::Result<bool, Self::Error> {
        Ok(!self.board.borrow().levels[self.line])
    }
}

impl MockPin {
    fn drive(&mut self, level: bool) -> core::result::Result<(), PinErrorKind> {
        let mut board = self.board.borrow_mut();
        if let Some(kind) = board.fault {
            return Err(kind);
        }
        if board.levels[self.line] != level {
            board.levels[self.line] = level;
            let snapshot = board.lines();
            board.history.push(snapshot);
        }
        Ok(())
    }
}

/// Handle on the board for assertions and for driving lines from "outside"
#[derive(Clone)]
pub struct Lines(Rc<RefCell<LineBoard>>);

impl Lines {
    /// Current levels
    pub fn now(&self) -> ControlLines {
        self.0.borrow().lines()
    }

    /// Every intermediate line state since the last `clear_history`
    pub fn history(&self) -> Vec<ControlLines> {
        self.0.borrow().history.clone()
    }

    pub fn clear_history(&self) {
        self.0.borrow_mut().history.clear();
    }

    /// Make every pin write fail with `kind` until cleared with `None`
    pub fn fail_writes(&self, kind: Option<PinErrorKind>) {
        self.0.borrow_mut().fault = kind;
    }

    /// Force the levels without going through the front-end
    pub fn force(&self, enable: bool, tx_enable: bool, rx_enable: bool) {
        self.0.borrow_mut().levels = [enable, tx_enable, rx_enable];
    }
}

/// Three pins (enable, tx, rx) on one board, all low
pub fn control_lines() -> (MockPin, MockPin, MockPin, Lines) {
    let board = Rc::new(RefCell::new(LineBoard::default()));
    let pin = |line| MockPin {
        board: Rc::clone(&board),
        line,
    };
    (pin(0), pin(1), pin(2), Lines(Rc::clone(&board)))
}

/// Front-end on mock lines
pub fn frontend() -> (FrontEnd<MockPin>, Lines) {
    let (enable, tx, rx, lines) = control_lines();
    let frontend = FrontEnd::new(enable, tx, rx).unwrap();
    (frontend, lines)
}

// ============================================================================
// Register chip
// ============================================================================

/// Observable state of the simulated transceiver chip
pub struct ChipState {
    pub registers: [u16; 32],
    /// Frames clocked while chip select was asserted
    pub frames: Vec<u16>,
    /// Frames clocked with chip select released
    pub ignored: usize,
    /// Fail the next transfer with this error
    pub fail_next: Option<ErrorKind>,
    /// Number of flushes
    pub flushes: usize,
}

/// Chip select line shared with the chip
pub struct MockCs {
    selected: Rc<Cell<bool>>,
    edges: Rc<Cell<usize>>,
}

impl DigitalErrorType for MockCs {
    type Error = Infallible;
}

impl OutputPin for MockCs {
    fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
        self.selected.set(true);
        self.edges.set(self.edges.get() + 1);
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
        self.selected.set(false);
        Ok(())
    }
}

/// Chip that stores 10-bit register writes and answers reads with junk in
/// the high bits, honouring chip select
pub struct EchoChip {
    state: Rc<RefCell<ChipState>>,
    selected: Rc<Cell<bool>>,
}

impl SpiErrorType for EchoChip {
    type Error = ErrorKind;
}

impl EchoChip {
    fn exchange(&mut self, word: u16) -> u16 {
        let mut state = self.state.borrow_mut();
        if !self.selected.get() {
            state.ignored += 1;
            return 0xFFFF;
        }
        state.frames.push(word);
        let index = usize::from((word >> 10) & 0x1F);
        if word & 0x8000 != 0 {
            0xFC00 | state.registers[index]
        } else {
            state.registers[index] = word & 0x03FF;
            0
        }
    }

    fn check_fault(&mut self) -> core::result::Result<(), ErrorKind> {
        match self.state.borrow_mut().fail_next.take() {
            Some(kind) => Err(kind),
            None => Ok(()),
        }
    }
}

impl SpiBus<u16> for EchoChip {
    fn read(&mut self, words: &mut [u16]) -> core::result::Result<(), Self::Error> {
        self.check_fault()?;
        for word in words {
            *word = self.exchange(0);
        }
        Ok(())
    }

    fn write(&mut self, words: &[u16]) -> core::result::Result<(), Self::Error> {
        self.check_fault()?;
        for &word in words {
            self.exchange(word);
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u16], write: &[u16]) -> core::result::Result<(), Self::Error> {
        self.check_fault()?;
        for (i, &word) in write.iter().enumerate() {
            let response = self.exchange(word);
            if let Some(slot) = read.get_mut(i) {
                *slot = response;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u16]) -> core::result::Result<(), Self::Error> {
        self.check_fault()?;
        for word in words {
            *word = self.exchange(*word);
        }
        Ok(())
    }

    fn flush(&mut self) -> core::result::Result<(), Self::Error> {
        self.state.borrow_mut().flushes += 1;
        Ok(())
    }
}

/// Handle on the chip for assertions
#[derive(Clone)]
pub struct Chip {
    state: Rc<RefCell<ChipState>>,
    selected: Rc<Cell<bool>>,
    cs_edges: Rc<Cell<usize>>,
}

impl Chip {
    pub fn register(&self, index: usize) -> u16 {
        self.state.borrow().registers[index]
    }

    pub fn set_register(&self, index: usize, value: u16) {
        self.state.borrow_mut().registers[index] = value;
    }

    pub fn frames(&self) -> Vec<u16> {
        self.state.borrow().frames.clone()
    }

    pub fn clear_frames(&self) {
        self.state.borrow_mut().frames.clear();
    }

    pub fn ignored(&self) -> usize {
        self.state.borrow().ignored
    }

    pub fn fail_next(&self, kind: ErrorKind) {
        self.state.borrow_mut().fail_next = Some(kind);
    }

    /// Chip select currently asserted
    pub fn is_selected(&self) -> bool {
        self.selected.get()
    }

    /// Number of chip select assertions so far
    pub fn selections(&self) -> usize {
        self.cs_edges.get()
    }
}

/// Raw chip, chip select and handle
pub fn echo_chip() -> (EchoChip, MockCs, Chip) {
    let state = Rc::new(RefCell::new(ChipState {
        registers: [0; 32],
        frames: Vec::new(),
        ignored: 0,
        fail_next: None,
        flushes: 0,
    }));
    let selected = Rc::new(Cell::new(false));
    let edges = Rc::new(Cell::new(0));
    let chip = EchoChip {
        state: Rc::clone(&state),
        selected: Rc::clone(&selected),
    };
    let cs = MockCs {
        selected: Rc::clone(&selected),
        edges: Rc::clone(&edges),
    };
    (
        chip,
        cs,
        Chip {
            state,
            selected,
            cs_edges: edges,
        },
    )
}

/// Register bus on a simulated chip
pub fn register_bus() -> (RegisterBus<EchoChip, MockCs>, Chip) {
    let (spi, cs, chip) = echo_chip();
    (RegisterBus::new(spi, cs).unwrap(), chip)
}

// ============================================================================
// Streaming seams
// ============================================================================

/// Sample clock that records every enable/disable
#[derive(Default)]
pub struct RecordingClock {
    pub enabled: bool,
    pub enables: usize,
    pub disables: usize,
}

impl SampleClock for RecordingClock {
    fn enable(&mut self) -> Result<()> {
        self.enabled = true;
        self.enables += 1;
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        self.enabled = false;
        self.disables += 1;
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Sample port that records clears and loaded words and replays queued
/// words as captures
#[derive(Default)]
pub struct RecordingPort {
    pub clears: usize,
    pub primed: Vec<SampleWord>,
    /// Words the "shift register" hands out, oldest first
    pub incoming: VecDeque<SampleWord>,
    pub captures: usize,
}

impl SamplePort for RecordingPort {
    fn clear(&mut self) {
        self.clears += 1;
    }

    fn prime(&mut self, word: &SampleWord) {
        self.primed.push(*word);
    }

    fn capture(&mut self) -> SampleWord {
        self.captures += 1;
        self.incoming.pop_front().unwrap_or_default()
    }
}
