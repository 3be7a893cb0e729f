//! Transceiver core
//!
//! Ties the front-end controller, the register interface and the streaming
//! scheduler together behind the entry points the host command surface
//! uses. Everything here runs on the main loop except
//! [`Transceiver::on_transfer_complete`], which may run from a completion
//! interrupt.

use embedded_hal::digital::StatefulOutputPin;

use super::command::{Command, Response};
use super::frontend::FrontEnd;
use crate::config::{XCVR_NUM_REGS, XCVR_REG_VALUE_LIMIT};
use crate::drivers::register_bus::RegisterAccess;
use crate::error::{Error, Result};
use crate::streaming::buffer::{Half, StreamBuffer};
use crate::streaming::clock::SampleClock;
use crate::streaming::port::SamplePort;
use crate::streaming::scheduler::{Completion, Scheduler};
use crate::streaming::state::StreamState;
use crate::streaming::transfer::{BulkEndpoint, CompletionToken};
use crate::types::{ChipPowerState, TransceiverMode};

/// Mode control, register pass-through and stream scheduling
pub struct Transceiver<'s, P, R, const N: usize> {
    frontend: FrontEnd<P>,
    registers: R,
    scheduler: Scheduler<'s, N>,
}

impl<'s, P, R, const N: usize> Transceiver<'s, P, R, N>
where
    P: StatefulOutputPin,
    R: RegisterAccess,
{
    /// Assemble the core around shared stream state
    ///
    /// `state` should be idle (mode OFF).
    pub fn new(frontend: FrontEnd<P>, registers: R, state: &'s StreamState<N>) -> Self {
        Self {
            frontend,
            registers,
            scheduler: Scheduler::new(state),
        }
    }

    /// Shared stream state
    #[must_use]
    pub const fn state(&self) -> &'s StreamState<N> {
        self.scheduler.state()
    }

    /// Current host-selected mode
    #[must_use]
    pub fn transceiver_mode(&self) -> TransceiverMode {
        self.state().mode()
    }

    /// Chip power state as the control lines express it right now
    pub fn chip_power_state(&mut self) -> Result<ChipPowerState> {
        self.frontend.current_state()
    }

    /// Drive the chip directly, bypassing the mode mapping
    ///
    /// Used for STANDBY, which no transceiver mode selects.
    pub fn set_chip_power_state(&mut self, state: ChipPowerState) -> Result<()> {
        self.frontend.set_state(state)
    }

    /// Switch the transceiver mode
    ///
    /// Setting the current mode again does nothing. Otherwise the sample
    /// clock stops and queued transfers are dropped before any stream state
    /// changes; completions still in flight become stale. The stream goes
    /// idle while the front-end switches and the new mode is published only
    /// once the chip reached its power state. If the control lines fail the
    /// device is left OFF with the chip driven towards SHUTDOWN. Returns
    /// whether the mode changed.
    pub fn set_transceiver_mode<C, E>(
        &mut self,
        mode: TransceiverMode,
        clock: &mut C,
        endpoint: &mut E,
    ) -> Result<bool>
    where
        C: SampleClock,
        E: BulkEndpoint,
    {
        let state = self.state();
        let previous = state.mode();
        if previous == mode {
            return Ok(false);
        }

        clock.disable()?;
        endpoint.cancel_all();
        // idle first: completions in flight go stale before the chip moves
        state.enter_mode(TransceiverMode::Off);
        state.reset(0, Half::First);

        if let Err(err) = self.frontend.set_state(mode.chip_state()) {
            warn!("mode {} -> {} failed: {}", previous, mode, err);
            if let Err(err) = self.frontend.shutdown() {
                warn!("xcvr shutdown failed: {}", err);
            }
            return Err(err);
        }

        if mode.is_streaming() {
            state.enter_mode(mode);
            state.request_start();
        }
        info!("mode {} -> {}", previous, mode);
        Ok(true)
    }

    /// Read a transceiver register
    pub fn read_register(&mut self, index: u8) -> Result<u16> {
        Self::check_index(index)?;
        self.registers.read_register(index)
    }

    /// Write a transceiver register
    pub fn write_register(&mut self, index: u8, value: u16) -> Result<()> {
        Self::check_index(index)?;
        if value >= XCVR_REG_VALUE_LIMIT {
            return Err(Error::ValueOutOfRange { index, value });
        }
        self.registers.write_register(index, value)
    }

    /// Check whether the stream start sequence should run now
    ///
    /// Consumes the request raised by the last mode change.
    pub fn should_prepare_buffer(&self) -> bool {
        self.state().mode().is_streaming() && self.state().take_start_request()
    }

    /// One main-loop iteration of stream handling
    ///
    /// Runs the entry sequence if a mode change asked for one, then polls
    /// the scheduler. Does nothing while OFF. A failed entry sequence is
    /// requested again. Returns the half scheduled, if any.
    pub fn service<C, E, Q>(
        &mut self,
        clock: &mut C,
        endpoint: &mut E,
        port: &mut Q,
    ) -> Result<Option<Half>>
    where
        C: SampleClock,
        E: BulkEndpoint,
        Q: SamplePort,
    {
        if !self.transceiver_mode().is_streaming() {
            return Ok(None);
        }
        if self.should_prepare_buffer() {
            if let Err(err) = self.scheduler.start(endpoint, clock, port) {
                // retried on the next iteration
                self.state().request_start();
                return Err(err);
            }
        }
        self.scheduler.poll(endpoint)
    }

    /// Hand a finished transfer back
    pub fn on_transfer_complete<C, Q>(
        &mut self,
        token: CompletionToken,
        buffer: &StreamBuffer<N>,
        clock: &mut C,
        port: &mut Q,
    ) -> Result<Completion>
    where
        C: SampleClock,
        Q: SamplePort,
    {
        self.scheduler
            .on_transfer_complete(token, buffer, clock, port)
    }

    /// Hand back a transfer the endpoint gave up on
    pub fn on_transfer_failed(&mut self, token: CompletionToken) -> Completion {
        self.scheduler.on_transfer_failed(token)
    }

    /// USB bus reset or configuration change
    ///
    /// The host has lost track of any stream, so the device goes OFF.
    pub fn on_usb_configuration_changed<C, E>(
        &mut self,
        configured: bool,
        clock: &mut C,
        endpoint: &mut E,
    ) -> Result<()>
    where
        C: SampleClock,
        E: BulkEndpoint,
    {
        debug!("usb configured: {=bool}", configured);
        self.set_transceiver_mode(TransceiverMode::Off, clock, endpoint)
            .map(|_| ())
    }

    /// Execute one host command
    pub fn handle<C, E>(
        &mut self,
        command: Command,
        clock: &mut C,
        endpoint: &mut E,
    ) -> Result<Response>
    where
        C: SampleClock,
        E: BulkEndpoint,
    {
        match command {
            Command::SetTransceiverMode(mode) => {
                self.set_transceiver_mode(mode, clock, endpoint)?;
                Ok(Response::Ack)
            }
            Command::WriteRegister { index, value } => {
                self.write_register(index, value)?;
                Ok(Response::Ack)
            }
            Command::ReadRegister { index } => {
                let value = self.read_register(index)?;
                Ok(Response::Register { index, value })
            }
            Command::GetTransceiverMode => Ok(Response::Mode(self.transceiver_mode())),
            Command::GetChipPowerState => self.chip_power_state().map(Response::PowerState),
        }
    }

    /// Take the core apart
    pub fn release(self) -> (FrontEnd<P>, R) {
        (self.frontend, self.registers)
    }

    fn check_index(index: u8) -> Result<()> {
        if usize::from(index) < XCVR_NUM_REGS {
            Ok(())
        } else {
            Err(Error::InvalidRegister(index))
        }
    }
}
