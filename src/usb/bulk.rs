//! Bulk endpoint pump
//!
//! The scheduler queues half-buffer transfers into a [`UsbTransferQueue`];
//! the pump task pops them and moves the bytes between the stream buffer
//! and the bulk endpoints one packet at a time. Cancelling the queue also
//! aborts the transfer the pump is working on.

use core::cell::RefCell;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_usb::driver::{EndpointError, EndpointIn, EndpointOut};

use crate::config::{TRANSFER_QUEUE_DEPTH, USB_BULK_PACKET_SIZE};
use crate::error::Result;
use crate::streaming::buffer::StreamBuffer;
use crate::streaming::transfer::{BulkEndpoint, TransferDescriptor, TransferQueue};
use crate::types::Direction;

const PACKET: usize = USB_BULK_PACKET_SIZE as usize;

/// Raised when a transfer is queued
pub static TRANSFER_PENDING: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Raised when queued transfers are dropped
pub static TRANSFER_CANCEL: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Transfer queue that wakes the pump
pub struct UsbTransferQueue {
    queue: TransferQueue<TRANSFER_QUEUE_DEPTH>,
}

impl UsbTransferQueue {
    /// Empty queue
    #[must_use]
    pub const fn new() -> Self {
        Self {
            queue: TransferQueue::new(),
        }
    }

    /// Take the next transfer for the pump
    pub fn pop(&mut self) -> Option<TransferDescriptor> {
        self.queue.pop()
    }

    /// Number of transfers waiting
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if nothing is waiting
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for UsbTransferQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl BulkEndpoint for UsbTransferQueue {
    fn schedule(&mut self, transfer: TransferDescriptor) -> Result<()> {
        self.queue.schedule(transfer)?;
        TRANSFER_PENDING.signal(());
        Ok(())
    }

    fn cancel_all(&mut self) {
        self.queue.cancel_all();
        TRANSFER_CANCEL.signal(());
    }
}

/// Why a transfer did not finish
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum PumpError {
    /// Endpoint disabled or buffer overflow
    Endpoint(EndpointError),
    /// The queue was cancelled mid-transfer
    Cancelled,
}

impl From<EndpointError> for PumpError {
    fn from(err: EndpointError) -> Self {
        Self::Endpoint(err)
    }
}

/// Moves stream buffer halves over the bulk endpoints
pub struct BulkPump<I, O> {
    ep_in: I,
    ep_out: O,
}

impl<I: EndpointIn, O: EndpointOut> BulkPump<I, O> {
    /// Pump over a bulk IN/OUT pair
    pub fn new(ep_in: I, ep_out: O) -> Self {
        Self { ep_in, ep_out }
    }

    /// Wait until the host configured both endpoints
    pub async fn wait_enabled(&mut self) {
        self.ep_in.wait_enabled().await;
        self.ep_out.wait_enabled().await;
    }

    /// Run one transfer, aborting if the queue is cancelled meanwhile
    ///
    /// Call right after popping `transfer`, so an earlier cancel does not
    /// abort it.
    pub async fn run<M: RawMutex, const N: usize>(
        &mut self,
        transfer: &TransferDescriptor,
        buffer: &Mutex<M, RefCell<StreamBuffer<N>>>,
    ) -> core::result::Result<(), PumpError> {
        TRANSFER_CANCEL.reset();
        let moved = match transfer.direction {
            Direction::DeviceToHost => {
                let fut = Self::send(&mut self.ep_in, transfer, buffer);
                select(fut, TRANSFER_CANCEL.wait()).await
            }
            Direction::HostToDevice => {
                let fut = Self::receive(&mut self.ep_out, transfer, buffer);
                select(fut, TRANSFER_CANCEL.wait()).await
            }
        };
        match moved {
            Either::First(result) => result,
            Either::Second(()) => Err(PumpError::Cancelled),
        }
    }

    async fn send<M: RawMutex, const N: usize>(
        ep_in: &mut I,
        transfer: &TransferDescriptor,
        buffer: &Mutex<M, RefCell<StreamBuffer<N>>>,
    ) -> core::result::Result<(), PumpError> {
        let mut packet = [0u8; PACKET];
        let mut position = transfer.range.start;
        while position < transfer.range.end {
            let len = PACKET.min(transfer.range.end - position);
            buffer.lock(|b| {
                packet[..len].copy_from_slice(&b.borrow().as_bytes()[position..position + len]);
            });
            ep_in.write(&packet[..len]).await?;
            position += len;
        }
        Ok(())
    }

    async fn receive<M: RawMutex, const N: usize>(
        ep_out: &mut O,
        transfer: &TransferDescriptor,
        buffer: &Mutex<M, RefCell<StreamBuffer<N>>>,
    ) -> core::result::Result<(), PumpError> {
        let mut packet = [0u8; PACKET];
        let mut position = transfer.range.start;
        while position < transfer.range.end {
            let received = ep_out.read(&mut packet).await?;
            let len = received.min(transfer.range.end - position);
            buffer.lock(|b| {
                b.borrow_mut().as_bytes_mut()[position..position + len]
                    .copy_from_slice(&packet[..len]);
            });
            position += len;
        }
        Ok(())
    }
}
