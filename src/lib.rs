//! SDR USB Peripheral Firmware Library
//!
//! Streaming and RF front-end control core for a USB software defined radio
//! peripheral. The host selects a transceiver mode; the firmware powers the
//! RF chip accordingly and moves samples between a hardware shift register
//! and USB bulk endpoints through a double-buffered stream buffer.
//!
//! # Architecture
//!
//! The firmware is organized in layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    APPLICATION LAYER                         │
//! │  Host commands  │  Transceiver core (mode, registers)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    STREAMING LAYER                           │
//! │  Stream buffer  │  Shared state  │  Half scheduler           │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   HAL / DRIVER LAYER                         │
//! │  Register bus (SPI)  │  Front-end lines  │  Sample port/USB  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    RTOS / SCHEDULER                          │
//! │           embassy-rs (async/await executor)                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything above the HAL sits on `embedded-hal` traits or on the small
//! seams in [`streaming`], so the core runs unchanged against host-side test
//! doubles.
//!
//! # Design Principles
//!
//! - **Type-driven design**: modes, power states and buffer halves are enums
//! - **No unsafe in application code**: MMIO isolated in `hal`
//! - **Explicit shared state**: interrupt-visible state lives in atomics
//! - **Explicit error handling**: all fallible operations return `Result`

#![cfg_attr(feature = "embedded", no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[macro_use]
mod fmt;

// Re-export dependencies needed by applications (only in embedded mode)
#[cfg(feature = "embedded")]
pub use embassy_executor;
#[cfg(feature = "embedded")]
pub use embassy_stm32;
#[cfg(feature = "embedded")]
pub use embassy_time;
#[cfg(feature = "embedded")]
pub use embassy_usb;

/// Hardware Abstraction Layer
///
/// STM32 implementations of the streaming seams and indicator LEDs.
#[cfg(feature = "embedded")]
pub mod hal;

/// Peripheral Drivers
///
/// RF transceiver register bus and write cache.
pub mod drivers;

/// Radio Control Logic
///
/// Front-end power control, host commands, transceiver core.
pub mod radio;

/// Sample Streaming
///
/// Double buffer, shared state and bulk transfer scheduling.
pub mod streaming;

/// USB Subsystem
///
/// Vendor control requests and the bulk endpoint pump.
#[cfg(feature = "embedded")]
pub mod usb;

/// Shared types used across modules
pub mod types;

/// Firmware error type
pub mod error;

/// System configuration and constants
pub mod config;

/// Prelude module for common imports
#[cfg(feature = "embedded")]
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::config::*;
    pub use crate::error::{Error, Result};
    pub use crate::types::*;

    // Common traits
    pub use crate::drivers::register_bus::RegisterAccess;
    pub use crate::streaming::clock::SampleClock;
    pub use crate::streaming::port::SamplePort;
    pub use crate::streaming::transfer::BulkEndpoint;
    pub use embedded_hal::digital::{OutputPin, StatefulOutputPin};

    // Embassy
    pub use embassy_time::{Duration, Instant, Timer};

    // Logging
    pub use defmt::{debug, error, info, trace, warn};
}
