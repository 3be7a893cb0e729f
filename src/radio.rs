//! Radio Control Logic
//!
//! Front-end power control and the transceiver core the host command
//! surface drives.

pub mod command;
pub mod frontend;
pub mod transceiver;
