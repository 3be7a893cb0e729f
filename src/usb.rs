//! USB Subsystem
//!
//! Vendor-class device: control requests on endpoint 0 select the mode and
//! reach the transceiver registers, one bulk IN/OUT pair carries samples.

pub mod bulk;
pub mod control;
