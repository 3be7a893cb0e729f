//! Peripheral Drivers
//!
//! Drivers for the external RF transceiver's register interface.
//! These sit on embedded-hal traits so they run against real peripherals and
//! host-side test doubles alike.

pub mod register_bus;
pub mod register_file;
