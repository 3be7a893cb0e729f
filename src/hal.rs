//! Hardware Abstraction Layer
//!
//! STM32-side implementations of the seams the portable core is written
//! against. Anything touching raw addresses lives here.

pub mod gpio;
pub mod sample_port;
