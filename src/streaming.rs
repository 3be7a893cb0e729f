//! Sample Streaming
//!
//! Double-buffered movement of samples between the hardware shift register
//! and the USB bulk endpoints.
//!
//! - `buffer`: the two-half stream buffer and sample word access
//! - `state`: mode/offset/phase shared with interrupt context
//! - `transfer`: bulk transfer descriptors, completion tokens, endpoint seam
//! - `clock`: sample clock gate
//! - `port`: shift register priming seam
//! - `scheduler`: entry protocol and steady-state half scheduling

pub mod buffer;
pub mod clock;
pub mod port;
pub mod scheduler;
pub mod state;
pub mod transfer;
