//! Serial connection handling
//!
//! Port lifecycle and DTR/RTS reset sequencing.

pub mod port;
pub mod reset;

pub use port::{PortConfig, PortError, SerialConnection};
