//! Serial link abstraction for the K-LD7 radar driver.
//!
//! The protocol layers above only need a blocking byte pipe with a
//! settable read timeout, an adjustable baud rate and a way to throw away
//! stale input. That contract is the [`SerialLink`] trait; the
//! [`SerialPortLink`] type implements it on top of the `serialport` crate.
//!
//! This is the lowest layer of kld7. Everything else builds on top of it.

pub mod error;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use serial::{available_ports, PortSummary, SerialPortLink, DEFAULT_BAUD_RATE};
pub use traits::{SerialLink, DISCARD_TIME_LIMIT};
