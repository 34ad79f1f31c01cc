//! Session layer for the K-LD7 radar sensor.
//!
//! A [`Session`] owns one serial link and runs the sensor's strict
//! request/response protocol over it: every command is answered by exactly
//! one `RESP` packet before anything else is sent. On top of that exchange
//! it caches the radar parameter structure and drives multi-frame streaming.
//!
//! A session is used from one flow of control at a time. Every operation
//! takes `&mut self`; wrap the session in a `Mutex` if several threads need
//! it, and use a [`StopHandle`] to cancel a stream from elsewhere.

pub mod config;
pub mod error;
pub mod params;
pub mod response;
pub mod session;
pub mod stream;

#[cfg(test)]
mod mock;

pub use config::{baud_rate_index, SessionConfig, DEFAULT_TIMEOUT, SUPPORTED_BAUD_RATES};
pub use error::{Result, SessionError};
pub use response::Response;
pub use session::Session;
pub use stream::{FrameStream, StopHandle, StreamOptions, StreamState};
