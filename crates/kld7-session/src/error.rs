use kld7_frame::{FrameError, Tag};
use kld7_transport::TransportError;

use crate::response::Response;

/// Errors that can occur while talking to the sensor.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Serial link failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Packet read, write or decode failure.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Requested line rate is not one the sensor supports.
    #[error("unsupported baud rate: {0}")]
    UnsupportedBaudRate(u32),

    /// The sensor did not acknowledge `INIT`.
    #[error("initialization failed: sensor answered {0}")]
    InitializationFailed(Response),

    /// Reading the radar parameter structure at session start failed.
    #[error("parameter fetch failed: {0}")]
    ParameterFetchFailed(#[source] Box<SessionError>),

    /// The session has been closed.
    #[error("session is closed")]
    TransportClosed,

    /// A packet arrived with a different tag than the exchange requires.
    #[error("unexpected packet: expected {expected}, got {actual}")]
    UnexpectedTag { expected: Tag, actual: Tag },

    /// A `RESP` payload was not exactly one byte.
    #[error("malformed response payload: {0} bytes")]
    MalformedResponsePayload(usize),

    /// A `RESP` carried a code outside the defined range.
    #[error("sensor sent an unknown response code")]
    UnknownResponseCode,

    /// The sensor answered a command with something other than OK.
    #[error("{command} rejected: {response}")]
    DeviceRejected { command: Tag, response: Response },

    /// No parameter with this name exists.
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    /// A stream was requested with no frame kinds selected.
    #[error("no frame kinds selected")]
    EmptyFrameSelection,

    /// The stream was stopped before it produced a frame.
    #[error("stream cancelled")]
    Cancelled,
}

impl SessionError {
    /// True when the sensor simply did not answer within the read timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::Frame(FrameError::Timeout))
    }
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
