/// Errors that can occur on the serial link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the named serial port.
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// The serial driver rejected a configuration change.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// An I/O error occurred on the link.
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stale input kept arriving while it was being discarded.
    #[error("input did not go quiet after discarding {discarded} bytes")]
    DrainTimeout { discarded: usize },

    /// The link has already been closed.
    #[error("serial link closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
