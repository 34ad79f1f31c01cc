use std::fmt;

use crate::tag::Tag;

/// Payload size a fixed layout accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedLength {
    Exact(usize),
    /// Any whole number of records of this size.
    MultipleOf(usize),
}

impl fmt::Display for ExpectedLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedLength::Exact(size) => write!(f, "{size}"),
            ExpectedLength::MultipleOf(size) => write!(f, "a multiple of {size}"),
        }
    }
}

/// Errors that can occur while framing, reading or decoding packets.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// No header bytes arrived before the link timeout expired.
    #[error("timed out waiting for a packet header")]
    Timeout,

    /// Fewer than eight header bytes arrived.
    #[error("short packet header ({received} of 8 bytes)")]
    Framing { received: usize },

    /// The payload ended before the declared length was reached.
    #[error("incomplete {tag} frame ({received} of {expected} payload bytes)")]
    IncompleteFrame {
        tag: Tag,
        expected: usize,
        received: usize,
    },

    /// The declared payload length exceeds the configured maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A payload does not match the fixed layout for its tag.
    #[error("{tag} payload has wrong length ({actual} bytes, expected {expected})")]
    PayloadLength {
        tag: Tag,
        expected: ExpectedLength,
        actual: usize,
    },

    /// The decoder has no layout for this tag.
    #[error("unsupported frame tag {0}")]
    UnsupportedFrameTag(Tag),

    /// A command name is not a 4-character ASCII code.
    #[error("invalid tag {0:?} (expected 4 ASCII characters)")]
    InvalidTag(String),

    /// An I/O error occurred while reading or writing packets.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_length_message_names_the_layout() {
        let exact = FrameError::PayloadLength {
            tag: Tag::DDAT,
            expected: ExpectedLength::Exact(6),
            actual: 5,
        };
        assert_eq!(
            exact.to_string(),
            "DDAT payload has wrong length (5 bytes, expected 6)"
        );

        let records = FrameError::PayloadLength {
            tag: Tag::PDAT,
            expected: ExpectedLength::MultipleOf(8),
            actual: 12,
        };
        assert!(records.to_string().ends_with("expected a multiple of 8)"));
    }
}
