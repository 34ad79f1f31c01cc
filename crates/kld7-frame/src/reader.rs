use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::trace;

use crate::codec::{decode_header, FrameConfig, Packet, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Reads whole packets from a blocking, timeout-driven `Read` stream.
///
/// A read that times out (`TimedOut`/`WouldBlock`) or returns 0 bytes ends
/// the current fill attempt. How far the fill got decides the error:
/// nothing at all is a [`FrameError::Timeout`], a partial header is
/// [`FrameError::Framing`] and a short payload is
/// [`FrameError::IncompleteFrame`].
pub struct PacketReader<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: Read> PacketReader<T> {
    /// Create a new packet reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new packet reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Read the next complete packet (blocking).
    pub fn read_packet(&mut self) -> Result<Packet> {
        let mut header = [0u8; HEADER_SIZE];
        match self.fill(&mut header)? {
            0 => return Err(FrameError::Timeout),
            HEADER_SIZE => {}
            received => return Err(FrameError::Framing { received }),
        }

        let (tag, length) = decode_header(&header);
        let length = length as usize;
        if length > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: length,
                max: self.config.max_payload_size,
            });
        }

        let mut payload = BytesMut::zeroed(length);
        let received = self.fill(&mut payload)?;
        if received < length {
            return Err(FrameError::IncompleteFrame {
                tag,
                expected: length,
                received,
            });
        }

        trace!(%tag, length, "read packet");
        Ok(Packet {
            tag,
            payload: payload.freeze(),
        })
    }

    /// Fill `buf` until it is full or the stream goes quiet.
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0usize;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    break
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        Ok(filled)
    }
}
