use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use crate::error::{Result, TransportError};

/// Longest one [`SerialLink::discard_input`] call keeps reading before it
/// gives up on a sensor that never goes quiet.
pub const DISCARD_TIME_LIMIT: Duration = Duration::from_secs(1);
const DISCARD_CHUNK_SIZE: usize = 256;

/// A blocking serial byte pipe.
///
/// Reads block for at most [`timeout`](SerialLink::timeout) and report an
/// expired timeout as `ErrorKind::TimedOut` (or `WouldBlock`), exactly like
/// the `serialport` crate does.
pub trait SerialLink: Read + Write {
    /// Current read timeout.
    fn timeout(&self) -> Duration;

    /// Change the read timeout for subsequent reads.
    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Current line rate.
    fn baud_rate(&self) -> Result<u32>;

    /// Switch the line rate in place.
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()>;

    /// Human-readable link name (port path) for diagnostics.
    fn name(&self) -> Option<String> {
        None
    }

    /// Drop whatever input is already buffered, without blocking.
    ///
    /// The default reads with a zero timeout until nothing is pending and
    /// restores the previous timeout afterwards, even when draining failed.
    /// Input that keeps arriving for longer than [`DISCARD_TIME_LIMIT`] is
    /// reported as [`TransportError::DrainTimeout`].
    fn discard_input(&mut self) -> Result<usize> {
        let previous = self.timeout();
        self.set_timeout(Duration::ZERO)?;

        let started = Instant::now();
        let mut scratch = [0u8; DISCARD_CHUNK_SIZE];
        let mut discarded = 0usize;
        let outcome = loop {
            match self.read(&mut scratch) {
                Ok(0) => break Ok(()),
                Ok(n) => {
                    discarded += n;
                    if started.elapsed() > DISCARD_TIME_LIMIT {
                        break Err(TransportError::DrainTimeout { discarded });
                    }
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    break Ok(())
                }
                Err(err) => break Err(err.into()),
            }
        };

        self.set_timeout(previous)?;
        outcome.map(|()| discarded)
    }

    /// Release the link. Best effort; the default does nothing beyond
    /// what dropping the value does.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<L: SerialLink + ?Sized> SerialLink for Box<L> {
    fn timeout(&self) -> Duration {
        (**self).timeout()
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        (**self).set_timeout(timeout)
    }

    fn baud_rate(&self) -> Result<u32> {
        (**self).baud_rate()
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        (**self).set_baud_rate(baud_rate)
    }

    fn name(&self) -> Option<String> {
        (**self).name()
    }

    fn discard_input(&mut self) -> Result<usize> {
        (**self).discard_input()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
