use std::time::Duration;

use kld7_frame::{FrameConfig, DEFAULT_MAX_PAYLOAD};
use kld7_transport::DEFAULT_BAUD_RATE;

use crate::error::{Result, SessionError};

/// Line rates the sensor accepts, in `INIT` index order.
pub const SUPPORTED_BAUD_RATES: [u32; 5] = [115_200, 460_800, 921_600, 2_000_000, 3_000_000];

/// Default per-read timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(200);

/// Position of `baud_rate` in [`SUPPORTED_BAUD_RATES`], as sent with `INIT`.
pub fn baud_rate_index(baud_rate: u32) -> Option<u32> {
    SUPPORTED_BAUD_RATES
        .iter()
        .position(|&rate| rate == baud_rate)
        .map(|i| i as u32)
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Line rate to negotiate with `INIT`. The link always opens at
    /// 115200 and switches only after the sensor acknowledges.
    pub baud_rate: u32,
    /// Read timeout applied to every blocking read.
    pub timeout: Duration,
    /// Largest packet payload accepted from the sensor.
    pub max_payload_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_TIMEOUT,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl SessionConfig {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `INIT` index for the configured rate, or an error for an
    /// unsupported one.
    pub fn rate_index(&self) -> Result<u32> {
        baud_rate_index(self.baud_rate).ok_or(SessionError::UnsupportedBaudRate(self.baud_rate))
    }

    pub(crate) fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_payload_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_sensor_power_on_state() {
        let config = SessionConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.timeout, Duration::from_millis(200));
        assert_eq!(config.rate_index().unwrap(), 0);
    }

    #[test]
    fn rate_indices_follow_table_order() {
        assert_eq!(baud_rate_index(115_200), Some(0));
        assert_eq!(baud_rate_index(460_800), Some(1));
        assert_eq!(baud_rate_index(921_600), Some(2));
        assert_eq!(baud_rate_index(2_000_000), Some(3));
        assert_eq!(baud_rate_index(3_000_000), Some(4));
    }

    #[test]
    fn unsupported_rate_is_rejected() {
        assert_eq!(baud_rate_index(9600), None);
        let err = SessionConfig::default()
            .with_baud_rate(57_600)
            .rate_index()
            .unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedBaudRate(57_600)));
    }
}
