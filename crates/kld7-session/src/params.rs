//! Cached radar parameters.
//!
//! The parameter structure is read once while the session starts and kept
//! in step with successful writes. It is never re-read from the sensor, so
//! changes made by another host are not seen.

use kld7_frame::params::field_index;
use kld7_frame::{RadarParameters, PARAM_FIELDS};
use kld7_transport::SerialLink;
use tracing::debug;

use crate::error::{Result, SessionError};
use crate::session::Session;

impl<L: SerialLink> Session<L> {
    /// The cached parameter structure.
    pub fn parameters(&self) -> &RadarParameters {
        &self.params
    }

    /// Cached value of the parameter `name` (case-insensitive).
    pub fn param(&self, name: &str) -> Result<i32> {
        self.ensure_open()?;
        self.params
            .get(name)
            .ok_or_else(|| SessionError::UnknownParameter(name.to_string()))
    }

    /// Write the parameter `name` to the sensor.
    ///
    /// The cache is updated only after the sensor answers OK. Negative
    /// values are sent as their two's-complement 32-bit pattern.
    pub fn set_param(&mut self, name: &str, value: i32) -> Result<()> {
        let index =
            field_index(name).ok_or_else(|| SessionError::UnknownParameter(name.to_string()))?;
        let field = &PARAM_FIELDS[index];

        self.command(field.command(), value)?;
        self.params.set(field.name, value);
        debug!(param = field.name, value, "parameter updated");
        Ok(())
    }
}
