use std::fmt;
use std::time::Duration;

use kld7_frame::{CommandPayload, Packet, PacketReader, PacketWriter, RadarParameters, Tag};
use kld7_transport::{SerialLink, SerialPortLink, DEFAULT_BAUD_RATE};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::response::Response;
use crate::stream::StopHandle;

/// An open conversation with one sensor.
///
/// Construction runs the start-up handshake: `INIT` with the requested line
/// rate, a rate switch once the sensor acknowledges, then `GRPS` to cache
/// the radar parameter structure. Any deviation there is fatal and no
/// session is returned.
///
/// Closing sends `GBYE` and releases the link. Both steps are best effort,
/// and dropping a session closes it.
pub struct Session<L: SerialLink = SerialPortLink> {
    link: Option<L>,
    config: SessionConfig,
    pub(crate) params: RadarParameters,
    pub(crate) stop: StopHandle,
}

impl Session<SerialPortLink> {
    /// Open the serial port at `path` and run the start-up handshake.
    ///
    /// An unsupported baud rate is rejected before the port is touched.
    pub fn open(path: &str, config: SessionConfig) -> Result<Self> {
        config.rate_index()?;
        let link = SerialPortLink::open(path, config.timeout)?;
        Self::with_link(link, config)
    }
}

impl<L: SerialLink> Session<L> {
    /// Run the start-up handshake over an already-open link.
    ///
    /// The link must currently run at 115200 baud, even parity.
    pub fn with_link(mut link: L, config: SessionConfig) -> Result<Self> {
        let rate_index = config.rate_index()?;
        link.set_timeout(config.timeout)?;

        let mut session = Self {
            link: Some(link),
            config,
            params: RadarParameters::default(),
            stop: StopHandle::new(),
        };
        session.initialize(rate_index)?;
        session.params = session.fetch_parameters()?;
        info!(
            baud_rate = session.config.baud_rate,
            version = session.params.version(),
            "session ready"
        );
        Ok(session)
    }

    fn initialize(&mut self, rate_index: u32) -> Result<()> {
        let response = match self.send_command(Tag::INIT, rate_index) {
            Ok(response) => response,
            Err(SessionError::UnknownResponseCode) => Response::Unknown,
            Err(err) => return Err(err),
        };
        if !response.is_ok() {
            return Err(SessionError::InitializationFailed(response));
        }

        let baud_rate = self.config.baud_rate;
        if baud_rate != DEFAULT_BAUD_RATE {
            self.link_mut()?.set_baud_rate(baud_rate)?;
            debug!(baud_rate, "switched line rate");
        }
        Ok(())
    }

    fn fetch_parameters(&mut self) -> Result<RadarParameters> {
        let failed = |err: SessionError| SessionError::ParameterFetchFailed(Box::new(err));

        match self.send_command(Tag::GRPS, CommandPayload::Empty) {
            Ok(Response::Ok) => {}
            Ok(response) => {
                return Err(failed(SessionError::DeviceRejected {
                    command: Tag::GRPS,
                    response,
                }))
            }
            Err(
                err @ (SessionError::UnknownResponseCode
                | SessionError::UnexpectedTag { .. }
                | SessionError::MalformedResponsePayload(_)),
            ) => return Err(failed(err)),
            Err(err) => return Err(err),
        }

        let packet = self.read_packet()?;
        if packet.tag != Tag::RPST {
            return Err(failed(SessionError::UnexpectedTag {
                expected: Tag::RPST,
                actual: packet.tag,
            }));
        }
        RadarParameters::decode(&packet.payload).map_err(|err| failed(err.into()))
    }

    /// Send one command and return the sensor's response code.
    ///
    /// Stale input is discarded first so the `RESP` read afterwards belongs
    /// to this command. A response that is not a one-byte `RESP` is an
    /// error; so is a code outside the defined range.
    pub fn send_command(
        &mut self,
        tag: Tag,
        payload: impl Into<CommandPayload>,
    ) -> Result<Response> {
        let payload = payload.into();
        let link = self.link_mut()?;
        let stale = link.discard_input()?;
        if stale > 0 {
            debug!(stale, "discarded stale input");
        }
        PacketWriter::new(&mut *link).send(tag, &payload)?;

        let packet = self.read_packet()?;
        if packet.tag != Tag::RESP {
            return Err(SessionError::UnexpectedTag {
                expected: Tag::RESP,
                actual: packet.tag,
            });
        }
        let &[code] = packet.payload.as_ref() else {
            return Err(SessionError::MalformedResponsePayload(packet.payload.len()));
        };

        let response = Response::from_byte(code);
        if response == Response::Unknown {
            warn!(%tag, code, "sensor sent unknown response code");
            return Err(SessionError::UnknownResponseCode);
        }
        debug!(%tag, ?payload, %response, "command exchanged");
        Ok(response)
    }

    /// Send one command and require an OK response.
    pub fn command(&mut self, tag: Tag, payload: impl Into<CommandPayload>) -> Result<()> {
        match self.send_command(tag, payload)? {
            Response::Ok => Ok(()),
            response => Err(SessionError::DeviceRejected {
                command: tag,
                response,
            }),
        }
    }

    /// Read the next whole packet from the sensor.
    pub fn read_packet(&mut self) -> Result<Packet> {
        let frame_config = self.config.frame_config();
        let link = self.link_mut()?;
        Ok(PacketReader::with_config(link, frame_config).read_packet()?)
    }

    /// Current read timeout.
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Change the read timeout used by subsequent reads.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.link_mut()?.set_timeout(timeout)?;
        self.config.timeout = timeout;
        Ok(())
    }

    /// Negotiated line rate.
    pub fn baud_rate(&self) -> u32 {
        self.config.baud_rate
    }

    /// Name of the underlying link, when it has one.
    pub fn port_name(&self) -> Option<String> {
        self.link.as_ref().and_then(|link| link.name())
    }

    pub fn is_closed(&self) -> bool {
        self.link.is_none()
    }

    /// Handle that can cancel a running stream from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Say goodbye to the sensor and release the link.
    ///
    /// Never fails: a sensor that does not answer `GBYE`, or a link that
    /// errors while closing, is logged and otherwise ignored. Closing an
    /// already closed session does nothing.
    pub fn close(&mut self) {
        self.stop.stop();
        if self.link.is_none() {
            return;
        }

        match self.send_command(Tag::GBYE, CommandPayload::Empty) {
            Ok(Response::Ok) => {}
            Ok(response) => debug!(%response, "sensor did not acknowledge GBYE"),
            Err(err) => warn!(error = %err, "GBYE failed during close"),
        }

        if let Some(mut link) = self.link.take() {
            if let Err(err) = link.close() {
                warn!(error = %err, "failed to close serial link");
            }
        }
        info!("session closed");
    }

    pub(crate) fn link_mut(&mut self) -> Result<&mut L> {
        self.link.as_mut().ok_or(SessionError::TransportClosed)
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.link.is_some() {
            Ok(())
        } else {
            Err(SessionError::TransportClosed)
        }
    }
}

impl<L: SerialLink> Drop for Session<L> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<L: SerialLink> fmt::Debug for Session<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("port", &self.port_name())
            .field("baud_rate", &self.config.baud_rate)
            .field("timeout", &self.config.timeout)
            .field("closed", &self.is_closed())
            .finish()
    }
}
