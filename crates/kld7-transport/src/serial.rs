use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, Parity, SerialPort, SerialPortType, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::SerialLink;

/// Line rate every K-LD7 session starts at, before `INIT` negotiates another.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// A [`SerialLink`] over a real serial port.
///
/// The port is always opened at [`DEFAULT_BAUD_RATE`], 8 data bits, even
/// parity and one stop bit; that is the only framing the sensor accepts
/// before initialization.
pub struct SerialPortLink {
    port: Option<Box<dyn SerialPort>>,
    name: String,
}

impl SerialPortLink {
    /// Open `path` with the sensor's default framing and the given read timeout.
    pub fn open(path: &str, timeout: Duration) -> Result<Self> {
        let port = serialport::new(path, DEFAULT_BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::Even)
            .stop_bits(StopBits::One)
            .timeout(timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: path.to_string(),
                source,
            })?;

        info!(port = path, baud_rate = DEFAULT_BAUD_RATE, "opened serial port");
        Ok(Self {
            port: Some(port),
            name: path.to_string(),
        })
    }

    /// Returns true once [`SerialLink::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.port.is_none()
    }

    fn port(&self) -> Result<&dyn SerialPort> {
        self.port.as_deref().ok_or(TransportError::Closed)
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(TransportError::Closed)
    }
}

fn closed_io_error() -> std::io::Error {
    std::io::Error::new(ErrorKind::NotConnected, "serial link closed")
}

impl Read for SerialPortLink {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.port.as_mut() {
            Some(port) => port.read(buf),
            None => Err(closed_io_error()),
        }
    }
}

impl Write for SerialPortLink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.port.as_mut() {
            Some(port) => port.write(buf),
            None => Err(closed_io_error()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.port.as_mut() {
            Some(port) => port.flush(),
            None => Err(closed_io_error()),
        }
    }
}

impl SerialLink for SerialPortLink {
    fn timeout(&self) -> Duration {
        self.port
            .as_deref()
            .map(|port| port.timeout())
            .unwrap_or_default()
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port_mut()?.set_timeout(timeout)?;
        Ok(())
    }

    fn baud_rate(&self) -> Result<u32> {
        Ok(self.port()?.baud_rate()?)
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        debug!(port = %self.name, baud_rate, "switching baud rate");
        self.port_mut()?.set_baud_rate(baud_rate)?;
        Ok(())
    }

    fn name(&self) -> Option<String> {
        Some(self.name.clone())
    }

    fn discard_input(&mut self) -> Result<usize> {
        let port = self.port()?;
        let pending = port.bytes_to_read()? as usize;
        port.clear(ClearBuffer::Input)?;
        if pending > 0 {
            debug!(port = %self.name, pending, "discarded stale input");
        }
        Ok(pending)
    }

    fn close(&mut self) -> Result<()> {
        let Some(mut port) = self.port.take() else {
            return Ok(());
        };
        let flushed = port.flush();
        drop(port);
        info!(port = %self.name, "closed serial port");
        flushed.map_err(Into::into)
    }
}

impl std::fmt::Debug for SerialPortLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortLink")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// One entry of [`available_ports`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSummary {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`.
    pub name: String,
    /// Short transport description ("usb", "pci", "bluetooth", "unknown").
    pub kind: &'static str,
    /// USB product string when the port is a USB adapter.
    pub product: Option<String>,
}

/// Enumerate the serial ports visible to this host.
pub fn available_ports() -> Result<Vec<PortSummary>> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|info| {
            let (kind, product) = match info.port_type {
                SerialPortType::UsbPort(usb) => ("usb", usb.product),
                SerialPortType::PciPort => ("pci", None),
                SerialPortType::BluetoothPort => ("bluetooth", None),
                SerialPortType::Unknown => ("unknown", None),
            };
            PortSummary {
                name: info.port_name,
                kind,
                product,
            }
        })
        .collect())
}
