use std::time::Duration;

use clap::{Args, Subcommand};
use kld7_frame::{FrameKind, FrameKinds};
use kld7_session::{Session, SessionConfig};

use crate::exit::{session_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod params;
pub mod ports;
pub mod read;
pub mod set;
pub mod stream;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List serial ports on this host.
    Ports,
    /// Print the sensor's radar parameters.
    Params,
    /// Write one radar parameter.
    Set(SetArgs),
    /// Fetch a single frame of one kind.
    Read(ReadArgs),
    /// Stream frames until a count is reached or Ctrl-C.
    Stream(StreamArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Connection flags shared by every command that talks to the sensor.
#[derive(Debug, Clone)]
pub struct Connection {
    pub port: Option<String>,
    pub baud: u32,
    pub timeout: String,
}

impl Connection {
    /// Validate the flags without touching the port.
    pub fn config(&self) -> CliResult<SessionConfig> {
        let timeout = parse_duration(&self.timeout)?;
        let config = SessionConfig::default()
            .with_baud_rate(self.baud)
            .with_timeout(timeout);
        config
            .rate_index()
            .map_err(|err| session_error("invalid --baud", err))?;
        Ok(config)
    }

    pub fn open(&self) -> CliResult<Session> {
        let config = self.config()?;
        let port = self.port.as_deref().ok_or_else(|| {
            CliError::new(USAGE, "no serial port given (use --port or KLD7_PORT)")
        })?;
        Session::open(port, config).map_err(|err| session_error("open failed", err))
    }
}

pub fn run(command: Command, connection: &Connection, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ports => ports::run(format),
        Command::Params => params::run(connection, format),
        Command::Set(args) => set::run(args, connection, format),
        Command::Read(args) => read::run(args, connection, format),
        Command::Stream(args) => stream::run(args, connection, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Parameter name (e.g. HOLD, RRAI).
    pub name: String,
    /// New value. Negative values are allowed for signed parameters.
    #[arg(allow_negative_numbers = true)]
    pub value: i32,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Frame kind: radc, rfft, pdat, tdat, ddat or done.
    pub kind: FrameKind,
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Frame kinds to request each cycle (comma-separated, e.g. pdat,tdat,done).
    #[arg(long, default_value = "tdat")]
    pub kinds: FrameKinds,
    /// Stop after N cycles.
    #[arg(long)]
    pub count: Option<u64>,
    /// Minimum time between cycle starts (e.g. 100ms, 1s).
    #[arg(long)]
    pub interval: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "ms")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(baud: u32, timeout: &str) -> Connection {
        Connection {
            port: None,
            baud,
            timeout: timeout.to_string(),
        }
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("300").unwrap(), Duration::from_millis(300));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn config_rejects_unsupported_baud() {
        let err = connection(9600, "200ms").config().unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn open_without_port_is_usage_error() {
        let err = connection(115_200, "200ms").open().unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn config_carries_flags() {
        let config = connection(2_000_000, "1s").config().unwrap();
        assert_eq!(config.baud_rate, 2_000_000);
        assert_eq!(config.timeout, Duration::from_secs(1));
    }
}
