mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::{Command, Connection};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "kld7", version, about = "K-LD7 radar sensor CLI")]
struct Cli {
    /// Serial port the sensor is attached to.
    #[arg(long, short = 'p', env = "KLD7_PORT", global = true)]
    port: Option<String>,

    /// Line rate to negotiate with the sensor.
    #[arg(long, value_name = "RATE", default_value_t = 115_200, global = true)]
    baud: u32,

    /// Per-read timeout (e.g. 200ms, 1s).
    #[arg(long, value_name = "DURATION", default_value = "200ms", global = true)]
    timeout: String,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let connection = Connection {
        port: cli.port,
        baud: cli.baud,
        timeout: cli.timeout,
    };
    let result = cmd::run(cli.command, &connection, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
