use kld7_session::{StopHandle, StreamOptions};
use tracing::info;

use crate::cmd::{parse_duration, Connection, StreamArgs};
use crate::exit::{session_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: StreamArgs, connection: &Connection, format: OutputFormat) -> CliResult<i32> {
    if args.kinds.is_empty() {
        return Err(CliError::new(USAGE, "--kinds must name at least one frame kind"));
    }
    let options = StreamOptions {
        max_count: args.count,
        min_interval: args.interval.as_deref().map(parse_duration).transpose()?,
    };

    let mut session = connection.open()?;
    let mut stream = session
        .stream(args.kinds, options)
        .map_err(|err| session_error("stream failed", err))?;
    // Starting the stream clears the stop flag, so hook Ctrl-C up afterwards.
    install_ctrlc_handler(stream.stop_handle())?;
    let mut frames = 0u64;
    while let Some(item) = stream.next() {
        let frame = item.map_err(|err| session_error("stream failed", err))?;
        print_frame(stream.cycles(), &frame, format);
        frames += 1;
    }
    info!(cycles = stream.cycles(), frames, "stream ended");

    Ok(SUCCESS)
}

fn install_ctrlc_handler(stop: StopHandle) -> CliResult<()> {
    ctrlc::set_handler(move || stop.stop())
        .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
