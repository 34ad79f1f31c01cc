use crate::cmd::{Connection, ReadArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: ReadArgs, connection: &Connection, format: OutputFormat) -> CliResult<i32> {
    let mut session = connection.open()?;
    let frame = session
        .read_frame(args.kind)
        .map_err(|err| session_error("read failed", err))?;
    print_frame(1, &frame, format);
    Ok(SUCCESS)
}
