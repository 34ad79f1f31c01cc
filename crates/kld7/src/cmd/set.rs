use kld7_frame::params::field_index;
use kld7_frame::PARAM_FIELDS;

use crate::cmd::{Connection, SetArgs};
use crate::exit::{session_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_param, OutputFormat};

pub fn run(args: SetArgs, connection: &Connection, format: OutputFormat) -> CliResult<i32> {
    let field = field_index(&args.name)
        .map(|index| &PARAM_FIELDS[index])
        .ok_or_else(|| CliError::new(USAGE, format!("unknown parameter: {}", args.name)))?;

    let mut session = connection.open()?;
    session
        .set_param(field.name, args.value)
        .map_err(|err| session_error("set failed", err))?;
    let value = session
        .param(field.name)
        .map_err(|err| session_error("set failed", err))?;

    print_param(field, value, format);
    Ok(SUCCESS)
}
