use crate::cmd::Connection;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_params, OutputFormat};

pub fn run(connection: &Connection, format: OutputFormat) -> CliResult<i32> {
    let session = connection.open()?;
    print_params(session.parameters(), format);
    Ok(SUCCESS)
}
