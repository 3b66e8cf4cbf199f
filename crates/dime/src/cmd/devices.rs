use crate::cmd::{finish, Connection, DevicesArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_devices, OutputFormat};

pub fn run(args: DevicesArgs, connection: &Connection, format: OutputFormat) -> CliResult<i32> {
    let client = connection.open(&args.session)?;
    let devices = client
        .devices()
        .map_err(|err| client_error("devices failed", err))?;
    finish(client)?;

    print_devices(&devices, format);
    Ok(SUCCESS)
}
