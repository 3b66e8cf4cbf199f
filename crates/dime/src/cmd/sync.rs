use crate::cmd::{finish, Connection, SyncArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_variables, OutputFormat};

pub fn run(args: SyncArgs, connection: &Connection, format: OutputFormat) -> CliResult<i32> {
    let client = connection.open(&args.session)?;
    let vars = client
        .sync(args.limit)
        .map_err(|err| client_error("sync failed", err))?;
    finish(client)?;

    print_variables(&vars, format);
    Ok(SUCCESS)
}
