use crate::cmd::{finish, Connection, WaitArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_variables, print_wait, OutputFormat};

pub fn run(args: WaitArgs, connection: &Connection, format: OutputFormat) -> CliResult<i32> {
    let client = connection.open(&args.session)?;
    let n = client
        .wait()
        .map_err(|err| client_error("wait failed", err))?;

    if args.sync {
        let vars = client
            .sync(None)
            .map_err(|err| client_error("sync failed", err))?;
        finish(client)?;
        print_variables(&vars, format);
    } else {
        finish(client)?;
        print_wait(n, format);
    }
    Ok(SUCCESS)
}
