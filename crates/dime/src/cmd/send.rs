use tracing::info;

use crate::cmd::{finish, Connection, SendArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::json::parse_assignment;

pub fn run(args: SendArgs, connection: &Connection) -> CliResult<i32> {
    // Parse everything first so a typo sends nothing.
    let vars = args
        .vars
        .iter()
        .map(|raw| parse_assignment(raw))
        .collect::<CliResult<Vec<_>>>()?;

    let client = connection.open(&args.session)?;
    client
        .send_map(&args.group, vars.iter().map(|(name, value)| (name, value)))
        .map_err(|err| client_error("send failed", err))?;
    finish(client)?;

    info!(group = %args.group, count = vars.len(), "variables sent");
    Ok(SUCCESS)
}
