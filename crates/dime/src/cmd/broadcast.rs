use tracing::info;

use crate::cmd::{finish, BroadcastArgs, Connection};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::json::parse_assignment;

pub fn run(args: BroadcastArgs, connection: &Connection) -> CliResult<i32> {
    let vars = args
        .vars
        .iter()
        .map(|raw| parse_assignment(raw))
        .collect::<CliResult<Vec<_>>>()?;

    let client = connection.open(&args.session)?;
    client
        .broadcast_map(vars.iter().map(|(name, value)| (name, value)))
        .map_err(|err| client_error("broadcast failed", err))?;
    finish(client)?;

    info!(count = vars.len(), "variables broadcast");
    Ok(SUCCESS)
}
