use std::time::Duration;

use clap::{Args, Subcommand};
use dime_client::{Client, ClientConfig};
use dime_transport::Address;
use tracing::debug;

use crate::exit::{client_error, CliError, CliResult};
use crate::output::OutputFormat;

pub mod broadcast;
pub mod devices;
pub mod send;
pub mod sync;
pub mod version;
pub mod wait;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the groups currently known to the broker.
    Devices(DevicesArgs),
    /// Send variables to every client in a group.
    Send(SendArgs),
    /// Send variables to every other connected client.
    Broadcast(BroadcastArgs),
    /// Fetch queued variables and print them.
    Sync(SyncArgs),
    /// Block until at least one variable is queued.
    Wait(WaitArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, connection: &Connection, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Devices(args) => devices::run(args, connection, format),
        Command::Send(args) => send::run(args, connection),
        Command::Broadcast(args) => broadcast::run(args, connection),
        Command::Sync(args) => sync::run(args, connection, format),
        Command::Wait(args) => wait::run(args, connection, format),
        Command::Version(args) => version::run(args),
    }
}

/// Global connection options shared by every data command.
#[derive(Debug)]
pub struct Connection {
    pub address: String,
    pub timeout: Option<String>,
}

impl Connection {
    /// Connect, handshake and join the requested groups.
    pub fn open(&self, session: &SessionArgs) -> CliResult<Client> {
        let address = Address::parse(&self.address)
            .map_err(|err| client_error("invalid address", err.into()))?;
        let timeout = self.timeout.as_deref().map(parse_duration).transpose()?;
        let config = ClientConfig {
            read_timeout: timeout,
            write_timeout: timeout,
            ..ClientConfig::default()
        };

        let client = Client::connect_with_config(&address, &config)
            .map_err(|err| client_error("connect failed", err))?;
        if !session.join.is_empty() {
            client
                .join(&session.join)
                .map_err(|err| client_error("join failed", err))?;
            debug!(groups = ?session.join, "joined");
        }
        Ok(client)
    }
}

/// Close the session, reporting failures the same way as commands.
pub fn finish(client: Client) -> CliResult<()> {
    client
        .close()
        .map_err(|err| client_error("close failed", err))
}

#[derive(Args, Debug, Default)]
pub struct SessionArgs {
    /// Join this group before running the command (repeatable).
    #[arg(long, value_name = "GROUP")]
    pub join: Vec<String>,
}

#[derive(Args, Debug)]
pub struct DevicesArgs {
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Target group.
    pub group: String,
    /// Variables as <name>=<json>.
    #[arg(required = true, value_name = "NAME=JSON")]
    pub vars: Vec<String>,
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct BroadcastArgs {
    /// Variables as <name>=<json>.
    #[arg(required = true, value_name = "NAME=JSON")]
    pub vars: Vec<String>,
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Fetch at most this many variables.
    #[arg(long, short = 'n')]
    pub limit: Option<u32>,
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct WaitArgs {
    /// Fetch and print the queued variables once the wait returns.
    #[arg(long)]
    pub sync: bool,
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `500ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration: '{input}'")))?;
    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
