mod cmd;
mod exit;
mod json;
mod logging;
mod output;

use clap::Parser;
use dime_transport::DEFAULT_ADDRESS;

use crate::cmd::{Command, Connection};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "dime", version, about = "DiME pub/sub client")]
struct Cli {
    /// Broker address (ipc://<path>, unix://<path> or tcp://<host>:<port>).
    #[arg(
        long,
        short = 'a',
        env = "DIME_ADDRESS",
        default_value = DEFAULT_ADDRESS,
        global = true
    )]
    address: String,

    /// Read/write timeout for broker traffic (e.g. 5s, 500ms).
    #[arg(long, value_name = "DURATION", global = true)]
    timeout: Option<String>,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let connection = Connection {
        address: cli.address,
        timeout: cli.timeout,
    };
    let result = cmd::run(cli.command, &connection, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
