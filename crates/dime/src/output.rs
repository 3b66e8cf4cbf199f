use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use dime_value::Value;
use serde::Serialize;
use serde_json::{Map, Value as Json};

use crate::json::{summary, to_json};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct DevicesOutput<'a> {
    devices: &'a [String],
}

#[derive(Serialize)]
struct WaitOutput {
    ready: bool,
    n: Option<i64>,
}

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn print_json<T: Serialize>(out: &T) {
    println!(
        "{}",
        serde_json::to_string(out).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_devices(devices: &[String], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&DevicesOutput { devices }),
        OutputFormat::Table => {
            let mut table = table(vec!["DEVICE"]);
            for device in devices {
                table.add_row(vec![device.as_str()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for device in devices {
                println!("{device}");
            }
        }
    }
}

/// Print variables in arrival order.
pub fn print_variables(vars: &[(String, Value)], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Map<String, Json> = vars
                .iter()
                .map(|(name, value)| (name.clone(), to_json(value)))
                .collect();
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = table(vec!["NAME", "TYPE", "VALUE"]);
            for (name, value) in vars {
                table.add_row(vec![name.clone(), value.kind().to_string(), summary(value)]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (name, value) in vars {
                println!("{name} = {}", to_json(value));
            }
        }
    }
}

pub fn print_wait(n: Option<i64>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&WaitOutput { ready: true, n }),
        OutputFormat::Table | OutputFormat::Pretty => match n {
            Some(n) => println!("{n} variable(s) queued"),
            None => println!("variables queued"),
        },
    }
}
