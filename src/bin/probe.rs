use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use clientes_lake::config::Config;
use clientes_lake::error::exit;
use clientes_lake::logging;
use clientes_lake::probe::{self, ProbeReport};

/// Checks that the warehouse is reachable and its sample tables answer.
#[derive(Parser, Debug)]
#[command(name = "probe", version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Warehouse root directory
    #[arg(short, long)]
    warehouse: Option<PathBuf>,

    /// Schema to switch to before running the queries
    #[arg(short, long)]
    schema: Option<String>,

    /// Also print the report as JSON
    #[arg(long)]
    json: bool,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(args) {
        Ok(report) if report.failed() == 0 => ExitCode::from(exit::SUCCESS),
        Ok(_) => ExitCode::from(exit::QUERY_FAILED),
        Err(e) => {
            println!("Probe failed: {e:#}");
            ExitCode::from(exit::FATAL)
        }
    }
}

fn run(args: Args) -> Result<ProbeReport> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(root) = args.warehouse {
        config.warehouse.root = root;
    }
    if let Some(schema) = args.schema {
        config.warehouse.schema = schema;
    }

    let report = probe::run(&config.warehouse)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(report)
}
