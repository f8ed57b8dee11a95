use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use clientes_lake::config::Config;
use clientes_lake::error::exit;
use clientes_lake::exporter::{self, RunSummary};
use clientes_lake::logging;

/// Validates the customer batches and stages them for upload to HDFS.
#[derive(Parser, Debug)]
#[command(name = "procesar-clientes", version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the validated files are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(args) {
        Ok(summary) if summary.all_exported() => ExitCode::from(exit::SUCCESS),
        Ok(_) => ExitCode::from(exit::BATCH_SKIPPED),
        Err(e) => {
            println!("Error during processing: {e:#}");
            ExitCode::from(exit::FATAL)
        }
    }
}

fn run(args: Args) -> Result<RunSummary> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(dir) = args.output_dir {
        config.exporter.output_dir = dir;
    }
    Ok(exporter::run(&config.exporter))
}
