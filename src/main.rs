use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Result;
use batch_runner::{AppOptions, Catalog, DEFAULT_CONFIG_PATH, Outcome, setup_logging};
use clap::Parser;
use clap::error::ErrorKind;

const EXIT_DECLINED: i32 = -6;

/// Runs a configured task over an input file in parallel batches.
#[derive(Debug, Parser)]
#[command(name = "batch-runner", version)]
struct Cli {
    /// Configuration properties file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Prompt to confirm the task settings before executing
    #[arg(short, long, default_value_t = true, action = clap::ArgAction::Set)]
    prompt: bool,

    /// Also write the counters and aggregators as CSV files
    #[arg(long)]
    csv: bool,

    /// Overrides a configuration property, e.g. -D runner.task.threads=8
    #[arg(short = 'D', long = "define", value_name = "KEY=VALUE", value_parser = parse_define)]
    defines: Vec<(String, String)>,
}

fn main() -> Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print()?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => {
            e.print()?;
            return Ok(exit_code(EXIT_DECLINED));
        }
    };

    setup_logging()?;

    let options = AppOptions {
        config_path: cli.config,
        prompt: cli.prompt,
        csv: cli.csv,
        defines: cli.defines,
        output_dir: None,
    };

    let started = Instant::now();
    match batch_runner::run(&options, &Catalog::with_builtins()) {
        Ok(Outcome::Completed(_)) => {
            let secs = started.elapsed().as_secs();
            tracing::info!("Task took {} minutes and {} seconds to finish.", secs / 60, secs % 60);
            Ok(ExitCode::SUCCESS)
        }
        Ok(Outcome::Declined) => Ok(exit_code(EXIT_DECLINED)),
        Err(e) => {
            tracing::error!("{e}");
            Ok(exit_code(e.exit_code()))
        }
    }
}

// Negative codes surface as their two's complement byte, e.g. -6 becomes 250.
fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(code as u8)
}

fn parse_define(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}
