use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use relaunch::cli::Cli;
use relaunch::error::DeployError;
use relaunch::retry::CancelToken;
use relaunch::{Pipeline, SystemRunner, output, pipeline};

/// Conventional exit status for a run stopped by SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(&format!("{err:#}"));
            match err.downcast_ref::<DeployError>() {
                Some(DeployError::Cancelled) => ExitCode::from(EXIT_INTERRUPTED),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.into_config();

    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    ctrlc::set_handler(move || on_signal.cancel())
        .context("failed to install Ctrl-C handler")?;

    let runner = SystemRunner;
    let pipeline = Pipeline::new(&config, &runner, cancel);

    if config.dry_run {
        pipeline.dry_run()?;
        return Ok(());
    }

    let report = pipeline.run()?;
    pipeline::print_summary(&report);
    Ok(())
}
