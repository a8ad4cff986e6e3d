//! pmsheet CLI - Preventive-maintenance report generator
//!
//! Splits a master PM schedule spreadsheet into per-location template
//! reports plus a model summary.

use std::process::ExitCode;

use clap::Parser;
use pmsheet_cli::cli::Cli;
use pmsheet_cli::{commands, logging};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
