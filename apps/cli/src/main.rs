//! rfdocs CLI: Robot Framework documentation, fetched, indexed and queried
//! locally.
//!
//! Results are printed to stdout as JSON; logs and progress go to stderr.

mod commands;

use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
