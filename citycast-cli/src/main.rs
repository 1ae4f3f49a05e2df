//! Binary crate for the `citycast` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Reading the city list and the API key interactively
//! - Logger setup and exit codes

use clap::Parser;

mod cli;
mod logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    logging::setup_logger(logging::log_level(cmd.level.as_deref()))
        .map_err(|e| anyhow::anyhow!("Failed to install logger: {e}"))?;
    cmd.run().await
}
