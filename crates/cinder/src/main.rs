//! cinder - Ephemeral self-destructing secret vault
//!
//! "The safest place for a secret is one that stops existing."
//!
//! Cinder opens a session with a freshly derived key and an isolated
//! storage area, watches a set of threat sensors, and incinerates the
//! whole thing the moment the aggregated threat level crosses the
//! threshold, the dead-man's switch expires, or the operator panics.

mod cli;
mod console;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Logs go to stderr so the operator console keeps stdout
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async { run_command(cli.command).await })
}

async fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            config,
            threshold,
            interval_ms,
            timeout_secs,
            watch,
        } => cli::cmd_run(config, threshold, interval_ms, timeout_secs, watch).await,
        Commands::Init { path } => cli::cmd_init(path),
    }
}
