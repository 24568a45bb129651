//! Ledgerkv - unified CLI entrypoint.
//!
//! Usage:
//!   ledgerkv start --config config/ledgerkv.toml
//!   ledgerkv config validate --config config/ledgerkv.toml
//!   ledgerkv inspect data/transactions.log

use anyhow::Result;
use clap::Parser;
use ledgerkv::cli::commands::{run_config, run_inspect, run_start};
use ledgerkv::cli::{Cli, Commands};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine config path - use global --config or default
    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config/ledgerkv.toml"));

    match cli.command {
        Commands::Start(_args) => run_start(&config_path).await,
        Commands::Config(args) => run_config(args, &config_path),
        Commands::Inspect(args) => run_inspect(args),
    }
}
