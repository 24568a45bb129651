//! Command-line interface.
//!
//! Unified CLI for ledgerkv operations.

pub mod commands;

use clap::{Parser, Subcommand};

/// Ledgerkv - HTTP key-value store backed by a replayable transaction log.
#[derive(Parser, Debug)]
#[command(name = "ledgerkv")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path.
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the ledgerkv server.
    Start(commands::StartArgs),
    /// Configuration operations.
    Config(commands::ConfigArgs),
    /// Inspect a transaction log file.
    Inspect(commands::InspectArgs),
}
