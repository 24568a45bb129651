//! Inspect command implementation.
//!
//! Dumps a transaction log's events using the same replay path as
//! recovery, so a log that fails here would also fail startup.

use crate::tlog::log::FileTransactionLog;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Inspect a transaction log file.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Transaction log path.
    pub path: PathBuf,
}

/// Run the inspect command.
pub fn run_inspect(args: InspectArgs) -> Result<()> {
    let mut log = FileTransactionLog::open(&args.path)
        .with_context(|| format!("failed to open {}", args.path.display()))?;

    let mut count = 0u64;
    for item in log.replay().context("failed to start replay")? {
        let event = item.with_context(|| format!("log corrupt after {count} events"))?;
        println!(
            "{:>8}  {:<6}  {}  {}",
            event.sequence,
            event.kind.to_string(),
            event.key,
            String::from_utf8_lossy(&event.value)
        );
        count += 1;
    }
    println!("{count} events, last sequence {}", log.last_sequence());
    Ok(())
}
