//! Start command implementation.

use crate::core::config::Config;
use crate::server;
use crate::server::service::KvService;
use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;

/// Start the ledgerkv server.
#[derive(Args, Debug)]
pub struct StartArgs {
    // No additional arguments - config is handled globally
}

fn init_tracing(default_level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Run the start command with the given config path.
///
/// A missing config file is not an error; defaults apply.
pub async fn run_start(config_path: &Path) -> Result<()> {
    let config = if config_path.exists() {
        Config::from_file(config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))?
    } else {
        Config::default()
    };
    init_tracing(&config.telemetry.log_level);
    if !config_path.exists() {
        tracing::info!(path = %config_path.display(), "no config file; using defaults");
    }

    // Full recovery before the listener opens: no request is accepted
    // until every logged event is applied. The log handle stays here so
    // the drain at the end does not depend on the service's refcount.
    let (service, log, _report) = KvService::initialize(&config)
        .with_context(|| format!("recovery failed for {}", config.log.path.display()))?;

    // Observe the append path's terminal failure. Writes are already
    // refused once the writer stops; this makes the failure visible.
    let mut log_errors = service.log_errors();
    tokio::spawn(async move {
        if let Ok(failure) = log_errors.wait_for(|failure| failure.is_some()).await {
            if let Some(failure) = failure.as_ref() {
                tracing::error!(
                    sequence = failure.sequence,
                    error = %failure.message,
                    "transaction log writer failed; refusing further writes"
                );
            }
        }
    });

    server::serve(service, &config.server.bind, shutdown_signal()).await?;

    // Listener is down; drain whatever is still queued for the log.
    let last_sequence = log.shutdown().await?;
    tracing::info!(last_sequence, "transaction log drained; shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown signal handler");
        return;
    }
    tracing::info!("shutdown signal received");
}
