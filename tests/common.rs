//! Common test utilities.
//!
//! Shared helpers for integration tests. Import with `mod common;` in
//! test files.

#![allow(dead_code)]

use ledgerkv::{Config, KvService, RecoveryReport, TransactionLogHandle};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};

/// Create a minimal valid configuration file.
///
/// Rendered through the TOML serializer so the log path survives any
/// characters that would need escaping in a hand-built string.
pub fn create_minimal_config(log_path: &Path) -> NamedTempFile {
    let mut config = Config::default();
    config.server.bind = "127.0.0.1:0".to_string();
    config.log.path = log_path.to_path_buf();
    let rendered = toml::to_string(&config).expect("Failed to render config");

    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(rendered.as_bytes())
        .expect("Failed to write config");
    file
}

/// In-memory config pointing at a log file inside `dir`.
pub fn config_in(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.log.path = dir.path().join("transactions.log");
    config
}

/// Path of the log file used by [`config_in`].
pub fn log_path_in(dir: &TempDir) -> PathBuf {
    dir.path().join("transactions.log")
}

/// Write raw log records, one per line, to the given path.
pub fn write_raw_log(path: &Path, records: &[&str]) {
    let mut contents = String::new();
    for record in records {
        contents.push_str(record);
        contents.push('\n');
    }
    std::fs::write(path, contents).expect("Failed to write log fixture");
}

/// Recover a live service from the log inside `dir`.
pub fn live_service(dir: &TempDir) -> (KvService, TransactionLogHandle, RecoveryReport) {
    KvService::initialize(&config_in(dir)).expect("recovery failed")
}
