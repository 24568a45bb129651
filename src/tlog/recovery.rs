//! Startup recovery: replay the log into the store, then go live.
//!
//! The coordinator exists only during startup. It walks the phases
//! `Opening -> Replaying -> Live`, or `Failed` if the log cannot be
//! opened or is corrupt. A corrupted log is fatal: no partially
//! recovered state is ever served, because the process aborts before
//! the listener starts.

use crate::core::error::KvResult;
use crate::store::KeyValueStore;
use crate::tlog::event::EventKind;
use crate::tlog::log::{FileTransactionLog, TransactionLogHandle};
use std::path::PathBuf;

/// Recovery phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPhase {
    /// Opening or creating the log file.
    Opening,
    /// Replaying logged events into the store.
    Replaying,
    /// Replay complete; the append loop is running.
    Live,
    /// Open or replay failed; startup must abort.
    Failed,
}

/// What recovery found in the log.
#[derive(Debug, Clone, Copy)]
pub struct RecoveryReport {
    /// Number of events replayed into the store.
    pub events_replayed: u64,
    /// Highest sequence number in the log; live appends continue from
    /// here.
    pub last_sequence: u64,
}

/// Drives the startup sequence for one transaction log.
#[derive(Debug)]
pub struct RecoveryCoordinator {
    log_path: PathBuf,
    queue_capacity: usize,
    fsync: bool,
    phase: RecoveryPhase,
}

impl RecoveryCoordinator {
    /// Create a coordinator for the given log file.
    pub fn new(log_path: impl Into<PathBuf>, queue_capacity: usize, fsync: bool) -> Self {
        Self {
            log_path: log_path.into(),
            queue_capacity,
            fsync,
            phase: RecoveryPhase::Opening,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> RecoveryPhase {
        self.phase
    }

    /// Run the full recovery sequence.
    ///
    /// Opens the log, applies every replayed event to `store` in log
    /// order, then starts the live append path. Any open or replay
    /// error leaves the coordinator in `Failed` and is returned; the
    /// caller must abort startup rather than serve partial state.
    pub fn recover(
        &mut self,
        store: &KeyValueStore,
    ) -> KvResult<(TransactionLogHandle, RecoveryReport)> {
        self.phase = RecoveryPhase::Opening;
        let mut log = match FileTransactionLog::open(&self.log_path) {
            Ok(log) => log,
            Err(e) => {
                self.phase = RecoveryPhase::Failed;
                return Err(e);
            }
        };
        tracing::debug!(path = %self.log_path.display(), "transaction log opened");

        self.phase = RecoveryPhase::Replaying;
        let mut events_replayed = 0u64;
        match log.replay() {
            Ok(replay) => {
                for item in replay {
                    let event = match item {
                        Ok(event) => event,
                        Err(e) => {
                            self.phase = RecoveryPhase::Failed;
                            return Err(e);
                        }
                    };
                    match event.kind {
                        EventKind::Put => store.put(event.key, event.value),
                        EventKind::Delete => store.delete(&event.key),
                    }
                    events_replayed += 1;
                }
            }
            Err(e) => {
                self.phase = RecoveryPhase::Failed;
                return Err(e);
            }
        }

        let report = RecoveryReport {
            events_replayed,
            last_sequence: log.last_sequence(),
        };
        tracing::info!(
            events = report.events_replayed,
            last_sequence = report.last_sequence,
            keys = store.len(),
            "transaction log replayed"
        );

        self.phase = RecoveryPhase::Live;
        let handle = log.into_writer(self.queue_capacity, self.fsync);
        Ok((handle, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::KvError;

    #[tokio::test]
    async fn test_recover_fresh_log_leaves_store_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyValueStore::new();
        let mut coordinator = RecoveryCoordinator::new(dir.path().join("tx.log"), 16, false);

        let (handle, report) = coordinator.recover(&store).unwrap();
        assert_eq!(coordinator.phase(), RecoveryPhase::Live);
        assert_eq!(report.events_replayed, 0);
        assert_eq!(report.last_sequence, 0);
        assert!(store.is_empty());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_recover_applies_events_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tx.log");
        std::fs::write(&path, "1\t2\ta\t1\n2\t2\ta\t2\n3\t2\tb\t9\n4\t1\tb\t\n").unwrap();

        let store = KeyValueStore::new();
        let mut coordinator = RecoveryCoordinator::new(&path, 16, false);
        let (handle, report) = coordinator.recover(&store).unwrap();

        assert_eq!(report.events_replayed, 4);
        assert_eq!(report.last_sequence, 4);
        assert_eq!(store.get("a").unwrap(), b"2");
        assert!(matches!(store.get("b"), Err(KvError::KeyNotFound)));
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_recover_fails_on_out_of_sequence_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tx.log");
        std::fs::write(&path, "1\t2\ta\t1\n2\t2\tb\t2\n2\t2\tc\t3\n").unwrap();

        let store = KeyValueStore::new();
        let mut coordinator = RecoveryCoordinator::new(&path, 16, false);
        let err = coordinator.recover(&store).unwrap_err();

        assert!(matches!(err, KvError::OutOfSequence { last: 2, found: 2 }));
        assert_eq!(coordinator.phase(), RecoveryPhase::Failed);
    }

    #[tokio::test]
    async fn test_recover_fails_on_unparsable_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tx.log");
        std::fs::write(&path, "garbage\n").unwrap();

        let store = KeyValueStore::new();
        let mut coordinator = RecoveryCoordinator::new(&path, 16, false);
        let err = coordinator.recover(&store).unwrap_err();

        assert!(err.is_corruption());
        assert_eq!(coordinator.phase(), RecoveryPhase::Failed);
    }
}
