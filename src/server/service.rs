//! Service facade over the store and the transaction log.
//!
//! Translates boundary operations into store and logger calls. Writes
//! go through the log first, then the in-memory map (write-ahead
//! ordering). The two are not transactionally coupled: a crash between
//! the enqueue and the durable append can lose the acknowledged write.
//! This window is a known limitation of the design.

use crate::core::config::Config;
use crate::core::error::{KvError, KvResult};
use crate::store::KeyValueStore;
use crate::tlog::log::{TransactionLogHandle, TransactionLogWriter, WriteFailure};
use crate::tlog::recovery::{RecoveryCoordinator, RecoveryReport};
use std::sync::Arc;
use tokio::sync::watch;

/// Live key-value service: recovered store plus appending log writer.
///
/// Cheap to clone; clones share the store and the log queue. The
/// draining [`TransactionLogHandle`] stays with whoever called
/// [`initialize`](Self::initialize), so shutdown can always flush the
/// queue no matter how many service clones are still alive.
#[derive(Debug, Clone)]
pub struct KvService {
    store: Arc<KeyValueStore>,
    log: TransactionLogWriter,
}

impl KvService {
    /// Perform the full recovery sequence and go live.
    ///
    /// Replays the configured log into a fresh store before any request
    /// can be accepted. Open and replay failures are fatal; the caller
    /// must not serve. The returned handle owns the append path and is
    /// the shutdown drain.
    pub fn initialize(
        config: &Config,
    ) -> KvResult<(Self, TransactionLogHandle, RecoveryReport)> {
        let store = Arc::new(KeyValueStore::new());
        let mut coordinator = RecoveryCoordinator::new(
            &config.log.path,
            config.log.queue_capacity,
            config.log.fsync,
        );
        let (log, report) = coordinator.recover(&store)?;
        let service = Self {
            store,
            log: log.writer(),
        };
        Ok((service, log, report))
    }

    /// Assemble a service from already-recovered parts.
    pub fn new(store: Arc<KeyValueStore>, log: TransactionLogWriter) -> Self {
        Self { store, log }
    }

    /// Write-through put: log the intent, then apply it in memory.
    pub async fn put(&self, key: &str, value: Vec<u8>) -> KvResult<()> {
        validate_key(key)?;
        self.log.write_put(key, value.clone()).await?;
        self.store.put(key, value);
        Ok(())
    }

    /// Current value for a key.
    ///
    /// Reads are served from memory and keep working even after the
    /// append loop has stopped.
    pub fn get(&self, key: &str) -> KvResult<Vec<u8>> {
        validate_key(key)?;
        self.store.get(key)
    }

    /// Write-through delete. Deleting an absent key succeeds.
    pub async fn delete(&self, key: &str) -> KvResult<()> {
        validate_key(key)?;
        self.log.write_delete(key).await?;
        self.store.delete(key);
        Ok(())
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<KeyValueStore> {
        &self.store
    }

    /// Watch channel carrying the append loop's terminal failure.
    pub fn log_errors(&self) -> watch::Receiver<Option<WriteFailure>> {
        self.log.subscribe_errors()
    }
}

fn validate_key(key: &str) -> KvResult<()> {
    if key.is_empty() {
        return Err(KvError::invalid_key("key must not be empty"));
    }
    Ok(())
}
