//! In-memory key-value store.
//!
//! The store is the only shared mutable state in the core. All access
//! goes through this type; the map itself is never exposed. Readers
//! proceed concurrently, a writer excludes everyone else for the
//! duration of its mutation.

use crate::core::error::{KvError, KvResult};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Concurrent map from key to value.
///
/// Point lookups only; no iteration or snapshot operation is exposed.
/// Absence of a key is a valid state, distinct from a present key with
/// an empty value.
#[derive(Debug, Default)]
pub struct KeyValueStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl KeyValueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an entry.
    ///
    /// Visible to subsequent gets and deletes by any caller once this
    /// returns.
    pub fn put(&self, key: impl Into<String>, value: Vec<u8>) {
        self.entries.write().insert(key.into(), value);
    }

    /// Get the current value for a key.
    pub fn get(&self, key: &str) -> KvResult<Vec<u8>> {
        self.entries
            .read()
            .get(key)
            .cloned()
            .ok_or(KvError::KeyNotFound)
    }

    /// Remove an entry if present. Removing an absent key is a no-op.
    pub fn delete(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Check whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of entries currently in the store.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
