//! Ledgerkv - HTTP key-value store backed by a replayable transaction log.
//!
//! Every mutation is recorded in an append-only transaction log before it
//! becomes visible in the in-memory store. On startup the log is replayed
//! in order to reconstruct the store, then the logger switches to live
//! append mode and the HTTP listener starts accepting traffic.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 HTTP Adapter                    │
//! │          PUT / GET / DELETE  /v1/{key}          │
//! └────────────────────────┬────────────────────────┘
//!                          │
//! ┌────────────────────────▼────────────────────────┐
//! │                  KvService                      │
//! │        (write-through: log, then apply)         │
//! └───────────┬─────────────────────────┬───────────┘
//!             │                         │
//! ┌───────────▼───────────┐ ┌───────────▼───────────┐
//! │    TransactionLog     │ │     KeyValueStore     │
//! │ (bounded queue, one   │ │  (RwLock'd hash map)  │
//! │  writer task)         │ │                       │
//! └───────────┬───────────┘ └───────────▲───────────┘
//!             │       startup replay    │
//!             └─────────────────────────┘
//! ```
//!
//! # Key Invariants
//!
//! - **SEQ-MONOTONE**: sequence numbers are strictly increasing; a
//!   non-increasing sequence on read-back means the log is corrupt.
//! - **LOG-FIRST**: a mutation is handed to the logger before it is
//!   applied to the in-memory map.
//! - **REPLAY-BEFORE-APPEND**: the replay pass completes (or fails the
//!   whole startup) before live appends begin; the two paths can never
//!   run concurrently against the same sequence counter.
//! - **FAIL-STOP**: a write failure terminates the append loop; nothing
//!   is persisted after it and further writes are refused, while reads
//!   keep serving from memory.

// Core infrastructure
pub mod core;

// In-memory key-value store
pub mod store;

// Transaction log: append path, replay path, recovery
pub mod tlog;

// HTTP adapter and service facade
pub mod server;

// CLI
pub mod cli;

// Re-exports for convenience
pub use self::core::config::Config;
pub use self::core::error::{KvError, KvResult};
pub use server::service::KvService;
pub use store::KeyValueStore;
pub use tlog::event::{Event, EventKind};
pub use tlog::log::{FileTransactionLog, TransactionLogHandle, TransactionLogWriter};
pub use tlog::recovery::{RecoveryCoordinator, RecoveryPhase, RecoveryReport};
