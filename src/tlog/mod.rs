//! Transaction log: durable record of every mutation.
//!
//! The log is an append-only file of line records, one event per line:
//!
//! ```text
//! sequence \t kind \t key \t value \n
//! ```
//!
//! `kind` is 1 for Delete and 2 for Put (0 is reserved and never
//! written). Sequence numbers start at 1 and strictly increase; replay
//! treats any non-increasing sequence as corruption and stops.
//!
//! The logger has two modes sharing one sequence counter. Replay mode
//! ([`log::FileTransactionLog`]) reads the file once, front to back.
//! Live mode ([`log::TransactionLogHandle`]) appends through a bounded
//! queue drained by a single writer task. Converting from replay to
//! live mode consumes the replay-mode value, so the two paths can never
//! race on the counter.

pub mod event;
pub mod log;
pub mod recovery;
