//! Error types.
//!
//! Ledgerkv distinguishes recoverable negative results (a missing key)
//! from conditions that are fatal to startup (a corrupt or unreadable
//! transaction log) and from live append failures, which stop the writer
//! but leave the in-memory store readable.

use thiserror::Error;

/// Common ledgerkv error conditions.
#[derive(Debug, Error)]
pub enum KvError {
    /// Get on an absent key. A normal negative result, not a failure.
    #[error("no such key")]
    KeyNotFound,

    /// The caller supplied a key the store does not accept.
    #[error("invalid key: {message}")]
    InvalidKey { message: String },

    /// Replay read a sequence number that does not strictly increase.
    ///
    /// This guards against truncated, reordered, or hand-edited log
    /// files and is fatal to startup.
    #[error("transaction numbers out of sequence: last {last}, found {found}")]
    OutOfSequence { last: u64, found: u64 },

    /// Replay read a record it could not parse. Fatal to startup.
    #[error("malformed log record at line {line}: {message}")]
    MalformedRecord { line: u64, message: String },

    /// The append loop has terminated after a write failure.
    ///
    /// Carries the failure that stopped it. Further writes are refused;
    /// reads keep serving from memory.
    #[error("transaction log writer stopped: {message}")]
    WriterClosed { message: String },

    /// I/O failure opening, reading, or writing the log file.
    #[error("transaction log I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KvError {
    /// Create an InvalidKey error.
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Create a MalformedRecord error.
    pub fn malformed(line: u64, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            message: message.into(),
        }
    }

    /// Check if this error indicates on-disk log corruption.
    ///
    /// Corruption is never retried; it aborts startup.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::OutOfSequence { .. } | Self::MalformedRecord { .. }
        )
    }
}

/// Result type using KvError.
pub type KvResult<T> = Result<T, KvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corruption_classification() {
        assert!(KvError::OutOfSequence { last: 3, found: 2 }.is_corruption());
        assert!(KvError::malformed(7, "too few fields").is_corruption());
        assert!(!KvError::KeyNotFound.is_corruption());
        assert!(!KvError::WriterClosed {
            message: "disk full".into()
        }
        .is_corruption());
    }

    #[test]
    fn test_display_matches_wire_taxonomy() {
        let err = KvError::OutOfSequence { last: 5, found: 5 };
        assert_eq!(
            err.to_string(),
            "transaction numbers out of sequence: last 5, found 5"
        );
        assert_eq!(KvError::KeyNotFound.to_string(), "no such key");
    }
}
