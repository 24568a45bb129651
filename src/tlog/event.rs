//! Log event definitions and the wire record codec.

use crate::core::error::{KvError, KvResult};

/// Kind of a logged mutation.
///
/// The wire codes are part of the on-disk format: 1 = Delete, 2 = Put.
/// Code 0 is reserved and must never appear in a log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Key deletion.
    Delete,
    /// Key-value write.
    Put,
}

impl EventKind {
    /// Wire code for this kind.
    pub fn code(self) -> u8 {
        match self {
            Self::Delete => 1,
            Self::Put => 2,
        }
    }

    /// Decode a wire code. Returns None for reserved or unknown codes.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Delete),
            2 => Some(Self::Put),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delete => write!(f, "delete"),
            Self::Put => write!(f, "put"),
        }
    }
}

/// A mutation not yet assigned a sequence number.
///
/// This is what producers enqueue; the writer task assigns the sequence
/// when it appends.
#[derive(Debug, Clone)]
pub struct Mutation {
    /// Kind of mutation.
    pub kind: EventKind,
    /// Affected key.
    pub key: String,
    /// Value for Put; empty for Delete.
    pub value: Vec<u8>,
}

impl Mutation {
    /// Create a Put mutation.
    pub fn put(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            kind: EventKind::Put,
            key: key.into(),
            value,
        }
    }

    /// Create a Delete mutation.
    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Delete,
            key: key.into(),
            value: Vec::new(),
        }
    }
}

/// An immutable record of one mutation, as written to the log.
///
/// Created exactly once per logged mutation and never modified after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Sequence number: starts at 1, never reused, never decreases.
    pub sequence: u64,
    /// Kind of mutation.
    pub kind: EventKind,
    /// Affected key.
    pub key: String,
    /// Value for Put; empty for Delete.
    pub value: Vec<u8>,
}

impl Event {
    /// Assign a sequence number to a mutation.
    pub fn from_mutation(sequence: u64, mutation: Mutation) -> Self {
        Self {
            sequence,
            kind: mutation.kind,
            key: mutation.key,
            value: mutation.value,
        }
    }

    /// Encode this event as one log line, trailing newline included.
    ///
    /// Key and value fields are escaped so the record stays one line
    /// with exactly three tabs regardless of their contents.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(24 + self.key.len() + self.value.len());
        buf.extend_from_slice(self.sequence.to_string().as_bytes());
        buf.push(b'\t');
        buf.extend_from_slice(self.kind.code().to_string().as_bytes());
        buf.push(b'\t');
        escape_into(self.key.as_bytes(), &mut buf);
        buf.push(b'\t');
        escape_into(&self.value, &mut buf);
        buf.push(b'\n');
        buf
    }

    /// Decode one log line (without its trailing newline).
    ///
    /// `line` is the 1-based position in the file, used only for error
    /// reporting.
    pub fn decode(record: &[u8], line: u64) -> KvResult<Self> {
        let fields: Vec<&[u8]> = record.split(|&b| b == b'\t').collect();
        if fields.len() != 4 {
            return Err(KvError::malformed(
                line,
                format!("expected 4 fields, found {}", fields.len()),
            ));
        }

        let sequence = std::str::from_utf8(fields[0])
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| KvError::malformed(line, "unparsable sequence number"))?;
        if sequence == 0 {
            return Err(KvError::malformed(line, "sequence number zero is reserved"));
        }

        let code = std::str::from_utf8(fields[1])
            .ok()
            .and_then(|s| s.parse::<u8>().ok())
            .ok_or_else(|| KvError::malformed(line, "unparsable event kind"))?;
        let kind = EventKind::from_code(code)
            .ok_or_else(|| KvError::malformed(line, format!("unknown event kind {code}")))?;

        let key_bytes = unescape(fields[2])
            .ok_or_else(|| KvError::malformed(line, "bad escape in key field"))?;
        let key = String::from_utf8(key_bytes)
            .map_err(|_| KvError::malformed(line, "key is not valid UTF-8"))?;
        if key.is_empty() {
            return Err(KvError::malformed(line, "empty key"));
        }

        let value = unescape(fields[3])
            .ok_or_else(|| KvError::malformed(line, "bad escape in value field"))?;

        Ok(Self {
            sequence,
            kind,
            key,
            value,
        })
    }
}

/// Escape `\`, tab, and newline so a field cannot break line framing.
fn escape_into(raw: &[u8], buf: &mut Vec<u8>) {
    for &b in raw {
        match b {
            b'\\' => buf.extend_from_slice(b"\\\\"),
            b'\t' => buf.extend_from_slice(b"\\t"),
            b'\n' => buf.extend_from_slice(b"\\n"),
            other => buf.push(other),
        }
    }
}

/// Reverse of [`escape_into`]. Returns None on a dangling or unknown
/// escape.
fn unescape(field: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(field.len());
    let mut iter = field.iter();
    while let Some(&b) = iter.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        match iter.next()? {
            b'\\' => out.push(b'\\'),
            b't' => out.push(b'\t'),
            b'n' => out.push(b'\n'),
            _ => return None,
        }
    }
    Some(out)
}
