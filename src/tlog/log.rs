//! File-backed transaction logger: replay and append paths.

use crate::core::error::{KvError, KvResult};
use crate::tlog::event::{Event, Mutation};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// A transaction log opened for replay.
///
/// This is the logger's replay-mode state: it owns the file handle and
/// the `last_sequence` counter. Converting to live append mode with
/// [`into_writer`](Self::into_writer) consumes it, so replay and append
/// can never run concurrently against the same counter.
#[derive(Debug)]
pub struct FileTransactionLog {
    path: PathBuf,
    file: File,
    last_sequence: u64,
}

impl FileTransactionLog {
    /// Open or create the log file, creating parent directories.
    pub fn open(path: impl Into<PathBuf>) -> KvResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = std::fs::OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        Ok(Self {
            path,
            file,
            last_sequence: 0,
        })
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last sequence number observed so far.
    ///
    /// Zero before replay; after a full replay, the highest sequence in
    /// the file and the base for live append assignment.
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Replay the log from the start.
    ///
    /// Returns a lazy, single-pass iterator over events in file order.
    /// Each step parses one record, verifies the sequence strictly
    /// increases, and advances `last_sequence`. The iterator is fused
    /// after the first error; a corrupt log yields that error and stops.
    pub fn replay(&mut self) -> KvResult<Replay<'_>> {
        self.file.seek(SeekFrom::Start(0))?;
        let Self {
            file,
            last_sequence,
            ..
        } = self;
        Ok(Replay {
            reader: BufReader::new(&*file),
            last_sequence,
            line: 0,
            done: false,
        })
    }

    /// Switch to live append mode.
    ///
    /// Spawns the single writer task that drains the bounded mutation
    /// queue in submission order, assigns each event the next sequence
    /// number, and appends it to the file. Must only be called after
    /// replay has completed (or on a fresh log).
    pub fn into_writer(self, queue_capacity: usize, fsync: bool) -> TransactionLogHandle {
        let (events_tx, events_rx) = mpsc::channel(queue_capacity.max(1));
        let (failure_tx, failure_rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let writer = BufWriter::new(self.file);
        let task = tokio::spawn(run_writer(
            writer,
            self.last_sequence,
            fsync,
            events_rx,
            failure_tx,
            shutdown_rx,
        ));

        TransactionLogHandle {
            writer: TransactionLogWriter {
                events_tx,
                failure_rx,
            },
            shutdown_tx,
            task,
        }
    }
}

/// Lazy replay iterator. See [`FileTransactionLog::replay`].
pub struct Replay<'a> {
    reader: BufReader<&'a File>,
    last_sequence: &'a mut u64,
    line: u64,
    done: bool,
}

impl Iterator for Replay<'_> {
    type Item = KvResult<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut record = Vec::new();
        match self.reader.read_until(b'\n', &mut record) {
            Ok(0) => {
                self.done = true;
                return None;
            }
            Ok(_) => {}
            Err(e) => {
                self.done = true;
                return Some(Err(e.into()));
            }
        }
        if record.last() == Some(&b'\n') {
            record.pop();
        }
        self.line += 1;

        let event = match Event::decode(&record, self.line) {
            Ok(event) => event,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        // Integrity check: sequence numbers must strictly increase.
        if event.sequence <= *self.last_sequence {
            self.done = true;
            return Some(Err(KvError::OutOfSequence {
                last: *self.last_sequence,
                found: event.sequence,
            }));
        }
        *self.last_sequence = event.sequence;

        Some(Ok(event))
    }
}

/// The failure that stopped the append loop.
#[derive(Debug, Clone)]
pub struct WriteFailure {
    /// Sequence number of the event that failed to persist.
    pub sequence: u64,
    /// Rendered I/O error.
    pub message: String,
}

/// Cloneable write side of a transaction log in live append mode.
///
/// Writes enqueue a mutation on the bounded queue and return without
/// waiting for disk I/O. A write failure terminates the writer task;
/// after that every write fails with [`KvError::WriterClosed`] and the
/// failure is observable on the error channel.
#[derive(Debug, Clone)]
pub struct TransactionLogWriter {
    events_tx: mpsc::Sender<Mutation>,
    failure_rx: watch::Receiver<Option<WriteFailure>>,
}

impl TransactionLogWriter {
    /// Enqueue a Put event for durable append.
    pub async fn write_put(&self, key: impl Into<String>, value: Vec<u8>) -> KvResult<()> {
        self.write(Mutation::put(key, value)).await
    }

    /// Enqueue a Delete event for durable append.
    pub async fn write_delete(&self, key: impl Into<String>) -> KvResult<()> {
        self.write(Mutation::delete(key)).await
    }

    async fn write(&self, mutation: Mutation) -> KvResult<()> {
        self.events_tx
            .send(mutation)
            .await
            .map_err(|_| self.closed_error())
    }

    /// Watch channel carrying the append loop's terminal failure.
    ///
    /// Yields `Some` at most once; the owner should stop accepting
    /// writes when it does.
    pub fn subscribe_errors(&self) -> watch::Receiver<Option<WriteFailure>> {
        self.failure_rx.clone()
    }

    /// The failure that stopped the writer, if it has stopped.
    pub fn last_error(&self) -> Option<WriteFailure> {
        self.failure_rx.borrow().clone()
    }

    fn closed_error(&self) -> KvError {
        let message = self
            .last_error()
            .map(|f| f.message)
            .unwrap_or_else(|| "append loop stopped".to_string());
        KvError::WriterClosed { message }
    }
}

/// Owner of the live append path.
///
/// Holds the writer task. Request-side writers are cheap clones from
/// [`writer`](Self::writer); none of them can keep the queue open, so
/// [`shutdown`](Self::shutdown) always drains and stops the task no
/// matter how many clones are still alive.
#[derive(Debug)]
pub struct TransactionLogHandle {
    writer: TransactionLogWriter,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<KvResult<u64>>,
}

impl TransactionLogHandle {
    /// A cloneable write-side handle.
    pub fn writer(&self) -> TransactionLogWriter {
        self.writer.clone()
    }

    /// Watch channel carrying the append loop's terminal failure.
    pub fn subscribe_errors(&self) -> watch::Receiver<Option<WriteFailure>> {
        self.writer.subscribe_errors()
    }

    /// Drain pending events and stop the writer.
    ///
    /// Closes the queue to new writes, waits for the writer task to
    /// append everything already enqueued, and returns the last
    /// assigned sequence number. Lingering writer clones get
    /// [`KvError::WriterClosed`] on their next write.
    pub async fn shutdown(self) -> KvResult<u64> {
        let _ = self.shutdown_tx.send(true);
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(KvError::WriterClosed {
                message: format!("writer task panicked: {e}"),
            }),
        }
    }
}

/// Single-consumer append loop.
///
/// Fail-stop: the first write error is published on the failure channel
/// and the loop exits without persisting anything further.
async fn run_writer(
    mut writer: BufWriter<File>,
    mut last_sequence: u64,
    fsync: bool,
    mut events_rx: mpsc::Receiver<Mutation>,
    failure_tx: watch::Sender<Option<WriteFailure>>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> KvResult<u64> {
    loop {
        let mutation = tokio::select! {
            biased;
            maybe = events_rx.recv() => match maybe {
                Some(mutation) => mutation,
                None => break,
            },
            _ = shutdown_rx.changed() => {
                // Refuse new enqueues; events already queued still drain.
                events_rx.close();
                continue;
            }
        };
        let event = Event::from_mutation(last_sequence + 1, mutation);

        if let Err(e) = append(&mut writer, &event, fsync) {
            tracing::error!(
                sequence = event.sequence,
                error = %e,
                "transaction log append failed; stopping writer"
            );
            failure_tx.send_replace(Some(WriteFailure {
                sequence: event.sequence,
                message: e.to_string(),
            }));
            return Err(e.into());
        }

        last_sequence = event.sequence;
        tracing::trace!(sequence = event.sequence, kind = %event.kind, "event appended");
    }

    // Queue closed: drained cleanly.
    if let Err(e) = writer.get_ref().sync_data() {
        tracing::warn!(error = %e, "final log sync failed");
    }
    tracing::debug!(last_sequence, "transaction log writer drained");
    Ok(last_sequence)
}

fn append(writer: &mut BufWriter<File>, event: &Event, fsync: bool) -> std::io::Result<()> {
    writer.write_all(&event.encode())?;
    writer.flush()?;
    if fsync {
        writer.get_ref().sync_data()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tlog::event::EventKind;
    use std::io::Write as _;

    fn temp_log_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("transactions.log")
    }

    #[test]
    fn test_open_creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dirs/tx.log");
        let log = FileTransactionLog::open(&path).unwrap();
        assert_eq!(log.last_sequence(), 0);
        assert!(path.exists());
    }

    #[test]
    fn test_replay_empty_log_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = FileTransactionLog::open(temp_log_path(&dir)).unwrap();
        assert!(log.replay().unwrap().next().is_none());
        assert_eq!(log.last_sequence(), 0);
    }

    #[test]
    fn test_replay_reads_events_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_log_path(&dir);
        std::fs::write(&path, "1\t2\ta\t1\n2\t2\tb\t2\n3\t1\ta\t\n").unwrap();

        let mut log = FileTransactionLog::open(&path).unwrap();
        let events: Vec<Event> = log.replay().unwrap().map(|e| e.unwrap()).collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].key, "a");
        assert_eq!(events[1].value, b"2");
        assert_eq!(events[2].kind, EventKind::Delete);
        assert_eq!(log.last_sequence(), 3);
    }

    #[test]
    fn test_replay_stops_on_repeated_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_log_path(&dir);
        std::fs::write(&path, "1\t2\ta\t1\n2\t2\tb\t2\n2\t2\tc\t3\n").unwrap();

        let mut log = FileTransactionLog::open(&path).unwrap();
        let mut replay = log.replay().unwrap();
        assert!(replay.next().unwrap().is_ok());
        assert!(replay.next().unwrap().is_ok());
        let err = replay.next().unwrap().unwrap_err();
        assert!(matches!(err, KvError::OutOfSequence { last: 2, found: 2 }));
        // Fused after the error.
        assert!(replay.next().is_none());
    }

    #[test]
    fn test_replay_stops_on_malformed_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_log_path(&dir);
        std::fs::write(&path, "1\t2\ta\t1\nnot a record\n").unwrap();

        let mut log = FileTransactionLog::open(&path).unwrap();
        let mut replay = log.replay().unwrap();
        assert!(replay.next().unwrap().is_ok());
        let err = replay.next().unwrap().unwrap_err();
        assert!(matches!(err, KvError::MalformedRecord { line: 2, .. }));
    }

    #[test]
    fn test_replay_accepts_torn_final_line_if_parsable() {
        // A final record without a trailing newline still parses.
        let dir = tempfile::tempdir().unwrap();
        let path = temp_log_path(&dir);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"1\t2\ta\t1\n2\t2\tb\t2").unwrap();

        let mut log = FileTransactionLog::open(&path).unwrap();
        let events: Vec<Event> = log.replay().unwrap().map(|e| e.unwrap()).collect();
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn test_writer_assigns_sequences_and_drains_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_log_path(&dir);

        let log = FileTransactionLog::open(&path).unwrap();
        let handle = log.into_writer(16, false);
        let writer = handle.writer();
        writer.write_put("a", b"1".to_vec()).await.unwrap();
        writer.write_put("b", b"2".to_vec()).await.unwrap();
        writer.write_delete("a").await.unwrap();
        let last = handle.shutdown().await.unwrap();
        assert_eq!(last, 3);

        let mut log = FileTransactionLog::open(&path).unwrap();
        let events: Vec<Event> = log.replay().unwrap().map(|e| e.unwrap()).collect();
        assert_eq!(
            events.iter().map(|e| e.sequence).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(events[2].kind, EventKind::Delete);
    }

    #[tokio::test]
    async fn test_writer_continues_sequence_after_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_log_path(&dir);
        std::fs::write(&path, "1\t2\ta\t1\n2\t2\tb\t2\n").unwrap();

        let mut log = FileTransactionLog::open(&path).unwrap();
        for event in log.replay().unwrap() {
            event.unwrap();
        }
        assert_eq!(log.last_sequence(), 2);

        let handle = log.into_writer(16, false);
        handle.writer().write_put("c", b"3".to_vec()).await.unwrap();
        assert_eq!(handle.shutdown().await.unwrap(), 3);

        let mut log = FileTransactionLog::open(&path).unwrap();
        let last = log.replay().unwrap().last().unwrap().unwrap();
        assert_eq!(last.sequence, 3);
        assert_eq!(last.key, "c");
    }

    #[tokio::test]
    async fn test_shutdown_drains_with_writer_clones_alive() {
        let dir = tempfile::tempdir().unwrap();
        let handle = FileTransactionLog::open(temp_log_path(&dir))
            .unwrap()
            .into_writer(16, false);
        let writer = handle.writer();

        for i in 0..5u32 {
            writer.write_put(format!("k{i}"), b"v".to_vec()).await.unwrap();
        }
        let survivor = writer.clone();
        assert_eq!(handle.shutdown().await.unwrap(), 5);

        let err = survivor.write_put("late", b"v".to_vec()).await.unwrap_err();
        assert!(matches!(err, KvError::WriterClosed { .. }));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_write_failure_publishes_and_closes_writer() {
        // /dev/full accepts the open but fails every write with ENOSPC.
        let handle = FileTransactionLog::open("/dev/full")
            .unwrap()
            .into_writer(4, false);
        let writer = handle.writer();
        let mut errors = writer.subscribe_errors();

        writer.write_put("a", b"1".to_vec()).await.unwrap();
        let failure = errors
            .wait_for(|failure| failure.is_some())
            .await
            .unwrap()
            .clone()
            .unwrap();
        assert_eq!(failure.sequence, 1);
        assert_eq!(writer.last_error().unwrap().sequence, 1);

        let err = writer.write_put("b", b"2".to_vec()).await.unwrap_err();
        assert!(matches!(err, KvError::WriterClosed { .. }));
    }

    #[tokio::test]
    async fn test_writer_round_trips_hostile_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_log_path(&dir);

        let handle = FileTransactionLog::open(&path).unwrap().into_writer(4, true);
        handle
            .writer()
            .write_put("multi\tline", b"a\nb\tc\\d".to_vec())
            .await
            .unwrap();
        handle.shutdown().await.unwrap();

        let mut log = FileTransactionLog::open(&path).unwrap();
        let event = log.replay().unwrap().next().unwrap().unwrap();
        assert_eq!(event.key, "multi\tline");
        assert_eq!(event.value, b"a\nb\tc\\d");
    }
}
