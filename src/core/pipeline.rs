use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::Span;

use crate::common::{debug, info, Result};
use crate::core::{Config, Counter, FileReport};
use crate::rdb::{Decoder, Entry, Outcome, Step};

// Sets the shared flag once the stream goes away.
struct CancelOnDrop(Arc<AtomicBool>);

impl CancelOnDrop {
    fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Entries of one file, produced in file order by a decoder running on a blocking task.
pub struct EntryStream {
    entries: mpsc::Receiver<Entry>,
    outcome: oneshot::Receiver<Result<Outcome>>,
    cancel: CancelOnDrop,
}

impl EntryStream {
    /// Next entry, None once the producer stopped.
    pub async fn next(&mut self) -> Option<Entry> {
        self.entries.recv().await
    }

    /// Stop the producer. Entries already buffered can still be read.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        // Fails a send the producer is blocked in.
        self.entries.close();
    }

    /// Discard unread entries and wait for the decoder result.
    pub async fn finish(mut self) -> Result<Outcome> {
        let mut discarded: u64 = 0;
        while self.entries.recv().await.is_some() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!(discarded, "unread entries discarded");
        }

        self.outcome.await?
    }
}

/// Decode the dump file at `path`. Must be called within a tokio runtime.
pub fn decode_file(path: impl AsRef<Path>, config: &Config) -> EntryStream {
    let path: PathBuf = path.as_ref().to_path_buf();
    let span = tracing::info_span!("decode", path = %path.display());
    let verify_checksum = config.verify_checksum();

    spawn(config.channel_capacity(), span, move || {
        Decoder::open(&path, verify_checksum)
    })
}

/// Decode `size` bytes of dump read from `read`. Must be called within a tokio runtime.
pub fn decode_reader<R>(read: R, size: u64, config: &Config) -> EntryStream
where
    R: Read + Send + 'static,
{
    let span = tracing::info_span!("decode", size);
    let verify_checksum = config.verify_checksum();

    spawn(config.channel_capacity(), span, move || {
        Ok(Decoder::new(read, size, verify_checksum))
    })
}

/// Decode and aggregate one file.
pub async fn count_file(path: impl AsRef<Path>, config: &Config) -> Result<FileReport> {
    let path = path.as_ref();
    let mut stream = decode_file(path, config);
    let mut counter = Counter::with_config(config);

    while let Some(entry) = stream.next().await {
        counter.count(entry);
    }
    let outcome = stream.finish().await?;

    Ok(FileReport::new(path, outcome, &counter))
}

fn spawn<R, F>(capacity: usize, span: Span, open: F) -> EntryStream
where
    R: Read,
    F: FnOnce() -> Result<Decoder<R>> + Send + 'static,
{
    let (entry_tx, entry_rx) = mpsc::channel(std::cmp::max(capacity, 1));
    let (outcome_tx, outcome_rx) = oneshot::channel();
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);

    tokio::task::spawn_blocking(move || {
        let _enter = span.enter();

        let result = open().and_then(|mut decoder| produce(&mut decoder, &entry_tx, &flag));
        match &result {
            Ok(outcome) => info!(
                version = outcome.version,
                keys = outcome.keys,
                bytes = outcome.bytes,
                "decoded"
            ),
            Err(err) if err.is_cancelled() => debug!(%err, "decode stopped"),
            Err(err) => debug!(%err, offset = ?err.offset(), "decode failed"),
        }

        // The outcome is in place before the entry channel closes.
        let _ = outcome_tx.send(result);
        drop(entry_tx);
    });

    EntryStream {
        entries: entry_rx,
        outcome: outcome_rx,
        cancel: CancelOnDrop(cancelled),
    }
}

fn produce<R: Read>(
    decoder: &mut Decoder<R>,
    entries: &mpsc::Sender<Entry>,
    cancelled: &AtomicBool,
) -> Result<Outcome> {
    loop {
        if cancelled.load(Ordering::Acquire) || entries.is_closed() {
            return Err(decoder.cancelled());
        }

        match decoder.step()? {
            Step::Entry(entry) => {
                if entries.blocking_send(entry).is_err() {
                    return Err(decoder.cancelled());
                }
            }
            Step::Metadata => continue,
            Step::Done(outcome) => return Ok(outcome),
        }
    }
}
