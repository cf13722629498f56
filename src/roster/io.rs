//! Roster persistence: tolerant loading and the single-writer queue.
//!
//! Every roster mutation enqueues a full snapshot of the list; one
//! background task owns the storage file and applies snapshots strictly in
//! the order they were enqueued, writing each atomically. Serializing all
//! writes through a single owner means two rapid mutations can never race
//! their writes and leave the older state on disk.
//!
//! Write failures are logged and swallowed; the in-memory roster stays
//! authoritative for the running process, and the next mutation retries a
//! full write anyway (there is no incremental persistence).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};

use crate::manifest::{DependencyRecord, StoredRecord};
use crate::utils::fs::atomic_write;

/// On-disk shape of the persisted roster.
///
/// Deliberately version-free: the single-writer queue already rules out the
/// stale-overwrite race a version stamp would otherwise be needed to detect.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredRoster {
    #[serde(default)]
    records: Vec<StoredRecord>,
}

/// Messages accepted by the writer task.
pub(super) enum WriterMessage {
    /// Persist this snapshot (full list, mutation-ordered).
    Persist(Vec<StoredRecord>),
    /// Reply once every previously enqueued snapshot has been written.
    Flush(oneshot::Sender<()>),
}

/// Read and decode the persisted roster.
///
/// An absent, unreadable, or unparsable file yields an empty list; prior
/// state is never allowed to prevent startup. Records whose manifest has
/// disappeared since they were stored decode to the invalid variant.
pub(super) fn load_records(path: &Path) -> Vec<DependencyRecord> {
    if !path.exists() {
        return Vec::new();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) => {
            tracing::error!("Error reading roster from {}: {error}", path.display());
            return Vec::new();
        }
    };

    match toml::from_str::<StoredRoster>(&content) {
        Ok(stored) => stored.records.into_iter().map(DependencyRecord::from_stored).collect(),
        Err(error) => {
            tracing::error!("Error decoding roster from {}: {error}", path.display());
            Vec::new()
        }
    }
}

/// Spawn the single-writer task owning `path`.
///
/// The task drains its queue in order and exits once every sender is
/// dropped, writing any still-pending snapshots first.
pub(super) fn spawn_writer(path: PathBuf) -> mpsc::UnboundedSender<WriterMessage> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match message {
                WriterMessage::Persist(snapshot) => {
                    if let Err(error) = write_snapshot(&path, &snapshot) {
                        tracing::error!("Error saving roster to disk: {error:#}");
                    }
                }
                WriterMessage::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
    });

    tx
}

fn write_snapshot(path: &Path, snapshot: &[StoredRecord]) -> Result<()> {
    let stored = StoredRoster {
        records: snapshot.to_vec(),
    };

    let mut content = String::from("# Auto-generated roster - DO NOT EDIT\n");
    content.push_str(
        &toml::to_string(&stored).with_context(|| "Failed to serialize roster")?,
    );

    atomic_write(path, content.as_bytes())
        .with_context(|| format!("Cannot write roster: {}", path.display()))
}
