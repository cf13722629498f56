//! The roster: the ordered list of tracked dependency records.
//!
//! [`Roster`] is the single source of truth the rest of the application
//! renders. It owns the ordered `Vec<DependencyRecord>` (order is
//! user-significant and reorderable; uniqueness is not enforced), notifies
//! subscribers on every mutation, and persists each new state through a
//! single-writer queue owned by a background task.
//!
//! Mutation side-effect order is fixed: publish [`RosterEvent::Changed`]
//! first, then enqueue the snapshot. Subscribers re-read
//! [`Roster::records`] when they observe an event; persistence failures are
//! logged, never surfaced; the in-memory list stays authoritative.
//!
//! Index arguments to the mutating operations are assumed in-range; callers
//! derive them from the current list (the CLI validates user input before
//! calling in). Out-of-range indices panic, as misuse of the contract.

mod io;

use anyhow::Result;
use std::ops::Range;
use tokio::sync::{mpsc, oneshot};

use crate::config::Settings;
use crate::events::EventHub;
use crate::manifest::{DependencyRecord, StoredRecord};

use io::WriterMessage;

/// Change notification published on every roster mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterEvent {
    /// The ordered list changed in some way; re-read the records.
    Changed,
}

/// Ordered collection of tracked dependency records with disk persistence.
pub struct Roster {
    records: Vec<DependencyRecord>,
    hub: EventHub<RosterEvent>,
    writer: mpsc::UnboundedSender<WriterMessage>,
}

impl Roster {
    /// Load the persisted roster (or start empty) and spawn the persistence
    /// writer.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails only when the storage path cannot be resolved; unreadable or
    /// corrupt prior state falls back to an empty list.
    pub fn load(settings: &Settings) -> Result<Self> {
        let path = settings.storage_path()?;
        let records = io::load_records(&path);
        tracing::debug!("Loaded {} roster record(s) from {}", records.len(), path.display());

        Ok(Self {
            records,
            hub: EventHub::new(),
            writer: io::spawn_writer(path),
        })
    }

    /// Current records, in user order.
    #[must_use]
    pub fn records(&self) -> &[DependencyRecord] {
        &self.records
    }

    /// Number of tracked records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Subscribe to change notifications. See [`crate::events`] for the
    /// delivery contract.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<RosterEvent> {
        self.hub.subscribe()
    }

    /// Append one record at the tail.
    pub fn append(&mut self, record: DependencyRecord) {
        let at = self.records.len();
        self.insert_at(vec![record], at);
    }

    /// Append records at the tail, preserving their order.
    pub fn append_all(&mut self, records: Vec<DependencyRecord>) {
        let at = self.records.len();
        self.insert_at(records, at);
    }

    /// Insert records in order starting at `index`; an index at or beyond
    /// the current length appends.
    pub fn insert_at(&mut self, records: Vec<DependencyRecord>, index: usize) {
        if records.is_empty() {
            return;
        }
        self.records = insert_items(records, std::mem::take(&mut self.records), index);
        self.changed();
    }

    /// Move the records whose indices fall within any of `ranges` so the
    /// extracted block (original relative order preserved) ends up starting
    /// at index `to`.
    ///
    /// The destination addresses the list as it stands once the extracted
    /// records are removed (equivalently, the final index of the first
    /// moved record, clamped to the tail). Extraction already accounts for
    /// any selected records that preceded the destination, so the result is
    /// independent of how many ranges were selected or their relative
    /// order.
    pub fn move_ranges(&mut self, ranges: &[Range<usize>], to: usize) {
        let indices = indices_union(ranges);
        if indices.is_empty() {
            return;
        }

        let moved: Vec<DependencyRecord> =
            indices.iter().map(|&i| self.records[i].clone()).collect();
        let remaining = remove_indices(std::mem::take(&mut self.records), &indices);

        self.records = insert_items(moved, remaining, to);
        self.changed();
    }

    /// Remove exactly the records whose indices fall within any of
    /// `ranges`; overlapping or out-of-order ranges remove the union.
    pub fn remove_ranges(&mut self, ranges: &[Range<usize>]) {
        let indices = indices_union(ranges);
        if indices.is_empty() {
            return;
        }
        self.records = remove_indices(std::mem::take(&mut self.records), &indices);
        self.changed();
    }

    /// Wait until every mutation enqueued so far has reached disk.
    ///
    /// Short-lived processes call this before exiting so the final write is
    /// not lost with the runtime.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.writer.send(WriterMessage::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Notify observers, then enqueue a snapshot for the writer.
    fn changed(&self) {
        self.hub.publish(RosterEvent::Changed);

        let snapshot: Vec<StoredRecord> =
            self.records.iter().map(DependencyRecord::to_stored).collect();
        if self.writer.send(WriterMessage::Persist(snapshot)).is_err() {
            tracing::error!("Roster writer task is gone; state not persisted");
        }
    }
}

// Pure index arithmetic, kept free of the struct so the semantics are
// testable without a runtime.

/// Ascending union of the indices covered by `ranges`.
fn indices_union(ranges: &[Range<usize>]) -> Vec<usize> {
    let mut indices: Vec<usize> = ranges.iter().cloned().flatten().collect();
    indices.sort_unstable();
    indices.dedup();
    indices
}

/// Insert `items` in order starting at `index`; out-of-bounds appends.
fn insert_items<T>(items: Vec<T>, mut into: Vec<T>, index: usize) -> Vec<T> {
    if index < into.len() {
        for (offset, item) in items.into_iter().enumerate() {
            into.insert(index + offset, item);
        }
    } else {
        into.extend(items);
    }
    into
}

/// Remove the items at `indices` (ascending, deduplicated), processed from
/// highest to lowest so earlier removals do not invalidate later indices.
fn remove_indices<T>(mut from: Vec<T>, indices: &[usize]) -> Vec<T> {
    for &index in indices.iter().rev() {
        from.remove(index);
    }
    from
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{ManifestKind, StoredRecord};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn record(name: &str) -> DependencyRecord {
        DependencyRecord::from_stored(StoredRecord {
            name: name.to_string(),
            location: PathBuf::from(format!("/tmp/{name}")),
            kind: ManifestKind::Cartfile,
        })
    }

    fn test_roster(temp: &TempDir) -> Roster {
        let settings = Settings {
            storage_dir: Some(temp.path().to_path_buf()),
            ..Settings::default()
        };
        Roster::load(&settings).unwrap()
    }

    fn names(roster: &Roster) -> Vec<&str> {
        roster.records().iter().map(DependencyRecord::name).collect()
    }

    #[tokio::test]
    async fn test_append_and_insert_order() {
        let temp = TempDir::new().unwrap();
        let mut roster = test_roster(&temp);

        roster.append(record("a"));
        roster.append_all(vec![record("b"), record("c")]);
        assert_eq!(names(&roster), vec!["a", "b", "c"]);

        roster.insert_at(vec![record("x"), record("y")], 1);
        assert_eq!(names(&roster), vec!["a", "x", "y", "b", "c"]);
    }

    #[tokio::test]
    async fn test_insert_beyond_length_appends() {
        let temp = TempDir::new().unwrap();
        let mut roster = test_roster(&temp);

        roster.append(record("a"));
        roster.insert_at(vec![record("z")], 99);
        assert_eq!(names(&roster), vec!["a", "z"]);
    }

    #[tokio::test]
    async fn test_move_first_to_index_two() {
        let temp = TempDir::new().unwrap();
        let mut roster = test_roster(&temp);

        roster.append_all(vec![record("a"), record("b"), record("c")]);
        roster.move_ranges(&[0..1], 2);
        assert_eq!(names(&roster), vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn test_move_disjoint_ranges_preserves_relative_order() {
        let temp = TempDir::new().unwrap();
        let mut roster = test_roster(&temp);

        roster.append_all(vec![
            record("a"),
            record("b"),
            record("c"),
            record("d"),
            record("e"),
        ]);
        // Extract a, b, and d (ranges given out of order), drop them at 1
        roster.move_ranges(&[3..4, 0..2], 1);
        assert_eq!(names(&roster), vec!["c", "a", "b", "d", "e"]);
    }

    #[tokio::test]
    async fn test_remove_overlapping_ranges_removes_union() {
        let temp = TempDir::new().unwrap();
        let mut roster = test_roster(&temp);

        roster.append_all(vec![
            record("a"),
            record("b"),
            record("c"),
            record("d"),
            record("e"),
        ]);
        roster.remove_ranges(&[1..3, 2..4]);
        assert_eq!(names(&roster), vec!["a", "e"]);
    }

    #[tokio::test]
    async fn test_every_mutation_notifies_subscribers() {
        let temp = TempDir::new().unwrap();
        let mut roster = test_roster(&temp);
        let mut events = roster.subscribe();

        roster.append(record("a"));
        roster.move_ranges(&[0..1], 0);
        roster.remove_ranges(&[0..1]);

        for _ in 0..3 {
            assert_eq!(events.recv().await, Some(RosterEvent::Changed));
        }
    }

    #[tokio::test]
    async fn test_mutations_persist_across_reload() {
        let temp = TempDir::new().unwrap();
        {
            let mut roster = test_roster(&temp);
            roster.append_all(vec![record("one"), record("two")]);
            roster.remove_ranges(&[0..1]);
            roster.flush().await;
        }

        let reloaded = test_roster(&temp);
        assert_eq!(names(&reloaded), vec!["two"]);
    }

    #[test]
    fn test_indices_union_merges_overlaps() {
        assert_eq!(indices_union(&[1..3, 2..4, 7..8]), vec![1, 2, 3, 7]);
        assert!(indices_union(&[]).is_empty());
        assert!(indices_union(&[3..3]).is_empty());
    }
}
