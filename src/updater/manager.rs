//! The update manager: at most one [`Updater`] per record.
//!
//! All command entry points run on the owning task, so the keyed map needs
//! no locking; concurrency lives inside the spawned run tasks. Every
//! command call, including ones that change nothing, publishes exactly
//! one [`UpdateEvent`] for the affected record, so consumers can always
//! re-poll after any request.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::events::EventHub;
use crate::manifest::{DependencyRecord, RecordId};
use crate::toolkit::{Platform, Toolkit};

use super::{UpdateEvent, UpdateStatus, Updater};

/// Aggregates per-record updaters and exposes request/cancel/query
/// operations keyed by record identity.
pub struct UpdateManager {
    toolkit: Arc<dyn Toolkit>,
    platforms: Vec<Platform>,
    updaters: HashMap<RecordId, Updater>,
    hub: Arc<EventHub<UpdateEvent>>,
}

impl UpdateManager {
    /// Create a manager driving updates through `toolkit`, building for
    /// `platforms` in the given order.
    #[must_use]
    pub fn new(toolkit: Arc<dyn Toolkit>, platforms: Vec<Platform>) -> Self {
        Self {
            toolkit,
            platforms,
            updaters: HashMap::new(),
            hub: Arc::new(EventHub::new()),
        }
    }

    /// Subscribe to update events for all records. See [`crate::events`]
    /// for the delivery contract.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<UpdateEvent> {
        self.hub.subscribe()
    }

    /// Request an update for `record`.
    ///
    /// - No updater, or one that never started: (re)start it.
    /// - In progress or finished successfully: no-op unless `force_restart`,
    ///   in which case the existing run is cancelled and a fresh one starts.
    /// - Finished interrupted or failed: always restarted, regardless of
    ///   `force_restart`.
    ///
    /// Every call publishes one event for `record`, even when nothing
    /// changed.
    pub fn request_update(&mut self, record: &DependencyRecord, force_restart: bool) {
        let id = record.id();
        match self.status_for(record) {
            UpdateStatus::NotExistent => self.start_fresh(record, id.clone()),
            UpdateStatus::NotStarted => {
                if let Some(updater) = self.updaters.get_mut(&id) {
                    updater.start();
                }
            }
            UpdateStatus::InProgressIndeterminate
            | UpdateStatus::InProgressDeterminate { .. }
            | UpdateStatus::FinishedSuccess => {
                if force_restart {
                    self.discard(&id);
                    self.start_fresh(record, id.clone());
                }
            }
            UpdateStatus::FinishedInterrupted | UpdateStatus::FinishedError { .. } => {
                self.discard(&id);
                self.start_fresh(record, id.clone());
            }
        }

        self.notify(id);
    }

    /// Cancel the update for `record`, if one is tracked.
    ///
    /// The updater is told to stop at its next chunk boundary and removed
    /// from the manager, so a subsequent [`Self::status_for`] reports
    /// [`UpdateStatus::NotExistent`]. Returns whether an updater was
    /// actually found and cancelled. Observers are notified either way.
    pub fn cancel_update(&mut self, record: &DependencyRecord) -> bool {
        let id = record.id();
        let found = self.discard(&id);
        self.notify(id);
        found
    }

    /// Current status for `record`, O(1); [`UpdateStatus::NotExistent`]
    /// when no updater is tracked.
    #[must_use]
    pub fn status_for(&self, record: &DependencyRecord) -> UpdateStatus {
        self.updaters.get(&record.id()).map_or(UpdateStatus::NotExistent, Updater::status)
    }

    /// Whether any tracked updater is currently in progress.
    #[must_use]
    pub fn any_in_progress(&self) -> bool {
        self.updaters.values().any(|updater| updater.status().is_in_progress())
    }

    /// Cancel every tracked update. Used on shutdown so external processes
    /// do not outlive the application.
    pub fn cancel_all(&mut self) {
        let ids: Vec<RecordId> = self.updaters.keys().cloned().collect();
        for id in ids {
            self.discard(&id);
            self.notify(id);
        }
    }

    fn start_fresh(&mut self, record: &DependencyRecord, id: RecordId) {
        let mut updater = Updater::new(
            record.clone(),
            Arc::clone(&self.toolkit),
            self.platforms.clone(),
            Arc::clone(&self.hub),
        );
        updater.start();
        self.updaters.insert(id, updater);
    }

    /// Cancel and drop the updater for `id`, reporting whether one existed.
    fn discard(&mut self, id: &RecordId) -> bool {
        match self.updaters.remove(id) {
            Some(mut updater) => {
                updater.cancel();
                true
            }
            None => false,
        }
    }

    fn notify(&self, id: RecordId) {
        let status = self
            .updaters
            .get(&id)
            .map_or(UpdateStatus::NotExistent, Updater::status);
        self.hub.publish(UpdateEvent {
            record: id,
            status,
        });
    }
}
