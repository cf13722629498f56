//! Per-record update state machine.
//!
//! An [`Updater`] drives one resolve+build run for one record through the
//! external toolkit and republishes its progress as a single
//! [`UpdateStatus`] value. The [`UpdateManager`] keeps at most one updater
//! per record identity and is the only entry point the rest of the
//! application uses.
//!
//! # States
//!
//! ```text
//! NotExistent --(request update)--> NotStarted --(start)--> InProgressIndeterminate
//! InProgressIndeterminate --(resolve done, build phase)--> InProgressDeterminate(0.0)
//! InProgressDeterminate(p) --(one job completes)--> InProgressDeterminate(completed/total)
//! InProgressDeterminate(1.0) --(last job)--> FinishedSuccess*
//! InProgress* --(cancel)--> FinishedInterrupted*
//! InProgress* --(resolve/build error)--> FinishedError*
//! ```
//!
//! Terminal states (`*`) never transition further; a new request after one
//! discards the updater and starts a fresh run.
//!
//! # Run sequence
//!
//! Stage 1 consumes the toolkit's resolve stream, buffering the build units
//! it emits. Stage 2 then executes the buffered units strictly one at a
//! time (platforms in configured order, units in buffered order) and
//! publishes a recomputed percentage after every single job. Builds for
//! different records run concurrently (each updater has its own task); jobs
//! within one run never do.
//!
//! # Cancellation
//!
//! Cancellation is observed between chunks of work, never mid-chunk: the
//! run task races a cancel signal against the current resolve-stream item
//! or build future. On cancellation the in-flight toolkit future is
//! dropped, which kills any external process it spawned. Partially
//! completed jobs are not rolled back. Dropping an [`Updater`] that was
//! never cancelled has the same effect as cancelling it.

mod manager;

use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};

use crate::events::EventHub;
use crate::manifest::{DependencyRecord, RecordId};
use crate::toolkit::{BuildJob, Platform, Toolkit};

pub use manager::UpdateManager;

/// Current state of one record's update run.
///
/// A closed sum type: every consumer matches exhaustively, so adding a
/// state is a compile-visible change everywhere it matters.
#[derive(Debug, Clone)]
pub enum UpdateStatus {
    /// No updater has ever been created for the record.
    NotExistent,
    /// An updater exists but has not been started.
    NotStarted,
    /// Stage 1 (dependency resolution) is running; no percentage is
    /// available.
    InProgressIndeterminate,
    /// Stage 2 (builds) is running; `percentage` is completed jobs over
    /// total jobs, in `0.0..=1.0`.
    InProgressDeterminate {
        /// Completed build jobs divided by total build jobs.
        percentage: f64,
    },
    /// The run completed every job successfully. Terminal.
    FinishedSuccess,
    /// The run was cancelled mid-flight. Terminal.
    FinishedInterrupted,
    /// The resolve stage or a build job failed. Terminal; the originating
    /// error is retained for display.
    FinishedError {
        /// The error that ended the run.
        error: Arc<anyhow::Error>,
    },
}

impl UpdateStatus {
    /// Whether the run is currently executing (either stage).
    #[must_use]
    pub const fn is_in_progress(&self) -> bool {
        matches!(
            self,
            UpdateStatus::InProgressIndeterminate | UpdateStatus::InProgressDeterminate { .. }
        )
    }

    /// Whether the status is terminal.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(
            self,
            UpdateStatus::FinishedSuccess
                | UpdateStatus::FinishedInterrupted
                | UpdateStatus::FinishedError { .. }
        )
    }

    /// Build-phase percentage, when one is available.
    #[must_use]
    pub const fn percentage(&self) -> Option<f64> {
        match self {
            UpdateStatus::InProgressDeterminate { percentage } => Some(*percentage),
            _ => None,
        }
    }
}

impl PartialEq for UpdateStatus {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (UpdateStatus::NotExistent, UpdateStatus::NotExistent)
            | (UpdateStatus::NotStarted, UpdateStatus::NotStarted)
            | (UpdateStatus::InProgressIndeterminate, UpdateStatus::InProgressIndeterminate)
            | (UpdateStatus::FinishedSuccess, UpdateStatus::FinishedSuccess)
            | (UpdateStatus::FinishedInterrupted, UpdateStatus::FinishedInterrupted) => true,
            (
                UpdateStatus::InProgressDeterminate { percentage: a },
                UpdateStatus::InProgressDeterminate { percentage: b },
            ) => a == b,
            (
                UpdateStatus::FinishedError { error: a },
                UpdateStatus::FinishedError { error: b },
            ) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateStatus::NotExistent => write!(f, "no update requested"),
            UpdateStatus::NotStarted => write!(f, "not started"),
            UpdateStatus::InProgressIndeterminate => write!(f, "resolving dependencies"),
            UpdateStatus::InProgressDeterminate { percentage } => {
                write!(f, "building ({:.0}%)", percentage * 100.0)
            }
            UpdateStatus::FinishedSuccess => write!(f, "finished"),
            UpdateStatus::FinishedInterrupted => write!(f, "interrupted"),
            UpdateStatus::FinishedError { error } => write!(f, "failed: {error}"),
        }
    }
}

/// Notification that a record's update state may have changed.
///
/// Consumers treat this as a change hint and re-query
/// [`UpdateManager::status_for`]; the included status is the snapshot at
/// publish time.
#[derive(Debug, Clone)]
pub struct UpdateEvent {
    /// Identity of the affected record.
    pub record: RecordId,
    /// Status snapshot at the moment the event was published.
    pub status: UpdateStatus,
}

/// Drives one resolve+build run for one record.
///
/// Created and owned exclusively by [`UpdateManager`].
pub struct Updater {
    record: DependencyRecord,
    toolkit: Arc<dyn Toolkit>,
    platforms: Vec<Platform>,
    hub: Arc<EventHub<UpdateEvent>>,
    status_rx: watch::Receiver<UpdateStatus>,
    status_tx: Option<watch::Sender<UpdateStatus>>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl Updater {
    fn new(
        record: DependencyRecord,
        toolkit: Arc<dyn Toolkit>,
        platforms: Vec<Platform>,
        hub: Arc<EventHub<UpdateEvent>>,
    ) -> Self {
        let (status_tx, status_rx) = watch::channel(UpdateStatus::NotStarted);
        Self {
            record,
            toolkit,
            platforms,
            hub,
            status_rx,
            status_tx: Some(status_tx),
            cancel_tx: Some(cancel_placeholder()),
        }
    }

    /// Current status, O(1).
    fn status(&self) -> UpdateStatus {
        self.status_rx.borrow().clone()
    }

    /// Spawn the run task. A second call is a no-op.
    fn start(&mut self) {
        let Some(status_tx) = self.status_tx.take() else {
            return;
        };
        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.cancel_tx = Some(cancel_tx);

        let run = UpdateRun {
            record_id: self.record.id(),
            record: self.record.clone(),
            toolkit: Arc::clone(&self.toolkit),
            platforms: self.platforms.clone(),
            hub: Arc::clone(&self.hub),
            status: status_tx,
        };
        tokio::spawn(run.execute(cancel_rx));
    }

    /// Signal the run task to stop at the next chunk boundary.
    ///
    /// Safe to call on a never-started or already-finished updater.
    fn cancel(&mut self) {
        if let Some(cancel) = self.cancel_tx.take() {
            let _ = cancel.send(());
        }
    }
}

/// Placeholder sender held before `start` so a pre-start drop behaves like
/// a cancel of a run that never began.
fn cancel_placeholder() -> oneshot::Sender<()> {
    let (tx, _rx) = oneshot::channel();
    tx
}

/// Everything the spawned run task owns.
struct UpdateRun {
    record_id: RecordId,
    record: DependencyRecord,
    toolkit: Arc<dyn Toolkit>,
    platforms: Vec<Platform>,
    hub: Arc<EventHub<UpdateEvent>>,
    status: watch::Sender<UpdateStatus>,
}

impl UpdateRun {
    /// Publish a transition on both the watch channel and the event hub.
    fn set_status(&self, status: UpdateStatus) {
        let _ = self.status.send(status.clone());
        self.hub.publish(UpdateEvent {
            record: self.record_id.clone(),
            status,
        });
    }

    async fn execute(self, mut cancel: oneshot::Receiver<()>) {
        let name = self.record.name().to_string();

        // Drain the toolkit's side channel into the log for the lifetime of
        // this run.
        let mut toolkit_events = self.toolkit.events();
        let event_logger = {
            let name = name.clone();
            tokio::spawn(async move {
                while let Some(event) = toolkit_events.recv().await {
                    tracing::info!(target: "update", "<{name}> {event}");
                }
            })
        };

        tracing::info!(target: "update", "<{name}> Updating dependencies started");
        self.set_status(UpdateStatus::InProgressIndeterminate);

        let outcome = self.run_stages(&mut cancel, &name).await;
        match outcome {
            RunOutcome::Success => {
                tracing::info!(target: "update", "<{name}> Update finished");
                self.set_status(UpdateStatus::FinishedSuccess);
            }
            RunOutcome::Interrupted => {
                tracing::warn!(target: "update", "<{name}> Update interrupted");
                self.set_status(UpdateStatus::FinishedInterrupted);
            }
            RunOutcome::Failed(error) => {
                tracing::warn!(target: "update", "<{name}> Update failed: {error:#}");
                self.set_status(UpdateStatus::FinishedError {
                    error: Arc::new(error),
                });
            }
        }

        event_logger.abort();
    }

    async fn run_stages(
        &self,
        cancel: &mut oneshot::Receiver<()>,
        name: &str,
    ) -> RunOutcome {
        // Stage 1: resolve, buffering build units as the toolkit discovers
        // them. Nothing is executed yet.
        let mut resolve = self.toolkit.resolve(self.record.location());
        let mut jobs: Vec<BuildJob> = Vec::new();
        loop {
            tokio::select! {
                _ = &mut *cancel => return RunOutcome::Interrupted,
                item = resolve.next() => match item {
                    Some(Ok(job)) => jobs.push(job),
                    Some(Err(error)) => return RunOutcome::Failed(error),
                    None => break,
                },
            }
        }
        drop(resolve);

        // Stage 2: execute the buffered units one at a time, never
        // concurrently, recomputing the percentage after every completion.
        let total = jobs.len() * self.platforms.len();
        if total == 0 {
            return RunOutcome::Success;
        }

        tracing::info!(target: "update", "<{name}> Compiling started ({total} jobs)");
        self.set_status(UpdateStatus::InProgressDeterminate { percentage: 0.0 });

        let mut completed = 0usize;
        for platform in &self.platforms {
            for job in &jobs {
                let build = self.toolkit.build(self.record.location(), job, *platform);
                let result = tokio::select! {
                    _ = &mut *cancel => return RunOutcome::Interrupted,
                    result = build => result,
                };
                match result {
                    Ok(()) => {
                        completed += 1;
                        tracing::info!(
                            target: "update",
                            "<{name}> Compiled {completed} of {total} ({} for {platform})",
                            job.dependency
                        );
                        self.set_status(UpdateStatus::InProgressDeterminate {
                            percentage: completed as f64 / total as f64,
                        });
                    }
                    Err(error) => return RunOutcome::Failed(error),
                }
            }
        }

        RunOutcome::Success
    }
}

enum RunOutcome {
    Success,
    Interrupted,
    Failed(anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_predicates() {
        assert!(UpdateStatus::InProgressIndeterminate.is_in_progress());
        assert!(UpdateStatus::InProgressDeterminate { percentage: 0.5 }.is_in_progress());
        assert!(!UpdateStatus::NotStarted.is_in_progress());

        assert!(UpdateStatus::FinishedSuccess.is_finished());
        assert!(UpdateStatus::FinishedInterrupted.is_finished());
        assert!(
            UpdateStatus::FinishedError {
                error: Arc::new(anyhow::anyhow!("boom"))
            }
            .is_finished()
        );
        assert!(!UpdateStatus::InProgressIndeterminate.is_finished());
    }

    #[test]
    fn test_percentage_only_in_determinate_state() {
        assert_eq!(
            UpdateStatus::InProgressDeterminate { percentage: 0.25 }.percentage(),
            Some(0.25)
        );
        assert_eq!(UpdateStatus::InProgressIndeterminate.percentage(), None);
        assert_eq!(UpdateStatus::FinishedSuccess.percentage(), None);
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(UpdateStatus::NotExistent.to_string(), "no update requested");
        assert_eq!(
            UpdateStatus::InProgressDeterminate { percentage: 0.5 }.to_string(),
            "building (50%)"
        );
        assert_eq!(UpdateStatus::FinishedInterrupted.to_string(), "interrupted");
    }
}
