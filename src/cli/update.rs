//! `cartwheel update`: run resolve+build updates on tracked records.
//!
//! Requests an update for every selected record, then drives the update
//! manager until each reaches a terminal status, rendering per-record
//! progress bars from the manager's event stream. Ctrl-C cancels all
//! in-flight runs (killing their external processes) before exiting.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Settings;
use crate::manifest::{DependencyRecord, RecordId};
use crate::roster::Roster;
use crate::toolkit::CommandToolkit;
use crate::updater::{UpdateManager, UpdateStatus};

use super::check_index;

/// Run resolve+build updates on tracked records.
#[derive(Args)]
pub struct UpdateCommand {
    /// Indices of the records to update; all records when omitted.
    indices: Vec<usize>,

    /// Restart records that are already updating or finished successfully.
    #[arg(short, long)]
    force: bool,
}

impl UpdateCommand {
    /// Execute the update command.
    pub async fn execute(self, settings: &Settings, no_progress: bool) -> Result<()> {
        let roster = Roster::load(settings)?;
        if roster.is_empty() {
            println!("Roster is empty; use 'cartwheel add' to track a manifest first");
            return Ok(());
        }

        let selected: Vec<DependencyRecord> = if self.indices.is_empty() {
            roster.records().to_vec()
        } else {
            let mut selected = Vec::with_capacity(self.indices.len());
            for &index in &self.indices {
                check_index(index, roster.len())?;
                selected.push(roster.records()[index].clone());
            }
            selected
        };

        let (targets, skipped): (Vec<_>, Vec<_>) =
            selected.into_iter().partition(DependencyRecord::is_valid);
        for record in &skipped {
            eprintln!(
                "{}: skipping {}: manifest no longer exists at {}",
                "warning".yellow(),
                record.name(),
                record.manifest_path().display()
            );
        }
        if targets.is_empty() {
            anyhow::bail!("No valid records to update");
        }

        let toolkit = Arc::new(CommandToolkit::new(&settings.toolkit.command)?);
        let mut manager = UpdateManager::new(toolkit, settings.platforms.clone());
        let mut events = manager.subscribe();

        for record in &targets {
            manager.request_update(record, self.force);
        }

        let mut reporter = ProgressReporter::new(&targets, no_progress);
        let mut statuses: HashMap<RecordId, UpdateStatus> =
            targets.iter().map(|record| (record.id(), manager.status_for(record))).collect();

        let interrupted = loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    if manager.any_in_progress() {
                        eprintln!("\nInterrupt received, cancelling in-flight updates");
                        manager.cancel_all();
                    }
                    break true;
                }
                event = events.recv() => {
                    let Some(event) = event else { break false };
                    if let Some(slot) = statuses.get_mut(&event.record) {
                        *slot = event.status.clone();
                        reporter.update(&event.record, &event.status);
                    }
                    if statuses.values().all(UpdateStatus::is_finished) {
                        break false;
                    }
                }
            }
        };
        reporter.finish();

        let mut failures = 0usize;
        for record in &targets {
            let status = &statuses[&record.id()];
            let line = match status {
                UpdateStatus::FinishedSuccess => status.to_string().green(),
                UpdateStatus::FinishedError { .. } => {
                    failures += 1;
                    status.to_string().red()
                }
                _ => status.to_string().yellow(),
            };
            println!("{:<24} {line}", record.name());
        }

        if interrupted {
            anyhow::bail!("Update interrupted");
        }
        if failures > 0 {
            anyhow::bail!("{failures} update(s) failed");
        }
        Ok(())
    }
}

/// Per-record progress bars, falling back to log lines when progress output
/// is disabled.
struct ProgressReporter {
    bars: HashMap<RecordId, ProgressBar>,
    names: HashMap<RecordId, String>,
    _multi: Option<MultiProgress>,
}

impl ProgressReporter {
    fn new(records: &[DependencyRecord], no_progress: bool) -> Self {
        let names: HashMap<RecordId, String> = records
            .iter()
            .map(|record| (record.id(), record.name().to_string()))
            .collect();

        if no_progress {
            return Self {
                bars: HashMap::new(),
                names,
                _multi: None,
            };
        }

        let multi = MultiProgress::new();
        let style = ProgressStyle::with_template("{prefix:>20} [{bar:30}] {msg}")
            .expect("static progress template is valid")
            .progress_chars("=> ");

        let bars = records
            .iter()
            .map(|record| {
                let bar = multi.add(
                    ProgressBar::new(100)
                        .with_style(style.clone())
                        .with_prefix(record.name().to_string())
                        .with_message("queued"),
                );
                (record.id(), bar)
            })
            .collect();

        Self {
            bars,
            names,
            _multi: Some(multi),
        }
    }

    fn update(&mut self, record: &RecordId, status: &UpdateStatus) {
        let Some(bar) = self.bars.get(record) else {
            if let Some(name) = self.names.get(record) {
                tracing::info!(target: "update", "{name}: {status}");
            }
            return;
        };

        match status {
            UpdateStatus::NotExistent => bar.abandon_with_message("cancelled"),
            UpdateStatus::NotStarted => bar.set_message("queued"),
            UpdateStatus::InProgressIndeterminate => bar.set_message("resolving dependencies"),
            UpdateStatus::InProgressDeterminate { percentage } => {
                bar.set_position((percentage * 100.0).round() as u64);
                bar.set_message("building");
            }
            UpdateStatus::FinishedSuccess => bar.finish_with_message("finished"),
            UpdateStatus::FinishedInterrupted => bar.abandon_with_message("interrupted"),
            UpdateStatus::FinishedError { .. } => bar.abandon_with_message("failed"),
        }
    }

    fn finish(&mut self) {
        for bar in self.bars.values() {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    }
}
