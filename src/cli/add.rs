//! `cartwheel add`: discover manifests and append them to the roster.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::config::Settings;
use crate::manifest::discover_all;
use crate::roster::Roster;

/// Discover manifests under the given paths and track them.
///
/// Each path may be a manifest file, a directory containing one, or a tree
/// to scan (bounded by the configured search depth). Everything found is
/// appended to the roster in discovery order.
#[derive(Args)]
pub struct AddCommand {
    /// Files or directories to scan for manifests.
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

impl AddCommand {
    /// Execute the add command.
    pub async fn execute(self, settings: &Settings) -> Result<()> {
        let records = discover_all(&self.paths, settings.search_depth);
        if records.is_empty() {
            println!("No manifests found under the given path(s)");
            return Ok(());
        }

        let mut roster = Roster::load(settings)?;
        for record in &records {
            println!("Tracking {record}");
        }
        let count = records.len();
        roster.append_all(records);
        roster.flush().await;

        println!("Added {count} record(s); roster now tracks {}", roster.len());
        Ok(())
    }
}
