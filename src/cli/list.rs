//! `cartwheel list`: display the roster.

use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::Serialize;

use crate::config::Settings;
use crate::roster::Roster;

/// Output format for the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table.
    Table,
    /// Machine-readable JSON.
    Json,
}

/// List the tracked records in roster order.
#[derive(Args)]
pub struct ListCommand {
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Serialize)]
struct ListEntry<'a> {
    index: usize,
    name: &'a str,
    location: String,
    kind: String,
    valid: bool,
}

impl ListCommand {
    /// Execute the list command.
    pub async fn execute(self, settings: &Settings) -> Result<()> {
        let roster = Roster::load(settings)?;

        match self.format {
            OutputFormat::Table => {
                if roster.is_empty() {
                    println!("No records tracked; use 'cartwheel add' to track a manifest");
                    return Ok(());
                }
                for (index, record) in roster.records().iter().enumerate() {
                    let marker = if record.is_valid() {
                        record.kind().to_string().normal()
                    } else {
                        format!("{} (missing)", record.kind()).red()
                    };
                    println!(
                        "{index:>4}  {:<24} {marker:<20} {}",
                        record.name(),
                        record.location().display()
                    );
                }
            }
            OutputFormat::Json => {
                let entries: Vec<ListEntry<'_>> = roster
                    .records()
                    .iter()
                    .enumerate()
                    .map(|(index, record)| ListEntry {
                        index,
                        name: record.name(),
                        location: record.location().display().to_string(),
                        kind: record.kind().to_string(),
                        valid: record.is_valid(),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            }
        }

        Ok(())
    }
}
