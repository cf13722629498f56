//! `cartwheel move`: reorder records in the roster.

use anyhow::Result;
use clap::Args;
use std::ops::Range;

use crate::config::Settings;
use crate::roster::Roster;

use super::check_index;

/// Move records to a new position in the roster.
///
/// The selected records keep their relative order and end up as a block
/// starting at `--to`, which addresses the list with the selection removed
/// (equivalently: the block's final starting index).
#[derive(Args)]
pub struct MoveCommand {
    /// Indices of the records to move.
    #[arg(required = true)]
    indices: Vec<usize>,

    /// Destination index of the moved block.
    #[arg(long)]
    to: usize,
}

impl MoveCommand {
    /// Execute the move command.
    pub async fn execute(self, settings: &Settings) -> Result<()> {
        let mut roster = Roster::load(settings)?;
        for &index in &self.indices {
            check_index(index, roster.len())?;
        }

        let ranges: Vec<Range<usize>> =
            self.indices.iter().map(|&index| index..index + 1).collect();
        roster.move_ranges(&ranges, self.to);
        roster.flush().await;

        println!("New order:");
        for (index, record) in roster.records().iter().enumerate() {
            println!("  {index:>4}  {}", record.name());
        }
        Ok(())
    }
}
