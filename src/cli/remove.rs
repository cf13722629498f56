//! `cartwheel remove`: remove records from the roster by index.

use anyhow::Result;
use clap::Args;
use std::io::Write;
use std::ops::Range;

use crate::config::Settings;
use crate::roster::Roster;

use super::check_index;

/// Remove records from the roster by index.
///
/// Indices address the current listing (`cartwheel list`); duplicates and
/// any ordering are accepted: exactly the union of the given indices is
/// removed. Prompts for confirmation unless `--yes` is passed.
#[derive(Args)]
pub struct RemoveCommand {
    /// Indices of the records to remove.
    #[arg(required = true)]
    indices: Vec<usize>,

    /// Skip the confirmation prompt.
    #[arg(short, long)]
    yes: bool,
}

impl RemoveCommand {
    /// Execute the remove command.
    pub async fn execute(self, settings: &Settings) -> Result<()> {
        let mut roster = Roster::load(settings)?;
        for &index in &self.indices {
            check_index(index, roster.len())?;
        }

        let mut targets: Vec<usize> = self.indices.clone();
        targets.sort_unstable();
        targets.dedup();

        if !self.yes && !confirm(&targets, &roster)? {
            println!("Nothing removed");
            return Ok(());
        }

        let ranges: Vec<Range<usize>> = targets.iter().map(|&index| index..index + 1).collect();
        roster.remove_ranges(&ranges);
        roster.flush().await;

        println!("Removed {} record(s); roster now tracks {}", targets.len(), roster.len());
        Ok(())
    }
}

fn confirm(targets: &[usize], roster: &Roster) -> Result<bool> {
    println!("This removes the following record(s) from the roster:");
    for &index in targets {
        println!("  {index:>4}  {}", roster.records()[index]);
    }
    print!("Continue? [y/N] ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
