//! Command-line interface for Cartwheel.
//!
//! Each subcommand lives in its own module with its own argument struct and
//! execution logic. The commands map one-to-one onto the operations the
//! models expose: mutate the roster (`add`, `new`, `remove`, `move`),
//! inspect it (`list`), and drive update runs (`update`).
//!
//! # Usage
//!
//! ```bash
//! # Track every manifest found under a directory
//! cartwheel add ~/Projects/MyApp
//!
//! # Create a blank Cartfile and track it
//! cartwheel new ~/Projects/Fresh --kind cartfile
//!
//! # Inspect and reorder
//! cartwheel list
//! cartwheel move 0 --to 2
//!
//! # Resolve and build
//! cartwheel update --force
//! ```

mod add;
mod list;
mod new;
mod remove;
mod reorder;
mod update;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Settings;
use crate::constants::ENV_NO_PROGRESS;

/// Main CLI application structure for Cartwheel.
///
/// Handles global flags and delegates to subcommands. Verbosity is turned
/// into a log filter directive consumed by the logging setup rather than
/// mutated into the process environment.
#[derive(Parser)]
#[command(
    name = "cartwheel",
    about = "Manage a roster of dependency manifests and drive their update builds",
    version,
    long_about = "Cartwheel tracks Cartfile and Podfile directories in a user-ordered roster \
                  and runs resolve+build updates on them through an external dependency toolkit."
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (equivalent to RUST_LOG=debug).
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a settings file (default: ~/.cartwheel/config.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable progress bars (also honored via CARTWHEEL_NO_PROGRESS).
    #[arg(long, global = true)]
    no_progress: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Discover manifests under the given paths and append them to the
    /// roster.
    Add(add::AddCommand),

    /// List the tracked records in roster order.
    List(list::ListCommand),

    /// Create a blank manifest in a directory and track it.
    New(new::NewCommand),

    /// Remove records from the roster by index.
    Remove(remove::RemoveCommand),

    /// Move records to a new position in the roster.
    #[command(name = "move")]
    Move(reorder::MoveCommand),

    /// Run resolve+build updates on tracked records.
    Update(update::UpdateCommand),
}

impl Cli {
    /// Log filter directive derived from the verbosity flags, `None` when
    /// the environment should decide.
    #[must_use]
    pub fn log_directive(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("error")
        } else {
            None
        }
    }

    /// Run the selected command.
    pub async fn execute(self) -> Result<()> {
        let settings = Settings::load(self.config.as_deref());
        let no_progress = self.no_progress || is_progress_disabled();

        match self.command {
            Commands::Add(cmd) => cmd.execute(&settings).await,
            Commands::List(cmd) => cmd.execute(&settings).await,
            Commands::New(cmd) => cmd.execute(&settings).await,
            Commands::Remove(cmd) => cmd.execute(&settings).await,
            Commands::Move(cmd) => cmd.execute(&settings).await,
            Commands::Update(cmd) => cmd.execute(&settings, no_progress).await,
        }
    }
}

/// Whether the environment asks for progress bars to be suppressed.
pub(crate) fn is_progress_disabled() -> bool {
    std::env::var(ENV_NO_PROGRESS).is_ok()
}

/// Validate a user-supplied roster index against the current length.
pub(crate) fn check_index(index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(crate::core::CartwheelError::RecordOutOfRange {
            index,
            len,
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_index_bounds() {
        assert!(check_index(0, 1).is_ok());
        assert!(check_index(2, 3).is_ok());
        assert!(check_index(3, 3).is_err());
        assert!(check_index(0, 0).is_err());
    }

    #[test]
    fn test_cli_parses_move_subcommand() {
        let cli = Cli::try_parse_from(["cartwheel", "move", "0", "1", "--to", "4"]).unwrap();
        assert!(matches!(cli.command, Commands::Move(_)));
    }

    #[test]
    fn test_verbosity_flags_map_to_directives() {
        let cli = Cli::try_parse_from(["cartwheel", "--verbose", "list"]).unwrap();
        assert_eq!(cli.log_directive(), Some("debug"));

        let cli = Cli::try_parse_from(["cartwheel", "-q", "list"]).unwrap();
        assert_eq!(cli.log_directive(), Some("error"));

        let cli = Cli::try_parse_from(["cartwheel", "list"]).unwrap();
        assert_eq!(cli.log_directive(), None);
    }
}
