//! Cartwheel - dependency-manifest roster and update driver
//!
//! Cartwheel manages a user-ordered roster of dependency-manifest records
//! (Cartfile and Podfile directories) and drives two-phase resolve+build
//! update runs on them through an external dependency toolkit, reporting
//! per-record progress as a typed status value.
//!
//! # Architecture Overview
//!
//! Two cooperating models form the core:
//!
//! - The **roster** ([`roster::Roster`]) owns the ordered list of tracked
//!   [`manifest::DependencyRecord`]s, notifies subscribers on every
//!   mutation, and persists each new state to disk through a single-writer
//!   queue. The in-memory list is the single source of truth; persistence
//!   failures are logged, never surfaced.
//! - The **update manager** ([`updater::UpdateManager`]) keeps at most one
//!   [`updater::Updater`] per record identity. Each updater drives one
//!   asynchronous resolve+build run through the [`toolkit::Toolkit`] seam
//!   and republishes its progress as an [`updater::UpdateStatus`]:
//!   indeterminate while resolving, determinate (completed/total jobs)
//!   while building, then one of the terminal finished states.
//!
//! Dependency resolution and building themselves happen entirely outside
//! this crate, in an external toolkit executable consumed through
//! [`toolkit::CommandToolkit`].
//!
//! # Core Modules
//!
//! - [`cli`] - Command-line interface (`add`, `list`, `new`, `remove`,
//!   `move`, `update`)
//! - [`config`] - Injected settings with file and environment overrides
//! - [`core`] - Typed errors and user-facing error presentation
//! - [`events`] - Event channels with an explicit delivery contract
//! - [`manifest`] - Records, manifest kinds, discovery, blank-manifest
//!   creation
//! - [`roster`] - The ordered list model and its persistence
//! - [`toolkit`] - The external-toolkit boundary and its process adapter
//! - [`updater`] - The per-record update state machine and its manager
//! - [`utils`] - Atomic file-writing helpers
//!
//! # Example
//!
//! ```bash
//! # Track manifests, then build them
//! cartwheel add ~/Projects/MyApp
//! cartwheel list
//! cartwheel update
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod events;
pub mod manifest;
pub mod roster;
pub mod toolkit;
pub mod updater;
pub mod utils;

// test_utils is available to unit tests and integration suites
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `directive` overrides the filter (the CLI maps `--verbose`/`--quiet`
/// onto it); otherwise `RUST_LOG` is honored, defaulting to `info`.
/// Subsequent calls are no-ops.
pub fn init_logging(directive: Option<&str>) {
    let filter = match directive {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}
