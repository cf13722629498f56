//! Boundary with the external dependency-resolution/build toolkit.
//!
//! Cartwheel never resolves or builds dependencies itself. Everything below
//! this seam belongs to an external toolkit (a `carthage`-style executable),
//! consumed strictly through the asynchronous interface defined here:
//!
//! - **Stage 1**: [`Toolkit::resolve`] updates dependency checkouts for a
//!   record's directory and yields one [`BuildJob`] per build unit it
//!   discovers.
//! - **Stage 2**: [`Toolkit::build`] executes a single buffered job for one
//!   [`Platform`].
//! - **Side channel**: [`Toolkit::events`] exposes the toolkit's lifecycle
//!   chatter (cloning, fetching, checking out, ...), consumed purely for
//!   logging.
//!
//! The trait returns boxed futures/streams so the update subsystem can hold
//! a `dyn Toolkit` and tests can substitute a scripted double. Implementors
//! must guarantee that dropping an in-flight future or stream cancels the
//! underlying work, including any spawned external process; updater
//! cancellation relies on it.

pub mod command;

use anyhow::Result;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tokio::sync::mpsc;

pub use command::CommandToolkit;

/// A build target platform supported by the toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Desktop builds.
    Desktop,
    /// Mobile builds.
    Mobile,
    /// Wearable builds.
    Wearable,
}

impl Platform {
    /// All platforms, in the order update runs build them.
    pub const ALL: [Platform; 3] = [Platform::Desktop, Platform::Mobile, Platform::Wearable];
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Desktop => "desktop",
            Platform::Mobile => "mobile",
            Platform::Wearable => "wearable",
        };
        write!(f, "{name}")
    }
}

/// A build-unit descriptor discovered during dependency resolution.
///
/// Jobs are buffered by the updater during stage 1 and executed one at a
/// time during stage 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildJob {
    /// Name of the dependency this unit builds.
    pub dependency: String,
    /// Resolved version, when the toolkit reports one.
    pub version: Option<String>,
}

impl BuildJob {
    /// Convenience constructor for a job without version information.
    pub fn new(dependency: impl Into<String>) -> Self {
        Self {
            dependency: dependency.into(),
            version: None,
        }
    }
}

/// Lifecycle events emitted by the toolkit while it works.
///
/// These carry no completion semantics: the updater logs them and otherwise
/// ignores them. Progress and errors travel through the [`Toolkit::resolve`]
/// and [`Toolkit::build`] return paths instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolkitEvent {
    /// A dependency repository is being cloned.
    Cloning {
        /// Dependency identifier
        dependency: String,
    },
    /// A dependency repository is being fetched.
    Fetching {
        /// Dependency identifier
        dependency: String,
    },
    /// A dependency is being checked out at a revision.
    CheckingOut {
        /// Dependency identifier
        dependency: String,
        /// Revision being checked out
        revision: String,
    },
    /// Prebuilt binaries are being downloaded for a dependency version.
    DownloadingBinaries {
        /// Dependency identifier
        dependency: String,
        /// Version of the binaries
        version: String,
    },
    /// Binary download was skipped for a dependency version.
    SkippedDownloadingBinaries {
        /// Dependency identifier
        dependency: String,
        /// Version of the binaries
        version: String,
    },
    /// Building was skipped for a dependency version.
    SkippedBuilding {
        /// Dependency identifier
        dependency: String,
        /// Version that was skipped
        version: String,
    },
}

impl fmt::Display for ToolkitEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolkitEvent::Cloning { dependency } => write!(f, "Cloning: {dependency}"),
            ToolkitEvent::Fetching { dependency } => write!(f, "Fetching: {dependency}"),
            ToolkitEvent::CheckingOut {
                dependency,
                revision,
            } => write!(f, "Checking Out: {dependency} {revision}"),
            ToolkitEvent::DownloadingBinaries {
                dependency,
                version,
            } => write!(f, "Downloading Binaries: {dependency} {version}"),
            ToolkitEvent::SkippedDownloadingBinaries {
                dependency,
                version,
            } => write!(f, "Skipped Downloading Binaries: {dependency} {version}"),
            ToolkitEvent::SkippedBuilding {
                dependency,
                version,
            } => write!(f, "Skipped Building: {dependency} {version}"),
        }
    }
}

/// Asynchronous interface to the external dependency toolkit.
///
/// See the [module documentation](self) for the two-stage contract. All
/// methods may be called for different records concurrently; implementations
/// must not serialize unrelated records against each other.
pub trait Toolkit: Send + Sync + 'static {
    /// Update dependency checkouts for `directory`, yielding build units as
    /// they are discovered.
    ///
    /// The stream ends after the final unit once resolution succeeded; an
    /// `Err` item reports resolution failure and terminates the run.
    fn resolve(&self, directory: &Path) -> BoxStream<'static, Result<BuildJob>>;

    /// Execute one build unit for one platform inside `directory`.
    fn build(
        &self,
        directory: &Path,
        job: &BuildJob,
        platform: Platform,
    ) -> BoxFuture<'static, Result<()>>;

    /// Subscribe to the toolkit's lifecycle event side channel.
    ///
    /// Each call returns an independent subscription observing events
    /// emitted after it was created.
    fn events(&self) -> mpsc::UnboundedReceiver<ToolkitEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_display_names() {
        assert_eq!(Platform::Desktop.to_string(), "desktop");
        assert_eq!(Platform::Mobile.to_string(), "mobile");
        assert_eq!(Platform::Wearable.to_string(), "wearable");
    }

    #[test]
    fn test_platform_serde_roundtrip() {
        let toml = "platforms = [\"desktop\", \"wearable\"]";
        #[derive(serde::Deserialize)]
        struct Wrapper {
            platforms: Vec<Platform>,
        }
        let wrapper: Wrapper = toml::from_str(toml).unwrap();
        assert_eq!(wrapper.platforms, vec![Platform::Desktop, Platform::Wearable]);
    }
}
