//! Process-backed [`Toolkit`] implementation.
//!
//! Drives the external toolkit executable (by default `carthage`) with
//! `tokio::process`: locate the executable once, spawn it per operation,
//! capture output, and translate exit status into typed errors.
//!
//! # Line protocol
//!
//! While a resolve runs, the toolkit's stdout is scanned line by line for
//! lifecycle markers, which are republished on the event side channel:
//!
//! ```text
//! *** Cloning <dependency>
//! *** Fetching <dependency>
//! *** Checking out <dependency> at "<revision>"
//! *** Downloading <dependency> binary at "<version>"
//! *** Skipped downloading <dependency> binary at "<version>"
//! *** Skipped building <dependency> at "<version>"
//! ```
//!
//! Unrecognized lines are ignored. Build units are enumerated from the
//! toolkit's checkouts directory once the resolve process exits cleanly.
//!
//! # Cancellation
//!
//! Every child process is spawned with `kill_on_drop`, so dropping the
//! future returned by [`Toolkit::resolve`] or [`Toolkit::build`] mid-flight
//! kills the external invocation. This is how updater cancellation
//! propagates past the process boundary.

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt, stream};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::core::CartwheelError;
use crate::events::EventHub;

use super::{BuildJob, Platform, Toolkit, ToolkitEvent};

/// Arguments for the stage-1 resolve invocation.
const RESOLVE_ARGS: [&str; 2] = ["update", "--no-build"];

/// Subcommand for a stage-2 build invocation.
const BUILD_SUBCOMMAND: &str = "build";

/// Directory (relative to a record's location) where the toolkit places
/// checked-out dependencies.
const CHECKOUTS_DIR: &str = "Carthage/Checkouts";

/// [`Toolkit`] implementation that shells out to the external executable.
pub struct CommandToolkit {
    command: PathBuf,
    events: Arc<EventHub<ToolkitEvent>>,
}

impl CommandToolkit {
    /// Locate `command` in PATH and wrap it.
    ///
    /// # Errors
    ///
    /// Returns [`CartwheelError::ToolkitNotFound`] when the executable
    /// cannot be found.
    pub fn new(command: &str) -> Result<Self> {
        let command = which::which(command).map_err(|_| CartwheelError::ToolkitNotFound {
            command: command.to_string(),
        })?;
        tracing::debug!(target: "toolkit", "Using toolkit executable: {}", command.display());
        Ok(Self {
            command,
            events: Arc::new(EventHub::new()),
        })
    }
}

impl Toolkit for CommandToolkit {
    fn resolve(&self, directory: &Path) -> BoxStream<'static, Result<BuildJob>> {
        let command = self.command.clone();
        let directory = directory.to_path_buf();
        let events = Arc::clone(&self.events);

        // One async block performs the whole external run; the buffered jobs
        // are flattened into the stream afterwards so consumers still see a
        // per-unit sequence.
        stream::once(run_resolve(command, directory, events))
            .map(|result| match result {
                Ok(jobs) => stream::iter(jobs.into_iter().map(Ok)).left_stream(),
                Err(error) => stream::once(async move { Err(error) }).right_stream(),
            })
            .flatten()
            .boxed()
    }

    fn build(
        &self,
        directory: &Path,
        job: &BuildJob,
        platform: Platform,
    ) -> BoxFuture<'static, Result<()>> {
        run_build(self.command.clone(), directory.to_path_buf(), job.clone(), platform).boxed()
    }

    fn events(&self) -> mpsc::UnboundedReceiver<ToolkitEvent> {
        self.events.subscribe()
    }
}

/// Run the resolve invocation, publishing lifecycle events as they appear,
/// and enumerate the discovered build units on success.
async fn run_resolve(
    command: PathBuf,
    directory: PathBuf,
    events: Arc<EventHub<ToolkitEvent>>,
) -> Result<Vec<BuildJob>> {
    tracing::debug!(
        target: "toolkit",
        "Executing command: {} {} in {}",
        command.display(),
        RESOLVE_ARGS.join(" "),
        directory.display()
    );

    let mut child = Command::new(&command)
        .args(RESOLVE_ARGS)
        .current_dir(&directory)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|error| CartwheelError::ToolkitCommandError {
            operation: RESOLVE_ARGS[0].to_string(),
            stderr: error.to_string(),
        })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow::anyhow!("toolkit stdout was not captured"))?;
    let mut lines = BufReader::new(stdout).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .with_context(|| "Failed to read toolkit output")?
    {
        tracing::trace!(target: "toolkit", "{line}");
        if let Some(event) = parse_event(&line) {
            events.publish(event);
        }
    }

    // stdout hit EOF; drain stderr before reaping the exit status.
    let mut stderr_buf = String::new();
    if let Some(mut stderr) = child.stderr.take() {
        stderr.read_to_string(&mut stderr_buf).await.ok();
    }

    let status = child.wait().await.with_context(|| "Failed to wait for toolkit")?;
    if !status.success() {
        let reason = if stderr_buf.trim().is_empty() {
            status.to_string()
        } else {
            stderr_buf.trim().to_string()
        };
        return Err(CartwheelError::ResolveFailed {
            directory: directory.display().to_string(),
            reason,
        }
        .into());
    }

    list_build_jobs(&directory).await
}

/// Enumerate the checkouts directory into build units, in stable name order.
///
/// A resolve that produced no checkouts is a success with zero jobs, not an
/// error.
async fn list_build_jobs(directory: &Path) -> Result<Vec<BuildJob>> {
    let checkouts = directory.join(CHECKOUTS_DIR);
    if !checkouts.is_dir() {
        tracing::debug!(
            target: "toolkit",
            "No checkouts directory at {}, nothing to build",
            checkouts.display()
        );
        return Ok(Vec::new());
    }

    let mut jobs = Vec::new();
    let mut entries = tokio::fs::read_dir(&checkouts)
        .await
        .with_context(|| format!("Failed to read checkouts directory: {}", checkouts.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            jobs.push(BuildJob::new(entry.file_name().to_string_lossy().into_owned()));
        }
    }
    jobs.sort_by(|a, b| a.dependency.cmp(&b.dependency));
    Ok(jobs)
}

/// Run one build invocation for one unit and platform.
async fn run_build(
    command: PathBuf,
    directory: PathBuf,
    job: BuildJob,
    platform: Platform,
) -> Result<()> {
    tracing::debug!(
        target: "toolkit",
        "Executing command: {} {} {} --platform {} in {}",
        command.display(),
        BUILD_SUBCOMMAND,
        job.dependency,
        toolkit_platform_name(platform),
        directory.display()
    );

    let output = Command::new(&command)
        .arg(BUILD_SUBCOMMAND)
        .arg(&job.dependency)
        .arg("--platform")
        .arg(toolkit_platform_name(platform))
        .current_dir(&directory)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|error| CartwheelError::ToolkitCommandError {
            operation: BUILD_SUBCOMMAND.to_string(),
            stderr: error.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = if stderr.trim().is_empty() {
            output.status.to_string()
        } else {
            stderr.trim().to_string()
        };
        return Err(CartwheelError::BuildFailed {
            dependency: job.dependency,
            platform: platform.to_string(),
            reason,
        }
        .into());
    }

    Ok(())
}

/// Platform name as the external toolkit spells it.
fn toolkit_platform_name(platform: Platform) -> &'static str {
    match platform {
        Platform::Desktop => "Mac",
        Platform::Mobile => "iOS",
        Platform::Wearable => "watchOS",
    }
}

/// Parse one stdout line into a lifecycle event, if it matches the marker
/// grammar described in the [module documentation](self).
fn parse_event(line: &str) -> Option<ToolkitEvent> {
    let rest = line.trim().strip_prefix("*** ")?;

    if let Some(dependency) = rest.strip_prefix("Cloning ") {
        return Some(ToolkitEvent::Cloning {
            dependency: dependency.trim().to_string(),
        });
    }
    if let Some(dependency) = rest.strip_prefix("Fetching ") {
        return Some(ToolkitEvent::Fetching {
            dependency: dependency.trim().to_string(),
        });
    }
    if let Some(tail) = rest.strip_prefix("Checking out ") {
        let (dependency, revision) = split_at_marker(tail, " at ")?;
        return Some(ToolkitEvent::CheckingOut {
            dependency,
            revision,
        });
    }
    if let Some(tail) = rest.strip_prefix("Downloading ") {
        let (dependency, version) =
            split_at_marker(tail, " binary at ").or_else(|| split_at_marker(tail, " at "))?;
        return Some(ToolkitEvent::DownloadingBinaries {
            dependency,
            version,
        });
    }
    if let Some(tail) = rest.strip_prefix("Skipped downloading ") {
        let (dependency, version) =
            split_at_marker(tail, " binary at ").or_else(|| split_at_marker(tail, " at "))?;
        return Some(ToolkitEvent::SkippedDownloadingBinaries {
            dependency,
            version,
        });
    }
    if let Some(tail) = rest.strip_prefix("Skipped building ") {
        let (dependency, version) = split_at_marker(tail, " at ")?;
        return Some(ToolkitEvent::SkippedBuilding {
            dependency,
            version,
        });
    }

    None
}

/// Split `"<name><marker>\"<value>\""` into `(name, value)`, stripping the
/// quotes around the value.
fn split_at_marker(tail: &str, marker: &str) -> Option<(String, String)> {
    let (name, value) = tail.split_once(marker)?;
    let value = value.trim().trim_matches('"');
    Some((name.trim().to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cloning_and_fetching() {
        assert_eq!(
            parse_event("*** Cloning ReactiveCocoa"),
            Some(ToolkitEvent::Cloning {
                dependency: "ReactiveCocoa".to_string()
            })
        );
        assert_eq!(
            parse_event("*** Fetching Result"),
            Some(ToolkitEvent::Fetching {
                dependency: "Result".to_string()
            })
        );
    }

    #[test]
    fn test_parse_checking_out_with_revision() {
        assert_eq!(
            parse_event("*** Checking out Alamofire at \"v4.9.1\""),
            Some(ToolkitEvent::CheckingOut {
                dependency: "Alamofire".to_string(),
                revision: "v4.9.1".to_string()
            })
        );
    }

    #[test]
    fn test_parse_binary_events() {
        assert_eq!(
            parse_event("*** Downloading Alamofire binary at \"v4.9.1\""),
            Some(ToolkitEvent::DownloadingBinaries {
                dependency: "Alamofire".to_string(),
                version: "v4.9.1".to_string()
            })
        );
        assert_eq!(
            parse_event("*** Skipped downloading Alamofire binary at \"v4.9.1\""),
            Some(ToolkitEvent::SkippedDownloadingBinaries {
                dependency: "Alamofire".to_string(),
                version: "v4.9.1".to_string()
            })
        );
        assert_eq!(
            parse_event("*** Skipped building Alamofire at \"v4.9.1\""),
            Some(ToolkitEvent::SkippedBuilding {
                dependency: "Alamofire".to_string(),
                version: "v4.9.1".to_string()
            })
        );
    }

    #[test]
    fn test_unrecognized_lines_are_ignored() {
        assert_eq!(parse_event("plain output"), None);
        assert_eq!(parse_event("*** Unknown marker"), None);
        assert_eq!(parse_event(""), None);
    }

    #[test]
    fn test_platform_names_match_toolkit_spelling() {
        assert_eq!(toolkit_platform_name(Platform::Desktop), "Mac");
        assert_eq!(toolkit_platform_name(Platform::Mobile), "iOS");
        assert_eq!(toolkit_platform_name(Platform::Wearable), "watchOS");
    }
}
