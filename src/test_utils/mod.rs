//! Test utilities for Cartwheel.
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration suites under `tests/`. The centerpiece is
//! [`ScriptedToolkit`], a [`Toolkit`] double whose resolve and build
//! behavior is scripted per test so update runs can be driven without any
//! external executable.

use anyhow::Result;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt, stream};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};
use tokio::sync::{Notify, mpsc};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::events::EventHub;
use crate::toolkit::{BuildJob, Platform, Toolkit, ToolkitEvent};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests, once per process.
///
/// Respects `RUST_LOG` when no explicit level is given; does nothing when
/// neither is provided.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_ansi(true)
            .try_init();
    });
}

/// A build executed by the scripted toolkit, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedBuild {
    /// Dependency that was built.
    pub dependency: String,
    /// Platform it was built for.
    pub platform: Platform,
    /// Directory the build ran in.
    pub directory: PathBuf,
}

/// Scripted [`Toolkit`] double.
///
/// By default a resolve yields the configured jobs (emitting a `Fetching`
/// side-channel event per job) and every build succeeds instantly. Tests
/// can script a resolve failure, a failure for one dependency's builds, or
/// gate builds behind a [`Notify`] to hold a run in the build phase while
/// cancellation is exercised.
pub struct ScriptedToolkit {
    jobs: Vec<BuildJob>,
    resolve_error: Option<String>,
    failing_dependency: Option<String>,
    build_gate: Option<Arc<Notify>>,
    executed: Arc<Mutex<Vec<ExecutedBuild>>>,
    events: Arc<EventHub<ToolkitEvent>>,
}

impl ScriptedToolkit {
    /// Toolkit whose resolve discovers one job per name in `dependencies`.
    #[must_use]
    pub fn with_jobs(dependencies: &[&str]) -> Self {
        Self {
            jobs: dependencies.iter().copied().map(BuildJob::new).collect(),
            resolve_error: None,
            failing_dependency: None,
            build_gate: None,
            executed: Arc::new(Mutex::new(Vec::new())),
            events: Arc::new(EventHub::new()),
        }
    }

    /// Script the resolve stage to fail with `reason` before yielding any
    /// jobs.
    #[must_use]
    pub fn failing_resolve(reason: &str) -> Self {
        let mut toolkit = Self::with_jobs(&[]);
        toolkit.resolve_error = Some(reason.to_string());
        toolkit
    }

    /// Script every build of `dependency` to fail.
    #[must_use]
    pub fn failing_build(mut self, dependency: &str) -> Self {
        self.failing_dependency = Some(dependency.to_string());
        self
    }

    /// Make every build wait on `gate` before completing.
    ///
    /// `notify_waiters` releases the builds currently blocked; builds
    /// started afterwards block again.
    #[must_use]
    pub fn gated_builds(mut self, gate: Arc<Notify>) -> Self {
        self.build_gate = Some(gate);
        self
    }

    /// Builds executed so far, in execution order.
    #[must_use]
    pub fn executed_builds(&self) -> Vec<ExecutedBuild> {
        self.executed.lock().expect("executed builds lock poisoned").clone()
    }
}

impl Toolkit for ScriptedToolkit {
    fn resolve(&self, _directory: &Path) -> BoxStream<'static, Result<BuildJob>> {
        if let Some(reason) = &self.resolve_error {
            let error = anyhow::anyhow!("{reason}");
            return stream::once(async move { Err(error) }).boxed();
        }

        for job in &self.jobs {
            self.events.publish(ToolkitEvent::Fetching {
                dependency: job.dependency.clone(),
            });
        }
        stream::iter(self.jobs.clone().into_iter().map(Ok)).boxed()
    }

    fn build(
        &self,
        directory: &Path,
        job: &BuildJob,
        platform: Platform,
    ) -> BoxFuture<'static, Result<()>> {
        let executed = Arc::clone(&self.executed);
        let gate = self.build_gate.clone();
        let fails = self.failing_dependency.as_deref() == Some(job.dependency.as_str());
        let dependency = job.dependency.clone();
        let directory = directory.to_path_buf();

        async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            if fails {
                return Err(anyhow::anyhow!("scripted build failure for '{dependency}'"));
            }
            executed.lock().expect("executed builds lock poisoned").push(ExecutedBuild {
                dependency,
                platform,
                directory,
            });
            Ok(())
        }
        .boxed()
    }

    fn events(&self) -> mpsc::UnboundedReceiver<ToolkitEvent> {
        self.events.subscribe()
    }
}
