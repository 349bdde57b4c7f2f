// src/exec/runtime.rs

//! Tokio-backed executor.

use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, info, trace};

use crate::config::RuntimeSection;
use crate::errors::{AsyncProcError, Result};

use super::{Executor, Job};

static SHARED: OnceLock<Runtime> = OnceLock::new();

/// Runs jobs with `spawn_blocking` on a Tokio runtime, since actions are
/// synchronous and may block.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Executor for the runtime the caller is currently inside, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    /// Executor for the process-wide shared runtime.
    ///
    /// # Panics
    ///
    /// Panics if the shared runtime was not initialised with
    /// [`init_shared_runtime`] and building one with default settings fails.
    pub fn shared() -> Self {
        let runtime = SHARED.get_or_init(|| {
            build_runtime(&RuntimeSection::default())
                .unwrap_or_else(|err| panic!("failed to build shared runtime: {err}"))
        });
        Self::new(runtime.handle().clone())
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, job: Job) {
        // The join handle is dropped: outcomes are reported through the
        // proc's completion, not the task. A runtime that is shutting down
        // drops the job unrun; the run step reports that itself.
        trace!("submitting job to blocking pool");
        drop(self.handle.spawn_blocking(job));
    }
}

/// Build the shared runtime from configuration.
///
/// Must be called before the first use of [`TokioExecutor::shared`]; a
/// second call is a configuration error.
pub fn init_shared_runtime(cfg: &RuntimeSection) -> Result<()> {
    let runtime = build_runtime(cfg)?;
    SHARED.set(runtime).map_err(|_| {
        AsyncProcError::ConfigError("shared runtime already initialised".to_string())
    })?;
    info!(
        worker_threads = cfg.worker_threads,
        thread_name = %cfg.thread_name,
        "shared runtime initialised"
    );
    Ok(())
}

fn build_runtime(cfg: &RuntimeSection) -> Result<Runtime> {
    let mut builder = Builder::new_multi_thread();
    builder.thread_name(cfg.thread_name.clone()).enable_all();
    if let Some(threads) = cfg.worker_threads {
        builder.worker_threads(threads);
    }
    if let Some(threads) = cfg.max_blocking_threads {
        builder.max_blocking_threads(threads);
    }
    let runtime = builder.build()?;
    debug!("built multi-thread runtime");
    Ok(runtime)
}
