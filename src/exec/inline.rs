// src/exec/inline.rs

//! Executor that runs jobs on the submitting thread, with bounded nesting.
//!
//! When a job fires another proc, that proc's run step would run nested
//! inside the first one. Chains of such firings could grow the stack without
//! limit, so past `max_depth` nested runs on a thread the job goes to the
//! fallback executor instead.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::{Executor, Job};

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

pub struct InlineExecutor {
    fallback: Arc<dyn Executor>,
    max_depth: usize,
}

impl InlineExecutor {
    pub fn new(fallback: Arc<dyn Executor>, max_depth: usize) -> Self {
        Self {
            fallback,
            max_depth,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Nesting depth of inline runs on the current thread.
    pub fn current_depth() -> usize {
        DEPTH.with(Cell::get)
    }
}

/// Restores the depth counter even if the job unwinds.
struct DepthGuard;

impl DepthGuard {
    fn enter() -> Self {
        DEPTH.with(|d| d.set(d.get() + 1));
        DepthGuard
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|d| d.set(d.get() - 1));
    }
}

impl Executor for InlineExecutor {
    fn execute(&self, job: Job) {
        let depth = Self::current_depth();
        if depth >= self.max_depth {
            trace!(depth, "inline depth exhausted; using fallback executor");
            self.fallback.execute(job);
            return;
        }

        let _guard = DepthGuard::enter();
        job();
    }
}

impl fmt::Debug for InlineExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineExecutor")
            .field("fallback", &self.fallback)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}
