// src/exec/mod.rs

//! Executor layer.
//!
//! A fired proc hands its run step to an [`Executor`]. The gating core never
//! runs an action itself.
//!
//! - [`runtime`] provides [`TokioExecutor`], which runs jobs on a Tokio
//!   runtime's blocking pool (the current runtime, or a shared one built
//!   from [`RuntimeSection`](crate::config::RuntimeSection)).
//! - [`inline`] provides [`InlineExecutor`], which runs jobs on the
//!   submitting thread up to a nesting bound and hands deeper submissions to
//!   a fallback executor.
//!
//! Tests can provide their own `Executor` that records submissions and runs
//! them on demand.

use std::fmt;
use std::sync::Arc;

pub mod inline;
pub mod runtime;

pub use inline::InlineExecutor;
pub use runtime::{init_shared_runtime, TokioExecutor};

/// A unit of work submitted by a fired proc.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Trait abstracting how run steps are executed.
///
/// Implementations must eventually invoke every submitted job exactly once,
/// or drop it; a proc whose job is dropped unrun completes with
/// [`AsyncProcError::JobDropped`](crate::AsyncProcError::JobDropped).
/// Running a job synchronously inside `execute` is allowed only if the depth
/// of such nested runs is bounded.
pub trait Executor: Send + Sync + fmt::Debug {
    fn execute(&self, job: Job);
}

/// Executor used by scopes that were not given one: the Tokio runtime the
/// caller is running on, or else the shared runtime.
pub fn default_executor() -> Arc<dyn Executor> {
    match TokioExecutor::current() {
        Some(executor) => Arc::new(executor),
        None => Arc::new(TokioExecutor::shared()),
    }
}
