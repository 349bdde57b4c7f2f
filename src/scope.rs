// src/scope.rs

//! Scope membership for procs.
//!
//! A [`Dataflow`] is the containing scope every non-daemon proc joins at
//! construction. It:
//! - keeps its live member procs alive until they complete, for as long as a
//!   client holds the scope (procs refer back to it weakly)
//! - supplies the default executor for its procs
//! - settles its own [`Completion`] once the last member leaves, or with the
//!   first member error

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::completion::{Completion, Outcome};
use crate::exec::{self, Executor};
use crate::proc::{AsyncProc, ProcId};

struct Inner {
    executor: Arc<dyn Executor>,
    children: Mutex<HashMap<ProcId, AsyncProc>>,
    completion: Completion,
}

#[derive(Clone)]
pub struct Dataflow {
    inner: Arc<Inner>,
}

impl Dataflow {
    /// A scope using the [default executor](crate::exec::default_executor).
    pub fn new() -> Self {
        Self::with_executor(exec::default_executor())
    }

    pub fn with_executor(executor: Arc<dyn Executor>) -> Self {
        Self {
            inner: Arc::new(Inner {
                executor,
                children: Mutex::new(HashMap::new()),
                completion: Completion::new(),
            }),
        }
    }

    pub fn executor(&self) -> Arc<dyn Executor> {
        Arc::clone(&self.inner.executor)
    }

    pub fn completion(&self) -> &Completion {
        &self.inner.completion
    }

    /// Block until every member has left. Returns the first member error, if
    /// any.
    pub fn join(&self) -> Outcome {
        self.inner.completion.wait()
    }

    pub fn child_count(&self) -> usize {
        self.inner.children.lock().len()
    }

    pub fn contains(&self, id: ProcId) -> bool {
        self.inner.children.lock().contains_key(&id)
    }

    pub(crate) fn downgrade(&self) -> WeakDataflow {
        WeakDataflow {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub(crate) fn enter(&self, proc: &AsyncProc) {
        let old = self.inner.children.lock().insert(proc.id(), proc.clone());
        debug_assert!(old.is_none());
        trace!(proc = %proc.id(), "proc entered scope");
    }

    /// Remove `id` from the member set. Returns whether it was a member.
    pub fn leave(&self, id: ProcId) -> bool {
        let (removed, now_empty) = {
            let mut children = self.inner.children.lock();
            let removed = children.remove(&id);
            (removed, children.is_empty())
        };

        // The removed handle may be the last strong reference to the proc;
        // drop it outside the lock.
        let Some(_proc) = removed else {
            return false;
        };

        trace!(proc = %id, "proc left scope");
        if now_empty {
            debug!("last member left scope; completing");
            self.inner.completion.complete();
        }
        true
    }

    pub(crate) fn child_finished(&self, id: ProcId, outcome: &Outcome) {
        if let Err(err) = outcome {
            if self.inner.completion.settle(Err(Arc::clone(err))) {
                debug!(proc = %id, error = %err, "member failed; scope failed");
            }
        }
        self.leave(id);
    }
}

/// Back-reference from a proc to its scope.
#[derive(Clone)]
pub(crate) struct WeakDataflow {
    inner: Weak<Inner>,
}

impl WeakDataflow {
    pub(crate) fn upgrade(&self) -> Option<Dataflow> {
        self.inner.upgrade().map(|inner| Dataflow { inner })
    }
}

impl Default for Dataflow {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dataflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataflow")
            .field("executor", &self.inner.executor)
            .field("children", &self.child_count())
            .field("completion", &self.inner.completion)
            .finish()
    }
}
