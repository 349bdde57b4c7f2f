// src/completion.rs

//! Terminal-outcome signalling for procs and scopes.
//!
//! A [`Completion`] settles at most once, either normally or with an error.
//! Observers can:
//! - poll it ([`Completion::is_completed`], [`Completion::outcome`])
//! - block a thread on it ([`Completion::wait`], [`Completion::wait_timeout`])
//! - await it from async code ([`Completion::completed`])
//! - register a callback ([`Completion::on_done`])

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;
use tracing::warn;

use crate::errors::{AsyncProcError, ProtocolViolation};

/// Final outcome. The error is shared between all observers.
pub type Outcome = std::result::Result<(), Arc<AsyncProcError>>;

type Callback = Box<dyn FnOnce(&Outcome) + Send + 'static>;

struct State {
    outcome: Option<Outcome>,
    callbacks: Vec<Callback>,
}

struct Inner {
    state: Mutex<State>,
    settled: Condvar,
    notify: Notify,
}

#[derive(Clone)]
pub struct Completion {
    inner: Arc<Inner>,
}

impl Completion {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    outcome: None,
                    callbacks: Vec::new(),
                }),
                settled: Condvar::new(),
                notify: Notify::new(),
            }),
        }
    }

    /// Settle normally. Returns `false` if already settled.
    pub fn complete(&self) -> bool {
        self.settle(Ok(()))
    }

    /// Settle with an error. Returns `false` if already settled.
    pub fn fail(&self, err: impl Into<AsyncProcError>) -> bool {
        self.settle(Err(Arc::new(err.into())))
    }

    /// Settle with the given outcome. First caller wins; callbacks run on the
    /// settling thread after the lock is released, and a panicking callback
    /// does not stop the others.
    pub fn settle(&self, outcome: Outcome) -> bool {
        let callbacks = {
            let mut state = self.inner.state.lock();
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(outcome.clone());
            std::mem::take(&mut state.callbacks)
        };

        self.inner.settled.notify_all();
        self.inner.notify.notify_waiters();

        for callback in callbacks {
            run_callback(callback, &outcome);
        }
        true
    }

    pub fn is_completed(&self) -> bool {
        self.inner.state.lock().outcome.is_some()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.inner.state.lock().outcome.clone()
    }

    /// Block the current thread until settled.
    pub fn wait(&self) -> Outcome {
        let mut state = self.inner.state.lock();
        loop {
            if let Some(outcome) = &state.outcome {
                return outcome.clone();
            }
            self.inner.settled.wait(&mut state);
        }
    }

    /// Block for at most `timeout`. Returns `None` if still unsettled.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Outcome> {
        let mut state = self.inner.state.lock();
        if state.outcome.is_none() {
            self.inner
                .settled
                .wait_while_for(&mut state, |s| s.outcome.is_none(), timeout);
        }
        state.outcome.clone()
    }

    /// Wait asynchronously until settled.
    pub async fn completed(&self) -> Outcome {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(outcome) = self.outcome() {
                return outcome;
            }
            notified.await;
        }
    }

    /// Run `callback` once settled; immediately if already settled.
    pub fn on_done<F>(&self, callback: F)
    where
        F: FnOnce(&Outcome) + Send + 'static,
    {
        let outcome = {
            let mut state = self.inner.state.lock();
            match &state.outcome {
                Some(outcome) => outcome.clone(),
                None => {
                    state.callbacks.push(Box::new(callback));
                    return;
                }
            }
        };
        run_callback(Box::new(callback), &outcome);
    }
}

/// A panicking observer is logged and skipped; the settling thread carries on
/// with the remaining observers. Protocol violations keep unwinding.
fn run_callback(callback: Callback, outcome: &Outcome) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(outcome))) {
        if payload.is::<ProtocolViolation>() {
            panic::resume_unwind(payload);
        }
        warn!("completion callback panicked; ignoring");
    }
}

impl Default for Completion {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Completion")
            .field("outcome", &state.outcome)
            .field("callbacks", &state.callbacks.len())
            .finish()
    }
}
