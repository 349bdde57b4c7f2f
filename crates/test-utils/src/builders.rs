#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use asyncproc::{AsyncProc, Dataflow, Gate};

use crate::manual_executor::ManualExecutor;

/// A scope whose procs run only when the returned executor is driven.
pub fn manual_scope() -> (Dataflow, ManualExecutor) {
    let executor = ManualExecutor::new();
    let scope = Dataflow::with_executor(executor.as_executor());
    (scope, executor)
}

/// A proc under test together with its gates and an action-run counter.
pub struct GatedProc {
    pub proc: AsyncProc,
    pub gates: Vec<Gate>,
    runs: Arc<AtomicUsize>,
}

impl GatedProc {
    /// How many times the action ran.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

/// Builder for `GatedProc` to simplify test setup.
pub struct GatedProcBuilder {
    scope: Dataflow,
    gates: Vec<(bool, bool)>,
    failure: Option<String>,
    daemon: bool,
}

impl GatedProcBuilder {
    pub fn new(scope: &Dataflow) -> Self {
        Self {
            scope: scope.clone(),
            gates: Vec::new(),
            failure: None,
            daemon: false,
        }
    }

    /// Add one gate with the given `(ready, active)` state.
    pub fn gate(mut self, ready: bool, active: bool) -> Self {
        self.gates.push((ready, active));
        self
    }

    /// Add `n` gates that start closed and active.
    pub fn closed_gates(mut self, n: usize) -> Self {
        self.gates.extend(std::iter::repeat_n((false, true), n));
        self
    }

    /// Make the action return an error with this message.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn daemon(mut self, daemon: bool) -> Self {
        self.daemon = daemon;
        self
    }

    pub fn build(self) -> GatedProc {
        let runs = Arc::new(AtomicUsize::new(0));
        let failure = self.failure;
        let counter = Arc::clone(&runs);

        let proc = AsyncProc::builder()
            .scope(&self.scope)
            .daemon(self.daemon)
            .build_with_action(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                match failure {
                    Some(message) => Err(anyhow::anyhow!(message)),
                    None => Ok(()),
                }
            });

        let gates = self
            .gates
            .into_iter()
            .map(|(ready, active)| {
                proc.gate(ready, active)
                    .expect("gate registration on a fresh proc")
            })
            .collect();

        GatedProc { proc, gates, runs }
    }
}
