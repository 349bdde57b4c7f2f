// src/proc/task.rs

//! The asynchronous procedure and its fire/run protocol.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::completion::{Completion, Outcome};
use crate::errors::{AsyncProcError, ProtocolViolation, Result};
use crate::exec::Executor;
use crate::proc::action::Action;
use crate::proc::gate::{Gate, GateKind, GateSlot};
use crate::proc::snapshot::{GateSnapshot, ProcSnapshot};
use crate::proc::{ProcId, ProcState};
use crate::scope::{Dataflow, WeakDataflow};

/// Index of the control gate in every gate table.
const CONTROL: usize = 0;

/// Whether the full-scan consistency check runs at every firing.
const CHECKING: bool = cfg!(any(debug_assertions, feature = "checking"));

/// Everything guarded by the proc's lock.
pub(crate) struct ProcCore {
    pub(crate) state: ProcState,
    pub(crate) daemon: bool,
    pub(crate) gates: Vec<GateSlot>,
    /// Number of gates that are `active && !ready`.
    pub(crate) blocked: usize,
}

impl ProcCore {
    fn new() -> Self {
        let mut gates = Vec::with_capacity(4);
        gates.push(GateSlot {
            kind: GateKind::Control,
            ready: false,
            active: true,
        });

        Self {
            state: ProcState::Created,
            daemon: false,
            gates,
            blocked: 1,
        }
    }

    fn register(&mut self, id: ProcId, kind: GateKind, ready: bool, active: bool) -> Result<usize> {
        if !self.state.accepts_gates() {
            return Err(AsyncProcError::RegistrationClosed {
                proc: id,
                state: self.state,
            });
        }

        let slot = GateSlot {
            kind,
            ready,
            active,
        };
        if slot.is_blocking() {
            self.blocked += 1;
        }
        self.gates.push(slot);
        Ok(self.gates.len() - 1)
    }

    fn block(&mut self, gate: usize) {
        let slot = &mut self.gates[gate];
        if !slot.ready {
            return;
        }
        slot.ready = false;
        if !slot.active || self.state.is_terminal() {
            return;
        }
        self.blocked += 1;
    }

    /// Returns `true` if this call fired the proc.
    fn unblock(&mut self, id: ProcId, gate: usize) -> bool {
        let slot = &mut self.gates[gate];
        if slot.ready {
            return false;
        }
        slot.ready = true;
        if !slot.active || self.state.is_terminal() {
            return false;
        }
        self.release(id, gate)
    }

    /// Returns `true` if this call fired the proc.
    fn set_active(&mut self, id: ProcId, gate: usize, active: bool) -> bool {
        let slot = &mut self.gates[gate];
        if slot.active == active {
            return false;
        }
        let was_blocking = slot.is_blocking();
        slot.active = active;
        let now_blocking = slot.is_blocking();

        if was_blocking == now_blocking || self.state.is_terminal() {
            return false;
        }
        if now_blocking {
            self.blocked += 1;
            return false;
        }
        self.release(id, gate)
    }

    /// One blocking gate stopped blocking. Fires when the count reaches zero.
    fn release(&mut self, id: ProcId, gate: usize) -> bool {
        if self.blocked == 0 {
            ProtocolViolation::CountUnderflow { proc: id, gate }.raise();
        }
        self.blocked -= 1;
        if self.blocked > 0 {
            return false;
        }
        self.begin_run(id);
        true
    }

    /// Transition to `Running` and take the control token back in the same
    /// critical section, so no later mutation can observe a zero count.
    fn begin_run(&mut self, id: ProcId) {
        self.state = ProcState::Running;
        let control = &mut self.gates[CONTROL];
        control.ready = false;
        self.blocked += 1;

        if CHECKING {
            self.check_gates(id);
        }
    }

    /// At firing, only the control gate may be closed, and the maintained
    /// count must match a full recount.
    fn check_gates(&self, id: ProcId) {
        let mut actual = 0;
        for (index, slot) in self.gates.iter().enumerate() {
            if !slot.active {
                continue;
            }
            if !slot.ready {
                actual += 1;
            }
            let must_be_blocked = index == CONTROL;
            if must_be_blocked == slot.ready {
                ProtocolViolation::WrongGateState {
                    proc: id,
                    gate: index,
                    ready: slot.ready,
                }
                .raise();
            }
        }
        if actual != self.blocked {
            ProtocolViolation::CountMismatch {
                proc: id,
                actual,
                maintained: self.blocked,
            }
            .raise();
        }
    }
}

pub(crate) struct ProcInner {
    pub(crate) id: ProcId,
    name: Option<Cow<'static, str>>,
    pub(crate) core: Mutex<ProcCore>,
    action: Mutex<Option<Box<dyn Action>>>,
    executor: Arc<dyn Executor>,
    scope: WeakDataflow,
    completion: Completion,
}

impl ProcInner {
    pub(crate) fn block_gate(&self, gate: usize) {
        self.core.lock().block(gate);
        trace!(proc = %self.id, gate, "gate blocked");
    }

    pub(crate) fn unblock_gate(self: &Arc<Self>, gate: usize) {
        let fired = self.core.lock().unblock(self.id, gate);
        trace!(proc = %self.id, gate, fired, "gate unblocked");
        if fired {
            self.fire();
        }
    }

    pub(crate) fn set_gate_active(self: &Arc<Self>, gate: usize, active: bool) {
        let fired = self.core.lock().set_active(self.id, gate, active);
        trace!(proc = %self.id, gate, active, fired, "gate activity changed");
        if fired {
            self.fire();
        }
    }

    /// Hand the run step to the executor. Called after the lock is released;
    /// the `Running` transition already happened under it.
    fn fire(self: &Arc<Self>) {
        debug!(proc = %self.id, name = ?self.name, "all gates open; submitting to executor");
        let step = RunStep(Some(Arc::clone(self)));
        self.executor.execute(Box::new(move || step.run()));
    }

    /// The run step: invoke the action once and report its outcome.
    ///
    /// Action errors and panics become the proc's error outcome. A protocol
    /// violation raised by code inside the action is re-raised untouched.
    fn run(self: Arc<Self>) {
        let action = self.action.lock().take();
        let result = match action {
            None => Err(AsyncProcError::MissingAction(self.id)),
            Some(action) => match panic::catch_unwind(AssertUnwindSafe(|| action.run())) {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => Err(AsyncProcError::ActionFailed(err)),
                Err(payload) => {
                    if payload.is::<ProtocolViolation>() {
                        panic::resume_unwind(payload);
                    }
                    Err(AsyncProcError::ActionPanicked(panic_message(&*payload)))
                }
            },
        };
        self.finish(result.map_err(Arc::new));
    }

    fn finish(&self, outcome: Outcome) {
        let daemon = {
            let mut core = self.core.lock();
            if core.state.is_terminal() {
                trace!(proc = %self.id, "already completed; ignoring");
                return;
            }
            core.state = ProcState::Completed;
            core.daemon
        };

        match &outcome {
            Ok(()) => debug!(proc = %self.id, "proc completed"),
            Err(err) => warn!(proc = %self.id, error = %err, "proc completed with error"),
        }

        self.completion.settle(outcome.clone());
        if daemon {
            return;
        }
        // A scope dropped by every client has nobody left to report to.
        if let Some(scope) = self.scope.upgrade() {
            scope.child_finished(self.id, &outcome);
        }
    }
}

/// The submitted run step. An executor that drops the job without running
/// it (a runtime shutting down, say) completes the proc with
/// [`AsyncProcError::JobDropped`] instead of leaving it `Running`.
struct RunStep(Option<Arc<ProcInner>>);

impl RunStep {
    fn run(mut self) {
        if let Some(inner) = self.0.take() {
            inner.run();
        }
    }
}

impl Drop for RunStep {
    fn drop(&mut self) {
        if let Some(inner) = self.0.take() {
            warn!(proc = %inner.id, "executor dropped the run step without running it");
            inner.finish(Err(Arc::new(AsyncProcError::JobDropped(inner.id))));
        }
    }
}

/// An asynchronous procedure: runs its action once, after every gate opens.
///
/// The handle is cheap to clone; all clones refer to the same proc.
///
/// ```no_run
/// use asyncproc::{AsyncProc, Port};
///
/// let proc = AsyncProc::builder().build();
/// let input = proc.gate(false, true).unwrap();
/// proc.set_action(|| {
///     println!("input arrived");
///     Ok(())
/// })
/// .unwrap();
///
/// proc.start();     // still waiting on `input`
/// input.unblock();  // fires
/// proc.completion().wait().unwrap();
/// ```
#[derive(Clone)]
pub struct AsyncProc {
    inner: Arc<ProcInner>,
}

impl AsyncProc {
    /// Create a proc in a fresh default scope with the given action.
    pub fn new<A: Action>(action: A) -> Self {
        Self::builder().build_with_action(action)
    }

    pub fn builder() -> ProcBuilder {
        ProcBuilder::default()
    }

    pub(crate) fn from_inner(inner: Arc<ProcInner>) -> Self {
        Self { inner }
    }

    pub fn id(&self) -> ProcId {
        self.inner.id
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn state(&self) -> ProcState {
        self.inner.core.lock().state
    }

    pub fn is_daemon(&self) -> bool {
        self.inner.core.lock().daemon
    }

    /// Whether the proc has not completed yet.
    pub fn is_alive(&self) -> bool {
        !self.is_completed()
    }

    pub fn is_completed(&self) -> bool {
        self.state().is_terminal()
    }

    /// The scope this proc was built in, while any client still holds it.
    pub fn scope(&self) -> Option<Dataflow> {
        self.inner.scope.upgrade()
    }

    /// Observers of the final outcome.
    pub fn completion(&self) -> &Completion {
        &self.inner.completion
    }

    /// Detach from the scope's parent/child tracking. One-way: `false`, or a
    /// repeated `true`, is ignored.
    pub fn set_daemon(&self, daemon: bool) {
        if !daemon {
            return;
        }
        {
            let mut core = self.inner.core.lock();
            if core.daemon {
                return;
            }
            core.daemon = true;
        }
        debug!(proc = %self.inner.id, "proc became daemon; leaving scope");
        if let Some(scope) = self.inner.scope.upgrade() {
            scope.leave(self.inner.id);
        }
    }

    /// Deliver the control token. Only the first call on a `Created` proc
    /// has an effect.
    pub fn start(&self) {
        let fired = {
            let mut core = self.inner.core.lock();
            if core.state != ProcState::Created {
                trace!(proc = %self.inner.id, state = ?core.state, "start ignored");
                return;
            }
            core.state = ProcState::Blocked;
            core.unblock(self.inner.id, CONTROL)
        };
        debug!(proc = %self.inner.id, fired, "proc started");
        if fired {
            self.inner.fire();
        }
    }

    /// Register a plain signal gate with the given initial state.
    pub fn gate(&self, ready: bool, active: bool) -> Result<Gate> {
        self.register(GateKind::Signal, ready, active)
    }

    /// Register a gate under a diagnostics label.
    pub fn labeled_gate(
        &self,
        label: impl Into<Cow<'static, str>>,
        ready: bool,
        active: bool,
    ) -> Result<Gate> {
        self.register(GateKind::Labeled(label.into()), ready, active)
    }

    fn register(&self, kind: GateKind, ready: bool, active: bool) -> Result<Gate> {
        let index = self
            .inner
            .core
            .lock()
            .register(self.inner.id, kind, ready, active)?;
        trace!(proc = %self.inner.id, gate = index, ready, active, "gate registered");
        Ok(Gate::new(Arc::clone(&self.inner), index))
    }

    /// Install or replace the action. Only possible before the proc fires.
    pub fn set_action<A: Action>(&self, action: A) -> Result<()> {
        let core = self.inner.core.lock();
        if !core.state.accepts_gates() {
            return Err(AsyncProcError::ActionClosed {
                proc: self.inner.id,
                state: core.state,
            });
        }
        *self.inner.action.lock() = Some(Box::new(action));
        Ok(())
    }

    /// Finish normally without running the action. Ignored if already
    /// completed.
    pub fn on_complete(&self) {
        self.inner.finish(Ok(()));
    }

    /// Finish with an error without running the action. Ignored if already
    /// completed.
    pub fn on_error(&self, err: impl Into<AsyncProcError>) {
        self.inner.finish(Err(Arc::new(err.into())));
    }

    pub fn snapshot(&self) -> ProcSnapshot {
        let core = self.inner.core.lock();
        ProcSnapshot {
            id: self.inner.id,
            name: self.inner.name.as_ref().map(|n| n.to_string()),
            state: core.state,
            daemon: core.daemon,
            closed_gates: core.blocked,
            gates: core
                .gates
                .iter()
                .enumerate()
                .map(|(index, slot)| GateSnapshot {
                    index,
                    kind: slot.kind.clone(),
                    ready: slot.ready,
                    active: slot.active,
                })
                .collect(),
        }
    }

    /// Diagnostic dump of every registered gate, in registration order.
    pub fn gates_to_string(&self) -> String {
        self.snapshot().gates_to_string()
    }
}

impl fmt::Display for AsyncProc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AsyncProc#{}", self.inner.id)?;
        if let Some(name) = &self.inner.name {
            write!(f, "({name})")?;
        }
        write!(f, "/{:?}", self.state())
    }
}

impl fmt::Debug for AsyncProc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncProc")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Configures and constructs an [`AsyncProc`].
#[derive(Default)]
pub struct ProcBuilder {
    name: Option<Cow<'static, str>>,
    scope: Option<Dataflow>,
    executor: Option<Arc<dyn Executor>>,
    daemon: bool,
}

impl ProcBuilder {
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Scope to join. Defaults to a fresh [`Dataflow`] that nothing else
    /// observes.
    pub fn scope(mut self, scope: &Dataflow) -> Self {
        self.scope = Some(scope.clone());
        self
    }

    /// Executor for the run step. Defaults to the scope's executor.
    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Build the proc outside the scope's parent/child tracking.
    pub fn daemon(mut self, daemon: bool) -> Self {
        self.daemon = daemon;
        self
    }

    /// Build a proc with no action yet; install one with
    /// [`AsyncProc::set_action`] before starting it.
    pub fn build(self) -> AsyncProc {
        let scope = self.scope.unwrap_or_default();
        let executor = self.executor.unwrap_or_else(|| scope.executor());
        let mut core = ProcCore::new();
        core.daemon = self.daemon;

        let proc = AsyncProc {
            inner: Arc::new(ProcInner {
                id: ProcId::next(),
                name: self.name,
                core: Mutex::new(core),
                action: Mutex::new(None),
                executor,
                scope: scope.downgrade(),
                completion: Completion::new(),
            }),
        };

        if !self.daemon {
            scope.enter(&proc);
        }
        trace!(proc = %proc.inner.id, daemon = self.daemon, "proc created");
        proc
    }

    pub fn build_with_action<A: Action>(self, action: A) -> AsyncProc {
        let proc = self.build();
        *proc.inner.action.lock() = Some(Box::new(action));
        proc
    }

    /// Build the proc, let `setup` register its gates, and install the
    /// action it returns.
    ///
    /// ```no_run
    /// use asyncproc::{AsyncProc, Port};
    ///
    /// let mut input = None;
    /// let proc = AsyncProc::builder().build_with(|p| {
    ///     input = Some(p.gate(false, true).unwrap());
    ///     || Ok(())
    /// });
    /// proc.start();
    /// input.unwrap().unblock();
    /// ```
    pub fn build_with<S, A>(self, setup: S) -> AsyncProc
    where
        S: FnOnce(&AsyncProc) -> A,
        A: Action,
    {
        let proc = self.build();
        let action = setup(&proc);
        *proc.inner.action.lock() = Some(Box::new(action));
        proc
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation_of(f: impl FnOnce()) -> ProtocolViolation {
        let payload = panic::catch_unwind(AssertUnwindSafe(f)).expect_err("expected a violation");
        *payload
            .downcast::<ProtocolViolation>()
            .expect("payload should be a ProtocolViolation")
    }

    #[test]
    fn fresh_core_counts_only_the_control_gate() {
        let core = ProcCore::new();
        assert_eq!(core.state, ProcState::Created);
        assert_eq!(core.blocked, 1);
        assert_eq!(core.gates.len(), 1);
        assert_eq!(core.gates[CONTROL].kind, GateKind::Control);
    }

    #[test]
    fn release_with_zero_count_is_an_underflow() {
        let id = ProcId::next();
        let mut core = ProcCore::new();
        core.blocked = 0;

        let v = violation_of(|| {
            core.release(id, 3);
        });
        assert_eq!(v, ProtocolViolation::CountUnderflow { proc: id, gate: 3 });
    }

    #[test]
    fn firing_with_a_closed_user_gate_is_detected() {
        let id = ProcId::next();
        let mut core = ProcCore::new();
        core.state = ProcState::Blocked;
        core.gates[CONTROL].ready = true;
        // Closed and active, but deliberately left out of the count.
        core.gates.push(GateSlot {
            kind: GateKind::Signal,
            ready: false,
            active: true,
        });
        core.blocked = 0;

        let v = violation_of(|| core.begin_run(id));
        assert_eq!(
            v,
            ProtocolViolation::WrongGateState {
                proc: id,
                gate: 1,
                ready: false,
            }
        );
    }

    #[test]
    fn count_drift_is_detected_at_firing() {
        let id = ProcId::next();
        let mut core = ProcCore::new();
        core.state = ProcState::Blocked;
        core.gates[CONTROL].ready = true;
        core.blocked = 1;

        // begin_run adds the control gate back: maintained 2, actual 1.
        let v = violation_of(|| core.begin_run(id));
        assert_eq!(
            v,
            ProtocolViolation::CountMismatch {
                proc: id,
                actual: 1,
                maintained: 2,
            }
        );
    }

    #[test]
    fn inactive_gates_are_ignored_by_the_check() {
        let id = ProcId::next();
        let mut core = ProcCore::new();
        core.state = ProcState::Blocked;
        core.gates[CONTROL].ready = true;
        core.gates.push(GateSlot {
            kind: GateKind::Labeled("optional".into()),
            ready: false,
            active: false,
        });
        core.blocked = 0;

        core.begin_run(id);
        assert_eq!(core.state, ProcState::Running);
        assert_eq!(core.blocked, 1);
        assert!(!core.gates[CONTROL].ready);
    }

    #[test]
    fn panic_message_reads_string_payloads() {
        let payload = panic::catch_unwind(|| panic!("boom {}", 7)).unwrap_err();
        assert_eq!(panic_message(&*payload), "boom 7");

        let payload = panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(&*payload), "static");
    }
}
