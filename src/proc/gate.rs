// src/proc/gate.rs

//! Gates: the readiness conditions an [`AsyncProc`] waits on.
//!
//! A gate is a boolean condition with an activity switch. Its state lives in
//! the owning proc's gate table and is only touched under the proc's lock; the
//! [`Gate`] value handed to producers is a handle to the proc plus an index
//! into that table.
//!
//! A gate counts towards the proc's closed-gate count iff it is
//! `active && !ready`. When that count drops to zero the proc fires.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use super::task::ProcInner;
use super::{AsyncProc, ProcId};

/// Capability shared by every gate flavour.
///
/// Client layers that carry a payload (a single-value cell, a queue) wrap a
/// [`Gate`] and implement `Port` by delegation, so code that only toggles
/// readiness does not care which flavour it is holding.
pub trait Port {
    /// Point-in-time readiness.
    fn is_ready(&self) -> bool;

    /// Whether this gate currently participates in the firing count.
    fn is_active(&self) -> bool;

    /// Make the gate not ready.
    fn block(&self);

    /// Make the gate ready. Fires the owner if this was the last closed gate.
    fn unblock(&self);

    /// Include or exclude the gate from the firing count.
    fn set_active(&self, active: bool);
}

/// What a gate stands for. Only affects diagnostics and the consistency
/// check at firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateKind {
    /// The owner's "permission to run" token. Never handed to clients.
    Control,
    /// A plain readiness signal.
    Signal,
    /// A gate registered by a client layer under its own label.
    Labeled(Cow<'static, str>),
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateKind::Control => f.write_str("control"),
            GateKind::Signal => f.write_str("signal"),
            GateKind::Labeled(label) => f.write_str(label),
        }
    }
}

/// Per-gate state stored in the owner's gate table.
#[derive(Debug, Clone)]
pub(crate) struct GateSlot {
    pub(crate) kind: GateKind,
    pub(crate) ready: bool,
    pub(crate) active: bool,
}

impl GateSlot {
    pub(crate) fn is_blocking(&self) -> bool {
        self.active && !self.ready
    }
}

/// Handle to one gate of an [`AsyncProc`].
///
/// Cloning the handle does not create a new gate; all clones toggle the same
/// condition. A handle keeps its proc alive, so a started proc lives at least
/// as long as anything that can still open one of its gates.
#[derive(Clone)]
pub struct Gate {
    parent: Arc<ProcInner>,
    index: usize,
}

impl Gate {
    pub(crate) fn new(parent: Arc<ProcInner>, index: usize) -> Self {
        Self { parent, index }
    }

    /// Position of this gate in the owner's gate table (the control gate is 0).
    pub fn index(&self) -> usize {
        self.index
    }

    /// ID of the owning proc.
    pub fn proc_id(&self) -> ProcId {
        self.parent.id
    }

    /// The owning proc.
    pub fn owner(&self) -> AsyncProc {
        AsyncProc::from_inner(Arc::clone(&self.parent))
    }

    pub fn kind(&self) -> GateKind {
        self.parent.core.lock().gates[self.index].kind.clone()
    }

    fn read(&self, f: impl FnOnce(&GateSlot) -> bool) -> bool {
        f(&self.parent.core.lock().gates[self.index])
    }
}

impl Port for Gate {
    fn is_ready(&self) -> bool {
        self.read(|slot| slot.ready)
    }

    fn is_active(&self) -> bool {
        self.read(|slot| slot.active)
    }

    fn block(&self) {
        self.parent.block_gate(self.index);
    }

    fn unblock(&self) {
        self.parent.unblock_gate(self.index);
    }

    fn set_active(&self, active: bool) {
        self.parent.set_gate_active(self.index, active);
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate")
            .field("proc", &self.parent.id)
            .field("index", &self.index)
            .field("ready", &self.is_ready())
            .field("active", &self.is_active())
            .finish()
    }
}
