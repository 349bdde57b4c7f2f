// src/proc/state.rs

//! Lifecycle of an [`AsyncProc`](crate::AsyncProc).

/// Lifecycle state. Only ever advances forward:
/// `Created -> Blocked -> Running -> Completed`.
///
/// `Completed` may also be reached directly from `Created` or `Blocked` when
/// a client finishes the proc explicitly before it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProcState {
    /// Constructed; the control gate is closed and `start()` not yet called.
    Created,
    /// Started; waiting for the remaining gates to open.
    Blocked,
    /// Fired and handed to the executor.
    Running,
    /// The action returned or failed, or the proc was finished explicitly.
    Completed,
}

impl ProcState {
    /// Whether new gates may still be registered.
    pub fn accepts_gates(self) -> bool {
        matches!(self, ProcState::Created | ProcState::Blocked)
    }

    pub fn is_terminal(self) -> bool {
        self == ProcState::Completed
    }
}
