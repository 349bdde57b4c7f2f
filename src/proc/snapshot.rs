// src/proc/snapshot.rs

//! Point-in-time diagnostic views of a proc and its gates.

use std::fmt;

use crate::proc::gate::GateKind;
use crate::proc::{ProcId, ProcState};

/// State of one gate at the moment the snapshot was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSnapshot {
    pub index: usize,
    pub kind: GateKind,
    pub ready: bool,
    pub active: bool,
}

impl GateSnapshot {
    /// Whether this gate counted towards the closed-gate count.
    pub fn is_blocking(&self) -> bool {
        self.active && !self.ready
    }
}

impl fmt::Display for GateSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {}: {}",
            self.index,
            self.kind,
            if self.ready { "ready" } else { "blocked" }
        )?;
        if !self.active {
            f.write_str(" (inactive)")?;
        }
        Ok(())
    }
}

/// Consistent copy of a proc's lifecycle and gate table, taken under its
/// lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcSnapshot {
    pub id: ProcId,
    pub name: Option<String>,
    pub state: ProcState,
    pub daemon: bool,
    /// The maintained closed-gate count.
    pub closed_gates: usize,
    pub gates: Vec<GateSnapshot>,
}

impl ProcSnapshot {
    /// Closed-gate count recomputed from the gate table.
    pub fn recount(&self) -> usize {
        self.gates.iter().filter(|g| g.is_blocking()).count()
    }

    pub fn gates_to_string(&self) -> String {
        let gates: Vec<String> = self.gates.iter().map(|g| g.to_string()).collect();
        format!("[{}]", gates.join(", "))
    }
}

impl fmt::Display for ProcSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AsyncProc#{}", self.id)?;
        if let Some(name) = &self.name {
            write!(f, "({name})")?;
        }
        write!(
            f,
            "/{:?} closed={}{} {}",
            self.state,
            self.closed_gates,
            if self.daemon { " daemon" } else { "" },
            self.gates_to_string()
        )
    }
}
