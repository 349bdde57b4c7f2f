// src/errors.rs

//! Crate-wide error types.
//!
//! - [`AsyncProcError`] covers recoverable failures: rejected registrations,
//!   action outcomes reported to a [`Completion`](crate::completion::Completion),
//!   and configuration problems.
//! - [`ProtocolViolation`] describes broken gating invariants. These are never
//!   returned; they are raised as panics at the point of detection.

use thiserror::Error;

use crate::proc::{ProcId, ProcState};

#[derive(Error, Debug)]
pub enum AsyncProcError {
    #[error("cannot register a gate on proc {proc} in state {state:?}")]
    RegistrationClosed { proc: ProcId, state: ProcState },

    #[error("cannot replace the action of proc {proc} in state {state:?}")]
    ActionClosed { proc: ProcId, state: ProcState },

    #[error("proc {0} fired without an action")]
    MissingAction(ProcId),

    #[error("executor dropped the run step of proc {0}")]
    JobDropped(ProcId),

    #[error("action failed: {0:#}")]
    ActionFailed(anyhow::Error),

    #[error("action panicked: {0}")]
    ActionPanicked(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Gating invariant that no correct client can break.
///
/// Seeing one of these means a gate implementation bug or an illegal
/// concurrent misuse; the process is not expected to continue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("proc {proc}: gate {gate} opened but closed-gate count is already 0")]
    CountUnderflow { proc: ProcId, gate: usize },

    #[error("proc {proc}: attempt to fire with gate {gate} in wrong state (ready={ready})")]
    WrongGateState {
        proc: ProcId,
        gate: usize,
        ready: bool,
    },

    #[error("proc {proc}: actual closed-gate count={actual} but maintained count={maintained}")]
    CountMismatch {
        proc: ProcId,
        actual: usize,
        maintained: usize,
    },
}

impl ProtocolViolation {
    /// Log and abort. The panic payload is the violation itself, so the run
    /// step can tell it apart from an ordinary action panic and let it
    /// through. Called with the owner's lock held; the lock does not poison,
    /// but the proc must be considered unusable afterwards.
    #[cold]
    pub(crate) fn raise(self) -> ! {
        tracing::error!(violation = %self, "gating protocol violation");
        std::panic::panic_any(self)
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AsyncProcError>;
