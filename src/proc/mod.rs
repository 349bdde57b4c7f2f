// src/proc/mod.rs

//! The gated asynchronous procedure.
//!
//! - [`task`] holds [`AsyncProc`], its builder and the fire/run protocol.
//! - [`gate`] holds the [`Gate`] handle, the [`Port`] capability and
//!   [`GateKind`].
//! - [`action`] defines the [`Action`] hook run at firing.
//! - [`state`] defines the [`ProcState`] lifecycle.
//! - [`snapshot`] provides diagnostic dumps.
//! - [`id`] allocates process-unique [`ProcId`]s.

pub mod action;
pub mod gate;
pub mod id;
pub mod snapshot;
pub mod state;
pub mod task;

pub use action::Action;
pub use gate::{Gate, GateKind, Port};
pub use id::ProcId;
pub use snapshot::{GateSnapshot, ProcSnapshot};
pub use state::ProcState;
pub use task::{AsyncProc, ProcBuilder};
