#![allow(dead_code)]

pub use asyncproc_test_utils::builders::{GatedProc, GatedProcBuilder, manual_scope};
pub use asyncproc_test_utils::{ManualExecutor, init_tracing, settled, with_timeout};
