// src/lib.rs

//! Gated asynchronous procedures for dataflow programs.
//!
//! An [`AsyncProc`] runs its [`Action`] exactly once, after every one of its
//! [`Gate`]s is open at the same time, like a Petri net transition firing.
//! Gates are opened and closed by producers on any thread; the proc keeps a
//! count of closed gates under its own lock and hands itself to an
//! [`Executor`] the moment that count reaches zero.

pub mod cli;
pub mod completion;
pub mod config;
pub mod demo;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod proc;
pub mod scope;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::info;

pub use crate::completion::{Completion, Outcome};
pub use crate::errors::{AsyncProcError, ProtocolViolation};
pub use crate::exec::{Executor, InlineExecutor, Job, TokioExecutor};
pub use crate::proc::{Action, AsyncProc, Gate, GateKind, Port, ProcBuilder, ProcId, ProcState};
pub use crate::scope::Dataflow;

use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::demo::run_demo;

/// Load the config file named on the command line and apply CLI overrides.
pub fn load_config(args: &CliArgs) -> Result<ConfigFile> {
    let path = Path::new(&args.config);
    let mut raw = config::load_or_default(path)
        .with_context(|| format!("loading config from {}", path.display()))?;
    args.demo_overrides().apply(&mut raw.demo);

    Ok(ConfigFile::try_from(raw)?)
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the shared runtime, sized from `[runtime]`
/// - an inline executor bounded by `[runtime].inline_depth`
/// - the demo dataflow
pub fn run(args: CliArgs, cfg: ConfigFile) -> Result<()> {
    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    exec::init_shared_runtime(&cfg.runtime)?;
    let executor = InlineExecutor::new(
        Arc::new(TokioExecutor::shared()),
        cfg.runtime.inline_depth,
    );

    info!(
        producers = cfg.demo.producers,
        chain_length = cfg.demo.chain_length,
        "running demo dataflow"
    );
    let report = run_demo(&cfg.demo, Arc::new(executor))?;

    println!(
        "fired {}/{} procs in {:?}",
        report.fired,
        report.total_procs(),
        report.elapsed
    );
    if let Some(err) = report.error {
        bail!("dataflow failed: {err}");
    }
    Ok(())
}

/// Simple dry-run output: print the effective configuration.
fn print_dry_run(cfg: &ConfigFile) {
    println!("asyncproc dry-run");
    println!("  runtime.worker_threads = {:?}", cfg.runtime.worker_threads);
    println!(
        "  runtime.max_blocking_threads = {:?}",
        cfg.runtime.max_blocking_threads
    );
    println!("  runtime.thread_name = {}", cfg.runtime.thread_name);
    println!("  runtime.inline_depth = {}", cfg.runtime.inline_depth);
    println!("  logging.level = {:?}", cfg.logging.level);
    println!("  demo.producers = {}", cfg.demo.producers);
    println!("  demo.chain_length = {}", cfg.demo.chain_length);
    if let Some(fail_at) = cfg.demo.fail_at {
        println!("  demo.fail_at = {fail_at}");
    }
}
