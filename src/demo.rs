// src/demo.rs

//! The dataflow run by the `asyncproc` binary.
//!
//! Shape:
//!
//! ```text
//! producer_0 ─┐
//! producer_1 ─┼─> sink ─> chain_0 ─> chain_1 ─> ... ─> chain_{m-1}
//! producer_n ─┘
//! ```
//!
//! The sink owns one gate per producer; each chain proc owns one gate opened
//! by its predecessor. Every edge is a gate toggle, nothing else is shared.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::config::DemoSection;
use crate::exec::Executor;
use crate::proc::{AsyncProc, Port};
use crate::scope::Dataflow;

/// Summary of one demo run.
#[derive(Debug, Clone)]
pub struct DemoReport {
    pub producers: usize,
    pub chain_length: usize,
    /// Actions that ran, across producers, sink and chain.
    pub fired: usize,
    /// Error reported by the scope, if any member failed.
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl DemoReport {
    pub fn total_procs(&self) -> usize {
        self.producers + 1 + self.chain_length
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Build the dataflow, start every proc and block until the scope settles.
pub fn run_demo(cfg: &DemoSection, executor: Arc<dyn Executor>) -> Result<DemoReport> {
    let started = Instant::now();
    let scope = Dataflow::with_executor(executor);
    let fired = Arc::new(AtomicUsize::new(0));

    // Chain, built back to front so each proc can capture its successor's gate.
    let mut next_input = None;
    let mut chain = Vec::with_capacity(cfg.chain_length);
    for index in (0..cfg.chain_length).rev() {
        let fired = Arc::clone(&fired);
        let fail = cfg.fail_at == Some(index);
        let successor = next_input.take();

        let proc = AsyncProc::builder()
            .name(format!("chain_{index}"))
            .scope(&scope)
            .build();
        let input = proc
            .labeled_gate("input", false, true)
            .with_context(|| format!("registering input gate of chain_{index}"))?;
        proc.set_action(move || {
            fired.fetch_add(1, Ordering::Relaxed);
            if fail {
                bail!("chain_{index} failed on request");
            }
            if let Some(gate) = successor {
                Port::unblock(&gate);
            }
            Ok(())
        })?;

        next_input = Some(input);
        chain.push(proc);
    }

    // Sink: one gate per producer.
    let sink = AsyncProc::builder().name("sink").scope(&scope).build();
    let mut sink_inputs = Vec::with_capacity(cfg.producers);
    for index in 0..cfg.producers {
        let gate = sink
            .labeled_gate(format!("producer_{index}"), false, true)
            .context("registering sink gate")?;
        sink_inputs.push(gate);
    }
    {
        let fired = Arc::clone(&fired);
        let head = next_input.take();
        sink.set_action(move || {
            fired.fetch_add(1, Ordering::Relaxed);
            if let Some(gate) = head {
                Port::unblock(&gate);
            }
            Ok(())
        })?;
    }

    for proc in &chain {
        proc.start();
    }
    sink.start();
    debug!(sink = %sink, gates = %sink.gates_to_string(), "sink waiting on producers");

    for (index, gate) in sink_inputs.into_iter().enumerate() {
        let fired = Arc::clone(&fired);
        let producer = AsyncProc::builder()
            .name(format!("producer_{index}"))
            .scope(&scope)
            .build_with_action(move || {
                fired.fetch_add(1, Ordering::Relaxed);
                Port::unblock(&gate);
                Ok(())
            });
        producer.start();
    }

    let outcome = scope.join();
    let report = DemoReport {
        producers: cfg.producers,
        chain_length: cfg.chain_length,
        fired: fired.load(Ordering::Relaxed),
        error: outcome.err().map(|e| e.to_string()),
        elapsed: started.elapsed(),
    };

    info!(
        fired = report.fired,
        total = report.total_procs(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        ok = report.succeeded(),
        "demo dataflow settled"
    );
    Ok(report)
}
