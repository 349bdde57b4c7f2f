// tests/demo.rs

mod common;
use crate::common::{ManualExecutor, init_tracing};

use std::sync::Arc;

use asyncproc::config::DemoSection;
use asyncproc::demo::run_demo;
use asyncproc::{InlineExecutor, TokioExecutor};

fn section(producers: usize, chain_length: usize, fail_at: Option<usize>) -> DemoSection {
    DemoSection {
        producers,
        chain_length,
        fail_at,
    }
}

#[test]
fn demo_fires_every_proc_on_the_shared_runtime() {
    init_tracing();
    let executor = InlineExecutor::new(Arc::new(TokioExecutor::shared()), 4);

    let report = run_demo(&section(6, 20, None), Arc::new(executor)).unwrap();

    assert!(report.succeeded(), "{:?}", report.error);
    assert_eq!(report.total_procs(), 27);
    assert_eq!(report.fired, report.total_procs());
}

#[test]
fn demo_stops_the_chain_at_the_failing_proc() {
    init_tracing();
    let report = run_demo(
        &section(2, 5, Some(2)),
        Arc::new(TokioExecutor::shared()),
    )
    .unwrap();

    assert!(!report.succeeded());
    let err = report.error.unwrap();
    assert!(err.contains("chain_2 failed on request"), "{err}");
    // Producers, sink and chain_0..=chain_2 ran; chain_3 and chain_4 never fire.
    assert_eq!(report.fired, 2 + 1 + 3);
}

#[test]
fn demo_on_a_manual_executor_needs_driving() {
    let executor = ManualExecutor::new();
    let driver = executor.clone();
    // run_demo blocks on the scope, so drive the queue from another thread.
    let handle = std::thread::spawn(move || {
        loop {
            if driver.run_next() {
                continue;
            }
            if driver.submitted() == 3 + 1 + 2 && driver.pending() == 0 {
                break;
            }
            std::thread::yield_now();
        }
    });

    let report = run_demo(&section(3, 2, None), executor.as_executor()).unwrap();
    handle.join().unwrap();

    assert!(report.succeeded());
    assert_eq!(report.fired, 6);
}
