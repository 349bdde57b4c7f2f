// tests/concurrency.rs

mod common;
use crate::common::{GatedProcBuilder, init_tracing, manual_scope};

use std::sync::{Arc, Barrier};
use std::thread;

use asyncproc::{Port, ProcState};

const THREADS: usize = 8;
const ROUNDS: usize = 500;

#[test]
fn concurrent_unblocks_fire_exactly_once() {
    init_tracing();
    for _ in 0..50 {
        let (scope, executor) = manual_scope();
        let p = GatedProcBuilder::new(&scope).closed_gates(THREADS).build();
        p.proc.start();

        let barrier = Arc::new(Barrier::new(THREADS));
        thread::scope(|s| {
            for gate in &p.gates {
                let barrier = Arc::clone(&barrier);
                s.spawn(move || {
                    barrier.wait();
                    gate.unblock();
                });
            }
        });

        assert_eq!(executor.submitted(), 1);
        assert_eq!(p.proc.state(), ProcState::Running);
    }
}

#[test]
fn churning_gates_keep_the_count_consistent() {
    init_tracing();
    let (scope, executor) = manual_scope();
    let p = GatedProcBuilder::new(&scope).closed_gates(THREADS).build();
    p.proc.start();

    let barrier = Arc::new(Barrier::new(THREADS));
    thread::scope(|s| {
        for gate in &p.gates {
            let barrier = Arc::clone(&barrier);
            s.spawn(move || {
                barrier.wait();
                for round in 0..ROUNDS {
                    gate.unblock();
                    gate.block();
                    if round % 7 == 0 {
                        gate.set_active(false);
                        gate.set_active(true);
                    }
                }
                gate.unblock();
            });
        }
    });

    // Every gate ends open, so the proc fired; the control gate keeps it from
    // firing a second time however the churn interleaved.
    assert_eq!(executor.submitted(), 1);

    let snap = p.proc.snapshot();
    assert_eq!(snap.state, ProcState::Running);
    assert_eq!(snap.closed_gates, 1);
    assert_eq!(snap.recount(), snap.closed_gates);

    executor.run_all();
    assert_eq!(p.runs(), 1);
}

#[test]
fn start_racing_with_unblocks_fires_once() {
    for _ in 0..50 {
        let (scope, executor) = manual_scope();
        let p = GatedProcBuilder::new(&scope).closed_gates(THREADS).build();

        let barrier = Arc::new(Barrier::new(THREADS + 1));
        thread::scope(|s| {
            for gate in &p.gates {
                let barrier = Arc::clone(&barrier);
                s.spawn(move || {
                    barrier.wait();
                    gate.unblock();
                });
            }
            let proc = &p.proc;
            let barrier = Arc::clone(&barrier);
            s.spawn(move || {
                barrier.wait();
                proc.start();
                proc.start();
            });
        });

        assert_eq!(executor.submitted(), 1);
    }
}
