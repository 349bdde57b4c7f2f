// tests/executors.rs

mod common;
use crate::common::{ManualExecutor, init_tracing, settled, with_timeout};

use std::sync::Arc;

use asyncproc::{AsyncProc, Dataflow, Executor, InlineExecutor, Port, TokioExecutor};
use parking_lot::Mutex;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tokio_executor_runs_actions_off_the_gate_path() {
    init_tracing();
    let scope = Dataflow::new();
    let ran_on = Arc::new(Mutex::new(None));

    let proc = {
        let ran_on = Arc::clone(&ran_on);
        AsyncProc::builder()
            .name("worker")
            .scope(&scope)
            .build_with_action(move || {
                *ran_on.lock() = Some(std::thread::current().id());
                Ok(())
            })
    };
    let input = proc.gate(false, true).unwrap();
    proc.start();

    let opener = tokio::spawn(async move { input.unblock() });
    opener.await.unwrap();

    with_timeout(proc.completion().completed()).await.unwrap();
    with_timeout(scope.completion().completed()).await.unwrap();
    assert!(ran_on.lock().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tokio_executor_reports_action_errors() {
    let scope = Dataflow::new();
    let proc = AsyncProc::builder()
        .scope(&scope)
        .build_with_action(|| Err(anyhow::anyhow!("no input file")));
    proc.start();

    let err = with_timeout(scope.completion().completed()).await.unwrap_err();
    assert!(err.to_string().contains("no input file"));
}

#[test]
fn shared_runtime_serves_callers_outside_tokio() {
    let scope = Dataflow::with_executor(Arc::new(TokioExecutor::shared()));
    let proc = AsyncProc::builder().scope(&scope).build_with_action(|| Ok(()));
    proc.start();

    assert!(settled(scope.completion()).is_ok());
}

#[test]
fn job_refused_by_a_shut_down_runtime_fails_the_proc() {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .build()
        .unwrap();
    let handle = runtime.handle().clone();
    drop(runtime);

    let scope = Dataflow::with_executor(Arc::new(TokioExecutor::new(handle)));
    let proc = AsyncProc::builder().scope(&scope).build_with_action(|| Ok(()));
    proc.start();

    let err = settled(proc.completion()).unwrap_err();
    assert!(matches!(&*err, asyncproc::AsyncProcError::JobDropped(_)));
    assert!(settled(scope.completion()).is_err());
}

/// A chain of procs where each action opens the next proc's gate.
fn chain(scope: &Dataflow, len: usize, depths: &Arc<Mutex<Vec<usize>>>) -> Vec<AsyncProc> {
    let mut next: Option<asyncproc::Gate> = None;
    let mut procs = Vec::with_capacity(len);
    for _ in 0..len {
        let proc = AsyncProc::builder().scope(scope).build();
        let input = proc.gate(false, true).unwrap();
        let successor = next.take();
        let depths = Arc::clone(depths);
        proc.set_action(move || {
            depths.lock().push(InlineExecutor::current_depth());
            if let Some(gate) = successor {
                gate.unblock();
            }
            Ok(())
        })
        .unwrap();
        proc.start();
        next = Some(input);
        procs.push(proc);
    }
    procs.reverse();
    if let Some(head) = next {
        head.unblock();
    }
    procs
}

#[test]
fn inline_executor_hands_off_past_max_depth() {
    init_tracing();
    let fallback = ManualExecutor::new();
    let inline = InlineExecutor::new(fallback.as_executor(), 3);
    assert_eq!(inline.max_depth(), 3);

    let scope = Dataflow::with_executor(Arc::new(inline));
    let depths = Arc::new(Mutex::new(Vec::new()));
    let procs = chain(&scope, 5, &depths);

    // The first three ran nested on this thread; the fourth was handed off.
    assert_eq!(*depths.lock(), vec![1, 2, 3]);
    assert_eq!(fallback.submitted(), 1);
    assert!(procs[..3].iter().all(AsyncProc::is_completed));
    assert!(procs[3..].iter().all(AsyncProc::is_alive));
    assert_eq!(InlineExecutor::current_depth(), 0);

    // The handed-off job runs at depth 0 and starts a fresh inline nest.
    fallback.run_all();
    assert_eq!(*depths.lock(), vec![1, 2, 3, 0, 1]);
    assert!(procs.iter().all(AsyncProc::is_completed));
    assert!(scope.join().is_ok());
}

#[test]
fn inline_depth_is_restored_after_a_panicking_job() {
    let fallback = ManualExecutor::new();
    let inline = InlineExecutor::new(fallback.as_executor(), 4);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        inline.execute(Box::new(|| panic!("job blew up")));
    }));
    assert!(result.is_err());
    assert_eq!(InlineExecutor::current_depth(), 0);
}
