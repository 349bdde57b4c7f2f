use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use asyncproc::exec::{Executor, Job};
use parking_lot::Mutex;

/// An executor that:
/// - records every submitted job
/// - runs nothing until the test asks it to.
///
/// Clones share the same queue.
#[derive(Clone, Default)]
pub struct ManualExecutor {
    queue: Arc<Mutex<VecDeque<Job>>>,
    submitted: Arc<AtomicUsize>,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_executor(&self) -> Arc<dyn Executor> {
        Arc::new(self.clone())
    }

    /// Jobs submitted so far, run or not.
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }

    /// Jobs waiting to run.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run the oldest pending job. Returns `false` if there was none.
    pub fn run_next(&self) -> bool {
        // Pop before running: the job may submit more jobs.
        let job = self.queue.lock().pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Drop every pending job without running it, like a runtime that shuts
    /// down. Returns how many were dropped.
    pub fn discard_pending(&self) -> usize {
        let jobs: Vec<Job> = self.queue.lock().drain(..).collect();
        jobs.len()
    }

    /// Run pending jobs, including ones submitted while running, until the
    /// queue is empty. Returns how many ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl Executor for ManualExecutor {
    fn execute(&self, job: Job) {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        self.queue.lock().push_back(job);
    }
}

impl fmt::Debug for ManualExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualExecutor")
            .field("submitted", &self.submitted())
            .field("pending", &self.pending())
            .finish()
    }
}
