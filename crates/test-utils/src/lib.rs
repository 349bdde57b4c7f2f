pub mod builders;
pub mod manual_executor;

pub use manual_executor::ManualExecutor;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use asyncproc::{Completion, Outcome};
use tracing_subscriber::{EnvFilter, fmt};

/// Upper bound for anything a test waits on.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static INIT: Once = Once::new();

/// Install a test-writer subscriber once per test binary.
///
/// Output is captured per test and only shown for failures (or with
/// `-- --nocapture`). Raise the level with e.g.
/// `RUST_LOG=asyncproc=trace cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,asyncproc=info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_thread_ids(true)
            .init();
    });
}

/// Await `f`, failing the test after [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .unwrap_or_else(|_| panic!("test timed out after {TEST_TIMEOUT:?}"))
}

/// Block until `completion` settles, failing the test after [`TEST_TIMEOUT`].
pub fn settled(completion: &Completion) -> Outcome {
    completion
        .wait_timeout(TEST_TIMEOUT)
        .unwrap_or_else(|| panic!("completion did not settle within {TEST_TIMEOUT:?}"))
}
