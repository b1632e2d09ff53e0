//! Test utilities shared by unit tests.
//!
//! - Consistent tracing-based logging initialization
//! - A process-wide lock for tests that mutate environment variables
//! - Small executor constructors

use crate::runtime::{Executor, ExecutorBuilder};
use std::sync::{Mutex, MutexGuard, Once, PoisonError};
use std::time::Duration;

static INIT_LOGGING: Once = Once::new();
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Acquire the global environment lock for tests that mutate env vars.
pub(crate) fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Creates an executor with `workers` threads and a short drop timeout.
pub(crate) fn test_executor(workers: usize) -> Executor {
    ExecutorBuilder::new()
        .worker_threads(workers)
        .thread_name_prefix("test-worker")
        .shutdown_timeout(Duration::from_secs(5))
        .build()
        .expect("test executor builds")
}
