//! Executor configuration types.
//!
//! These types hold the concrete values that drive executor behavior. In
//! most cases you should use [`ExecutorBuilder`](super::builder::ExecutorBuilder)
//! rather than creating an [`ExecutorConfig`] directly.
//!
//! # Defaults
//!
//! | Field | Default |
//! |-------|---------|
//! | `worker_threads` | available CPU parallelism |
//! | `thread_stack_size` | 2 MiB |
//! | `thread_name_prefix` | `"completable-worker"` |
//! | `shutdown_timeout` | 5 s |

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::BuildError;

/// Default stack size for worker threads.
pub const DEFAULT_THREAD_STACK_SIZE: usize = 2 * 1024 * 1024;
/// Default name prefix for worker threads.
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "completable-worker";
/// Default bound on how long `Drop` waits for workers to drain.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Executor configuration.
#[derive(Clone)]
pub struct ExecutorConfig {
    /// Number of worker threads (default: available parallelism).
    pub worker_threads: usize,
    /// Stack size per worker thread (default: 2MB).
    pub thread_stack_size: usize,
    /// Name prefix for worker threads.
    pub thread_name_prefix: String,
    /// How long dropping the executor waits for queued work to drain.
    pub shutdown_timeout: Duration,
    /// Callback when a worker thread starts.
    pub on_thread_start: Option<Arc<dyn Fn() + Send + Sync>>,
    /// Callback when a worker thread stops.
    pub on_thread_stop: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl ExecutorConfig {
    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.worker_threads == 0 {
            return Err(BuildError::Invalid(
                "worker_threads must be at least 1".into(),
            ));
        }
        if self.thread_name_prefix.is_empty() {
            return Err(BuildError::Invalid(
                "thread_name_prefix must not be empty".into(),
            ));
        }
        Ok(())
    }

    fn default_worker_threads() -> usize {
        std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            worker_threads: Self::default_worker_threads(),
            thread_stack_size: DEFAULT_THREAD_STACK_SIZE,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            on_thread_start: None,
            on_thread_stop: None,
        }
    }
}

impl fmt::Debug for ExecutorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorConfig")
            .field("worker_threads", &self.worker_threads)
            .field("thread_stack_size", &self.thread_stack_size)
            .field("thread_name_prefix", &self.thread_name_prefix)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("on_thread_start", &self.on_thread_start.is_some())
            .field("on_thread_stop", &self.on_thread_stop.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ExecutorConfig::default();
        assert!(config.worker_threads >= 1);
        assert_eq!(config.thread_stack_size, DEFAULT_THREAD_STACK_SIZE);
        assert_eq!(config.thread_name_prefix, "completable-worker");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_workers_rejected() {
        let config = ExecutorConfig {
            worker_threads: 0,
            ..ExecutorConfig::default()
        };
        assert!(matches!(config.validate(), Err(BuildError::Invalid(_))));
    }

    #[test]
    fn empty_prefix_rejected() {
        let config = ExecutorConfig {
            thread_name_prefix: String::new(),
            ..ExecutorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_hides_callbacks() {
        let config = ExecutorConfig {
            on_thread_start: Some(Arc::new(|| {})),
            ..ExecutorConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("on_thread_start: true"));
        assert!(debug.contains("on_thread_stop: false"));
    }
}
