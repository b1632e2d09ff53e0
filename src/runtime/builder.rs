//! Executor builder.

use std::sync::Arc;
use std::time::Duration;

use crate::error::BuildError;
use crate::runtime::config::ExecutorConfig;
use crate::runtime::env_config;
use crate::runtime::executor::Executor;

/// Builder for constructing an executor with custom configuration.
///
/// ```
/// use completable::ExecutorBuilder;
///
/// let executor = ExecutorBuilder::new()
///     .worker_threads(2)
///     .thread_name_prefix("fetch")
///     .build()
///     .unwrap();
/// assert_eq!(executor.config().worker_threads, 2);
/// ```
#[derive(Clone, Debug)]
pub struct ExecutorBuilder {
    config: ExecutorConfig,
}

impl ExecutorBuilder {
    /// Create a new builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ExecutorConfig::default(),
        }
    }

    /// Create a builder seeded from `COMPLETABLE_*` environment variables.
    ///
    /// Builder methods called afterwards take precedence over the
    /// environment. Fails if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, BuildError> {
        let mut config = ExecutorConfig::default();
        env_config::apply_env_overrides(&mut config)?;
        Ok(Self { config })
    }

    /// Create a builder from a TOML file, then apply environment overrides.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, BuildError> {
        let parsed = env_config::parse_toml_file(path.as_ref())?;
        Self::from_toml_config(&parsed)
    }

    /// Create a builder from TOML text, then apply environment overrides.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(toml: &str) -> Result<Self, BuildError> {
        let parsed = env_config::parse_toml_str(toml)?;
        Self::from_toml_config(&parsed)
    }

    #[cfg(feature = "config-file")]
    fn from_toml_config(parsed: &env_config::ExecutorTomlConfig) -> Result<Self, BuildError> {
        let mut config = ExecutorConfig::default();
        env_config::apply_toml_config(&mut config, parsed);
        env_config::apply_env_overrides(&mut config)?;
        Ok(Self { config })
    }

    /// Set the number of worker threads.
    #[must_use]
    pub fn worker_threads(mut self, n: usize) -> Self {
        self.config.worker_threads = n;
        self
    }

    /// Set the worker thread stack size.
    #[must_use]
    pub fn thread_stack_size(mut self, size: usize) -> Self {
        self.config.thread_stack_size = size;
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    /// Set how long dropping the executor waits for workers to drain.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Register a callback for worker thread start.
    #[must_use]
    pub fn on_thread_start<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.config.on_thread_start = Some(Arc::new(f));
        self
    }

    /// Register a callback for worker thread stop.
    #[must_use]
    pub fn on_thread_stop<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.config.on_thread_stop = Some(Arc::new(f));
        self
    }

    /// Returns the configuration assembled so far.
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Validate the configuration and start the workers.
    pub fn build(self) -> Result<Executor, BuildError> {
        Executor::with_config(self.config)
    }
}

impl Default for ExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
