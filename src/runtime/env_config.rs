//! Environment variable and config file support for [`ExecutorBuilder`](super::builder::ExecutorBuilder).
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic**: values set via builder methods (`worker_threads(4)`)
//! 2. **Environment variables**: values from `COMPLETABLE_*` env vars
//! 3. **Config file**: values loaded from a TOML file (requires `config-file` feature)
//! 4. **Defaults**: built-in defaults from [`ExecutorConfig::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `COMPLETABLE_WORKER_THREADS` | `usize` | `worker_threads` |
//! | `COMPLETABLE_THREAD_STACK_SIZE` | `usize` | `thread_stack_size` |
//! | `COMPLETABLE_THREAD_NAME_PREFIX` | `String` | `thread_name_prefix` |
//! | `COMPLETABLE_SHUTDOWN_TIMEOUT_MS` | `u64` | `shutdown_timeout` |

use std::time::Duration;

use crate::error::BuildError;
use crate::runtime::config::ExecutorConfig;

/// Environment variable name for worker thread count.
pub const ENV_WORKER_THREADS: &str = "COMPLETABLE_WORKER_THREADS";
/// Environment variable name for thread stack size.
pub const ENV_THREAD_STACK_SIZE: &str = "COMPLETABLE_THREAD_STACK_SIZE";
/// Environment variable name for thread name prefix.
pub const ENV_THREAD_NAME_PREFIX: &str = "COMPLETABLE_THREAD_NAME_PREFIX";
/// Environment variable name for the shutdown drain timeout, in milliseconds.
pub const ENV_SHUTDOWN_TIMEOUT_MS: &str = "COMPLETABLE_SHUTDOWN_TIMEOUT_MS";

/// Apply environment variable overrides to an [`ExecutorConfig`].
///
/// Only variables that are set in the environment are applied.
/// Returns an error if a variable is set but contains an unparseable value.
pub fn apply_env_overrides(config: &mut ExecutorConfig) -> Result<(), BuildError> {
    if let Some(val) = read_env(ENV_WORKER_THREADS) {
        config.worker_threads = parse_usize(ENV_WORKER_THREADS, &val)?;
    }
    if let Some(val) = read_env(ENV_THREAD_STACK_SIZE) {
        config.thread_stack_size = parse_usize(ENV_THREAD_STACK_SIZE, &val)?;
    }
    if let Some(val) = read_env(ENV_THREAD_NAME_PREFIX) {
        config.thread_name_prefix = val;
    }
    if let Some(val) = read_env(ENV_SHUTDOWN_TIMEOUT_MS) {
        let ms = parse_u64(ENV_SHUTDOWN_TIMEOUT_MS, &val)?;
        config.shutdown_timeout = Duration::from_millis(ms);
    }
    Ok(())
}

/// Read an environment variable, returning `None` if unset.
fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_usize(var: &'static str, val: &str) -> Result<usize, BuildError> {
    val.trim()
        .parse::<usize>()
        .map_err(|e| BuildError::InvalidEnv {
            var,
            reason: format!("expected unsigned integer, got {val:?} ({e})"),
        })
}

fn parse_u64(var: &'static str, val: &str) -> Result<u64, BuildError> {
    val.trim()
        .parse::<u64>()
        .map_err(|e| BuildError::InvalidEnv {
            var,
            reason: format!("expected u64, got {val:?} ({e})"),
        })
}

// =========================================================================
// TOML config file support (feature-gated)
// =========================================================================

/// TOML-deserializable executor configuration.
///
/// ```toml
/// [executor]
/// worker_threads = 4
/// thread_stack_size = 2097152
/// thread_name_prefix = "fetch-worker"
/// shutdown_timeout_ms = 5000
/// ```
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct ExecutorTomlConfig {
    /// Executor settings.
    #[serde(default)]
    pub executor: ExecutorToml,
}

/// Executor section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct ExecutorToml {
    /// Number of worker threads.
    pub worker_threads: Option<usize>,
    /// Stack size per worker thread in bytes.
    pub thread_stack_size: Option<usize>,
    /// Name prefix for worker threads.
    pub thread_name_prefix: Option<String>,
    /// Shutdown drain timeout in milliseconds.
    pub shutdown_timeout_ms: Option<u64>,
}

/// Apply a parsed TOML config to an [`ExecutorConfig`].
///
/// Only fields that are `Some` in the TOML struct override the config.
#[cfg(feature = "config-file")]
pub fn apply_toml_config(config: &mut ExecutorConfig, toml: &ExecutorTomlConfig) {
    if let Some(v) = toml.executor.worker_threads {
        config.worker_threads = v;
    }
    if let Some(v) = toml.executor.thread_stack_size {
        config.thread_stack_size = v;
    }
    if let Some(ref v) = toml.executor.thread_name_prefix {
        config.thread_name_prefix.clone_from(v);
    }
    if let Some(ms) = toml.executor.shutdown_timeout_ms {
        config.shutdown_timeout = Duration::from_millis(ms);
    }
}

/// Parse a TOML string into an [`ExecutorTomlConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_str(toml_str: &str) -> Result<ExecutorTomlConfig, BuildError> {
    toml::from_str(toml_str)
        .map_err(|e| BuildError::ConfigFile(format!("failed to parse TOML config: {e}")))
}

/// Read and parse a TOML file into an [`ExecutorTomlConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_file(path: &std::path::Path) -> Result<ExecutorTomlConfig, BuildError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        BuildError::ConfigFile(format!("failed to read {}: {e}", path.display()))
    })?;
    parse_toml_str(&content)
}

// =========================================================================
// Tests
// =========================================================================
