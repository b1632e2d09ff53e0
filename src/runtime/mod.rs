//! Thread-pool execution of tasks.
//!
//! - [`config`]: Executor configuration types
//! - [`env_config`]: Environment variable and TOML overrides
//! - [`builder`]: Fluent executor builder
//! - [`executor`]: The worker pool and its submission handle
//!
//! # Executor Builder
//!
//! Each builder method consumes `self` and returns an updated builder.
//!
//! ```
//! use completable::runtime::ExecutorBuilder;
//! use std::time::Duration;
//!
//! let executor = ExecutorBuilder::new()
//!     .worker_threads(4)
//!     .shutdown_timeout(Duration::from_secs(1))
//!     .build()
//!     .unwrap();
//! let promise = executor.spawn(|| "done");
//! assert_eq!(promise.wait().ok(), Some("done"));
//! ```

pub mod builder;
pub mod config;
pub mod env_config;
pub mod executor;

pub use builder::ExecutorBuilder;
pub use config::ExecutorConfig;
pub use executor::{Executor, ExecutorHandle};
