//! Completable: write-once promises composed into pipelines and fan-in
//! aggregations, executed on a worker pool.
//!
//! # Overview
//!
//! A [`Task`] is a deferred, fallible body. Submitting it to an
//! [`Executor`] starts it on a worker thread and returns a [`Promise`]
//! that resolves exactly once: `Succeeded(T)` or `Failed(Failure)`.
//! Failures are values, never unwinding: an `Err` or a panic inside the
//! body is delivered through the promise.
//!
//! Promises compose without blocking:
//!
//! - [`Promise::map`] transforms a success and passes failures through.
//! - [`Promise::recover`] turns a failure into a value and passes
//!   successes through.
//! - [`Promise::handle`] sees both outcomes and always produces a value.
//! - [`combinator::all`] and [`combinator::all_settled`] gather many
//!   promises into one, in input order.
//!
//! # Example
//!
//! ```
//! use completable::{Executor, Failure};
//!
//! let executor = Executor::builder().worker_threads(2).build().unwrap();
//! let upper = executor
//!     .submit(|| -> Result<String, Failure> { Err(Failure::task("Remote failure")) })
//!     .map(|s| s.to_uppercase())
//!     .recover(|_| "DEFAULT".to_string());
//! assert_eq!(upper.wait().unwrap(), "DEFAULT");
//! ```
//!
//! # Module Structure
//!
//! - [`types`]: Identifiers, cancellation reasons, panic payloads, states
//! - [`error`]: [`Failure`] and configuration errors
//! - [`task`]: Deferred units of work
//! - [`promise`]: The write-once result handle and its stages
//! - [`combinator`]: `all`, `all_settled` and `race`
//! - [`runtime`]: The worker-pool executor and its configuration
//! - [`observability`]: Log sinks injected into task bodies
//! - [`demo`]: Sample workloads driven by the `completable` binary

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![cfg_attr(not(feature = "tracing-integration"), allow(unused_variables))]

pub mod combinator;
pub mod demo;
pub mod error;
pub mod observability;
pub mod promise;
pub mod runtime;
pub mod task;
#[cfg(test)]
pub(crate) mod test_utils;
pub mod tracing_compat;
pub mod types;

pub use combinator::{all, all_settled, race, race_cancel_losers, RaceWinner};
pub use error::{BuildError, Failure, FailureCategory, FailureKind};
pub use promise::Promise;
pub use runtime::{Executor, ExecutorBuilder, ExecutorConfig, ExecutorHandle};
pub use task::Task;
pub use types::{CancelKind, CancelReason, PanicPayload, PromiseState, TaskId};
