//! Error types and error handling strategy.
//!
//! Every failure that can reach a promise is carried by one type,
//! [`Failure`], whatever its origin:
//!
//! - **Task**: the task body returned an error
//! - **Panicked**: a task body or stage function panicked
//! - **Combinator**: a stage function rejected an upstream success value
//! - **Cancelled**: the promise was cancelled before it resolved
//!
//! Downstream stages never need to distinguish the origin, but can inspect
//! [`Failure::kind`], [`Failure::category`] or the `source()` chain when
//! they want to.
//!
//! Configuration problems are reported separately through [`BuildError`],
//! since they never flow through a promise.

use core::fmt;
use std::sync::Arc;

use crate::types::{CancelReason, PanicPayload, TaskId};

/// The kind of failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The task body returned an error.
    Task,
    /// The task body or a stage function panicked.
    Panicked(PanicPayload),
    /// A stage function failed while processing an upstream value.
    Combinator,
    /// The promise was cancelled.
    Cancelled(CancelReason),
}

impl FailureKind {
    /// Returns the category for this kind.
    #[must_use]
    pub const fn category(&self) -> FailureCategory {
        match self {
            Self::Task | Self::Panicked(_) => FailureCategory::Task,
            Self::Combinator => FailureCategory::Combinator,
            Self::Cancelled(_) => FailureCategory::Cancellation,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task => write!(f, "task failed"),
            Self::Panicked(p) => write!(f, "{p}"),
            Self::Combinator => write!(f, "stage failed"),
            Self::Cancelled(r) => write!(f, "cancelled ({r})"),
        }
    }
}

/// High-level grouping of failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    /// Failures raised while running a task body.
    Task,
    /// Failures raised by a stage function.
    Combinator,
    /// Cancellation of a pending promise.
    Cancellation,
}

/// An opaque failure carried by a promise.
///
/// Cloning is cheap: the wrapped cause is reference counted, so every
/// reader of a resolved promise observes the same failure.
#[derive(Clone)]
pub struct Failure {
    kind: FailureKind,
    message: String,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    task: Option<TaskId>,
}

impl Failure {
    /// Creates a failure with the given kind and message.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            task: None,
        }
    }

    /// Creates a task failure.
    #[must_use]
    pub fn task(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Task, message)
    }

    /// Creates a stage failure.
    #[must_use]
    pub fn combinator(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Combinator, message)
    }

    /// Creates a cancellation failure from a structured reason.
    #[must_use]
    pub fn cancelled(reason: &CancelReason) -> Self {
        Self::new(FailureKind::Cancelled(reason.clone()), format!("{reason}"))
    }

    /// Creates a failure from a caught panic.
    #[must_use]
    pub fn panicked(payload: PanicPayload) -> Self {
        let message = payload.message().to_string();
        Self::new(FailureKind::Panicked(payload), message)
    }

    /// Wraps an arbitrary error as a task failure, keeping it as the cause.
    #[must_use]
    pub fn from_error(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::task(err.to_string()).with_source(err)
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Records the task that produced this failure.
    #[must_use]
    pub fn with_task(mut self, task: TaskId) -> Self {
        self.task = Some(task);
        self
    }

    /// Returns the failure kind.
    #[must_use]
    pub const fn kind(&self) -> &FailureKind {
        &self.kind
    }

    /// Returns the failure category.
    #[must_use]
    pub const fn category(&self) -> FailureCategory {
        self.kind.category()
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the task that produced this failure, if recorded.
    #[must_use]
    pub const fn task_id(&self) -> Option<TaskId> {
        self.task
    }

    /// Returns true if this failure represents cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.kind, FailureKind::Cancelled(_))
    }

    /// Returns true if this failure came from a panic.
    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self.kind, FailureKind::Panicked(_))
    }

    /// Returns the cancellation reason, if this is a cancellation.
    #[must_use]
    pub const fn cancel_reason(&self) -> Option<&CancelReason> {
        match &self.kind {
            FailureKind::Cancelled(r) => Some(r),
            _ => None,
        }
    }

    /// Returns true if both failures are the same failure.
    ///
    /// Two failures are the same when they share kind, message and task,
    /// and either both lack a cause or both point at the same cause.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        let same_source = match (&self.source, &other.source) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        self.kind == other.kind
            && self.message == other.message
            && self.task == other.task
            && same_source
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Failure");
        d.field("kind", &self.kind).field("message", &self.message);
        if let Some(task) = self.task {
            d.field("task", &task);
        }
        if let Some(source) = &self.source {
            d.field("source", &format_args!("{source}"));
        }
        d.finish()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FailureKind::Task => write!(f, "{}", self.message)?,
            FailureKind::Panicked(_) => write!(f, "panic: {}", self.message)?,
            FailureKind::Combinator => write!(f, "stage failed: {}", self.message)?,
            FailureKind::Cancelled(_) => write!(f, "cancelled: {}", self.message)?,
        }
        if let Some(task) = self.task {
            write!(f, " [{task}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Errors raised while building an executor from configuration.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// An environment variable held an unparseable value.
    #[error("invalid value for {var}: {reason}")]
    InvalidEnv {
        /// Name of the offending variable.
        var: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// A configuration file could not be read or parsed.
    #[error("invalid config file: {0}")]
    ConfigFile(String),
    /// The configuration asked for something impossible.
    #[error("invalid executor configuration: {0}")]
    Invalid(String),
    /// A worker thread could not be started.
    #[error("failed to spawn worker thread")]
    Spawn(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug)]
    struct Remote;

    impl fmt::Display for Remote {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Remote failure")
        }
    }

    impl std::error::Error for Remote {}

    #[test]
    fn categories() {
        assert_eq!(Failure::task("x").category(), FailureCategory::Task);
        assert_eq!(
            Failure::panicked(PanicPayload::new("p")).category(),
            FailureCategory::Task
        );
        assert_eq!(Failure::combinator("x").category(), FailureCategory::Combinator);
        assert_eq!(
            Failure::cancelled(&CancelReason::shutdown()).category(),
            FailureCategory::Cancellation
        );
    }

    #[test]
    fn from_error_keeps_cause() {
        let failure = Failure::from_error(Remote);
        assert_eq!(failure.message(), "Remote failure");
        let source = failure.source().expect("source recorded");
        assert_eq!(source.to_string(), "Remote failure");
    }

    #[test]
    fn display_by_kind() {
        assert_eq!(Failure::task("Age cannot be negative").to_string(), "Age cannot be negative");
        assert_eq!(Failure::combinator("bad").to_string(), "stage failed: bad");
        assert_eq!(
            Failure::cancelled(&CancelReason::user("stop")).to_string(),
            "cancelled: user: stop"
        );
        let with_task = Failure::task("boom").with_task(TaskId::new_for_test(3));
        assert_eq!(with_task.to_string(), "boom [T3]");
    }

    #[test]
    fn cancel_reason_accessor() {
        let failure = Failure::cancelled(&CancelReason::race_lost());
        assert!(failure.is_cancelled());
        assert_eq!(failure.cancel_reason(), Some(&CancelReason::race_lost()));
        assert!(Failure::task("x").cancel_reason().is_none());
    }

    #[test]
    fn clones_are_the_same_failure() {
        let failure = Failure::from_error(Remote).with_task(TaskId::new_for_test(1));
        let copy = failure.clone();
        assert!(failure.same_as(&copy));
        assert!(!failure.same_as(&Failure::from_error(Remote).with_task(TaskId::new_for_test(1))));
    }

    #[test]
    fn build_error_messages() {
        let err = BuildError::InvalidEnv {
            var: "COMPLETABLE_WORKER_THREADS",
            reason: "expected unsigned integer".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value for COMPLETABLE_WORKER_THREADS: expected unsigned integer"
        );
    }
}
