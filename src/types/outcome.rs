//! Terminal and non-terminal states of a promise.
//!
//! A promise is always in exactly one of three states:
//!
//! - `Pending`: no writer has resolved it yet
//! - `Succeeded(T)`: resolved with a value
//! - `Failed(Failure)`: resolved with a failure
//!
//! `Pending -> Succeeded` and `Pending -> Failed` are the only transitions.
//! Both terminal states are absorbing.

use crate::error::Failure;
use core::fmt;
use std::any::Any;

/// Payload from a caught panic.
///
/// This wraps the panic value for safe transport across thread boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicPayload {
    message: String,
}

impl PanicPayload {
    /// Creates a new panic payload with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Extracts a message from the payload of `std::panic::catch_unwind`.
    ///
    /// `&str` and `String` payloads keep their text; anything else is
    /// reported as an opaque panic.
    #[must_use]
    pub fn from_unwind(payload: &(dyn Any + Send)) -> Self {
        if let Some(s) = payload.downcast_ref::<&str>() {
            Self::new(*s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            Self::new(s.clone())
        } else {
            Self::new("opaque panic payload")
        }
    }

    /// Returns the panic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PanicPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panic: {}", self.message)
    }
}

/// Snapshot of a promise's state.
#[derive(Debug, Clone)]
pub enum PromiseState<T> {
    /// Not yet resolved.
    Pending,
    /// Resolved with a value.
    Succeeded(T),
    /// Resolved with a failure.
    Failed(Failure),
}

impl<T> PromiseState<T> {
    /// Returns true if this state is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns true if this is `Pending`.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns true if this is `Succeeded`.
    #[must_use]
    pub const fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Returns true if this is `Failed`.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Converts a terminal state into a `Result`; `None` while pending.
    pub fn into_result(self) -> Option<Result<T, Failure>> {
        match self {
            Self::Pending => None,
            Self::Succeeded(v) => Some(Ok(v)),
            Self::Failed(e) => Some(Err(e)),
        }
    }
}

impl<T> From<Result<T, Failure>> for PromiseState<T> {
    fn from(result: Result<T, Failure>) -> Self {
        match result {
            Ok(v) => Self::Succeeded(v),
            Err(e) => Self::Failed(e),
        }
    }
}
