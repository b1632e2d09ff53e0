//! Deferred units of work.
//!
//! A [`Task<T>`] wraps a body `FnOnce() -> Result<T, Failure>`. It is inert
//! until run, and can run at most once since running consumes it. Running a
//! task never unwinds: a panicking body becomes a [`FailureKind::Panicked`]
//! failure.
//!
//! [`FailureKind::Panicked`]: crate::error::FailureKind::Panicked

use core::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::Failure;
use crate::types::{PanicPayload, TaskId};

type Body<T> = Box<dyn FnOnce() -> Result<T, Failure> + Send + 'static>;

/// A deferred, fallible unit of work.
pub struct Task<T> {
    id: TaskId,
    body: Body<T>,
}

impl<T> Task<T> {
    /// Wraps a fallible body.
    pub fn new<F>(body: F) -> Self
    where
        F: FnOnce() -> Result<T, Failure> + Send + 'static,
    {
        Self {
            id: TaskId::next(),
            body: Box::new(body),
        }
    }

    /// Wraps an infallible body.
    pub fn from_fn<F>(body: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        Self::new(move || Ok(body()))
    }

    /// Returns this task's id.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Runs the body to completion.
    ///
    /// Failures that do not already name a task are tagged with this
    /// task's id.
    pub fn run(self) -> Result<T, Failure> {
        let id = self.id;
        let result = catch_unwind(AssertUnwindSafe(self.body)).unwrap_or_else(|payload| {
            Err(Failure::panicked(PanicPayload::from_unwind(payload.as_ref())))
        });
        result.map_err(|failure| {
            if failure.task_id().is_some() {
                failure
            } else {
                failure.with_task(id)
            }
        })
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("id", &self.id).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[test]
    fn run_returns_value() {
        let task = Task::new(|| Ok(String::from("Adult")));
        assert_eq!(task.run().ok().as_deref(), Some("Adult"));
    }

    #[test]
    fn run_tags_failure_with_id() {
        let task: Task<i32> = Task::new(|| Err(Failure::task("Age cannot be negative")));
        let id = task.id();
        let failure = task.run().unwrap_err();
        assert_eq!(failure.task_id(), Some(id));
        assert_eq!(failure.message(), "Age cannot be negative");
    }

    #[test]
    fn run_keeps_existing_task_tag() {
        let origin = TaskId::new_for_test(99);
        let task: Task<i32> = Task::new(move || Err(Failure::task("x").with_task(origin)));
        assert_eq!(task.run().unwrap_err().task_id(), Some(origin));
    }

    #[test]
    fn panic_becomes_failure() {
        let task: Task<i32> = Task::from_fn(|| panic!("worker exploded"));
        let failure = task.run().unwrap_err();
        assert!(matches!(failure.kind(), FailureKind::Panicked(p) if p.message() == "worker exploded"));
    }

    #[test]
    fn ids_differ_between_tasks() {
        let a = Task::from_fn(|| 1);
        let b = Task::from_fn(|| 2);
        assert_ne!(a.id(), b.id());
        assert!(format!("{a:?}").contains("Task"));
    }
}
