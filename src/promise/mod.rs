//! Write-once promises.
//!
//! A [`Promise<T>`] is a cloneable handle to the eventual outcome of a unit
//! of work. It starts `Pending` and is resolved exactly once, to either a
//! value or a [`Failure`]. All clones observe the same terminal state.
//!
//! # Observing a promise
//!
//! - [`Promise::wait`]: block the calling thread until resolved
//! - [`Promise::wait_timeout`]: bounded blocking wait
//! - [`Promise::try_get`]: non-blocking peek
//! - [`Promise::on_complete`]: register a callback
//! - `.await`: `Promise<T>` implements [`std::future::Future`]
//!
//! Reads are idempotent: waiting on a resolved promise any number of times
//! yields the same value. A task failure is delivered as `Err(Failure)`;
//! waiting never panics because the work failed.
//!
//! # Scheduling model
//!
//! Stages ([`map`](Promise::map), [`recover`](Promise::recover),
//! [`handle`](Promise::handle), ...) run inline: on the thread that resolves
//! the upstream promise, or immediately on the attaching thread if the
//! upstream is already resolved. Stage functions are always invoked with no
//! lock held, so a stage may itself attach stages or resolve other promises.
//! Keep stage functions short; long work belongs in a submitted task.

mod cell;
mod stage;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use crate::error::Failure;
use crate::types::{CancelReason, PromiseState};
use cell::Cell;

/// A write-once handle to an eventual value or failure.
pub struct Promise<T> {
    cell: Arc<Cell<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> std::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.cell.get() {
            None => "pending",
            Some(Ok(_)) => "succeeded",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("Promise").field("state", &state).finish()
    }
}

impl<T> Promise<T> {
    /// Creates an unresolved promise, to be resolved with [`complete`](Self::complete).
    #[must_use]
    pub fn pending() -> Self {
        Self {
            cell: Arc::new(Cell::new()),
        }
    }

    /// Creates a promise already resolved with `value`.
    #[must_use]
    pub fn ready(value: T) -> Self {
        Self {
            cell: Arc::new(Cell::resolved(Ok(value))),
        }
    }

    /// Creates a promise already resolved with `failure`.
    #[must_use]
    pub fn failed(failure: Failure) -> Self {
        Self {
            cell: Arc::new(Cell::resolved(Err(failure))),
        }
    }

    /// Resolves the promise.
    ///
    /// Returns `true` if this call resolved it, `false` if it was already
    /// resolved; in that case the existing value is left untouched.
    pub fn complete(&self, result: Result<T, Failure>) -> bool {
        self.cell.complete(result)
    }

    /// Resolves the promise with a value.
    pub fn succeed(&self, value: T) -> bool {
        self.complete(Ok(value))
    }

    /// Resolves the promise with a failure.
    pub fn fail(&self, failure: Failure) -> bool {
        self.complete(Err(failure))
    }

    /// Cancels the promise with a user cancellation reason.
    ///
    /// Idempotent. Returns `true` only if this call moved the promise out
    /// of `Pending`; an already resolved promise is never changed.
    pub fn cancel(&self) -> bool {
        self.cancel_with(&CancelReason::default())
    }

    /// Cancels the promise with the given reason.
    pub fn cancel_with(&self, reason: &CancelReason) -> bool {
        self.complete(Err(Failure::cancelled(reason)))
    }

    /// Returns true once the promise is resolved.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Returns true if the promise was resolved by cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.cell.get(), Some(Err(f)) if f.is_cancelled())
    }

    /// Returns true if both handles refer to the same promise.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    /// Registers a callback that runs once with the terminal result.
    ///
    /// Runs immediately on this thread if the promise is already resolved,
    /// otherwise on the resolving thread. Callbacks run in registration order.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(&Result<T, Failure>) + Send + 'static,
    {
        self.cell.subscribe(Box::new(callback));
    }
}

impl<T: Clone> Promise<T> {
    /// Blocks until the promise is resolved and returns its terminal result.
    pub fn wait(&self) -> Result<T, Failure> {
        self.cell.wait().clone()
    }

    /// Blocks for at most `timeout`.
    ///
    /// Returns `None` if the promise is still pending when the timeout
    /// elapses. The promise itself is not affected.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T, Failure>> {
        self.cell.wait_timeout(timeout).cloned()
    }

    /// Blocks for at most `timeout`, then cancels the promise with a
    /// timeout reason if it is still pending.
    ///
    /// Always returns the terminal result. A value that lands concurrently
    /// with the cancellation wins if it was written first.
    pub fn wait_or_cancel(&self, timeout: Duration) -> Result<T, Failure> {
        if let Some(result) = self.cell.wait_timeout(timeout) {
            return result.clone();
        }
        self.cancel_with(&CancelReason::timeout());
        self.cell.wait().clone()
    }

    /// Returns the terminal result without blocking.
    #[must_use]
    pub fn try_get(&self) -> Option<Result<T, Failure>> {
        self.cell.get().cloned()
    }

    /// Returns a snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> PromiseState<T> {
        match self.cell.get() {
            None => PromiseState::Pending,
            Some(Ok(v)) => PromiseState::Succeeded(v.clone()),
            Some(Err(e)) => PromiseState::Failed(e.clone()),
        }
    }
}

impl<T: Clone> Future for Promise<T> {
    type Output = Result<T, Failure>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.cell.register_waker(cx.waker()) {
            Some(result) => Poll::Ready(result.clone()),
            None => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CancelKind;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::task::{Wake, Waker};
    use std::thread;

    struct FlagWaker(AtomicBool);

    impl Wake for FlagWaker {
        fn wake(self: Arc<Self>) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn poll_once<T: Clone>(promise: &mut Promise<T>, waker: &Waker) -> Poll<Result<T, Failure>> {
        let mut cx = Context::from_waker(waker);
        Pin::new(promise).poll(&mut cx)
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    #[test]
    fn ready_and_failed_constructors() {
        assert_eq!(Promise::ready(5).wait().ok(), Some(5));
        let failed: Promise<i32> = Promise::failed(Failure::task("nope"));
        assert_eq!(failed.wait().unwrap_err().message(), "nope");
    }

    #[test]
    fn second_completion_is_ignored() {
        let promise = Promise::pending();
        assert!(promise.succeed("first"));
        assert!(!promise.succeed("second"));
        assert!(!promise.fail(Failure::task("third")));
        assert_eq!(promise.wait().ok(), Some("first"));
    }

    #[test]
    fn wait_is_idempotent() {
        let promise = Promise::ready(String::from("value"));
        for _ in 0..3 {
            assert_eq!(promise.wait().ok().as_deref(), Some("value"));
        }
    }

    #[test]
    fn clones_share_state() {
        let promise: Promise<u8> = Promise::pending();
        let other = promise.clone();
        assert!(promise.ptr_eq(&other));
        other.succeed(1);
        assert!(promise.is_done());
        assert!(matches!(promise.state(), PromiseState::Succeeded(1)));
    }

    #[test]
    fn concurrent_completion_has_one_winner() {
        let promise: Promise<usize> = Promise::pending();
        let wins = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let promise = promise.clone();
                let wins = Arc::clone(&wins);
                thread::spawn(move || {
                    if promise.succeed(i) {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("writer panicked");
        }
        assert_eq!(wins.load(Ordering::SeqCst), 1);
        let first = promise.wait().ok();
        assert_eq!(promise.wait().ok(), first);
    }

    // =========================================================================
    // Cancellation
    // =========================================================================

    #[test]
    fn cancel_is_idempotent() {
        let promise: Promise<i32> = Promise::pending();
        assert!(promise.cancel());
        assert!(!promise.cancel());
        assert!(promise.is_cancelled());
        let failure = promise.wait().unwrap_err();
        assert_eq!(failure.cancel_reason().map(|r| r.kind), Some(CancelKind::User));
    }

    #[test]
    fn cancel_does_not_touch_resolved_promise() {
        let promise = Promise::ready(7);
        assert!(!promise.cancel_with(&CancelReason::shutdown()));
        assert!(!promise.is_cancelled());
        assert_eq!(promise.wait().ok(), Some(7));
    }

    #[test]
    fn cancel_releases_blocked_waiter() {
        let promise: Promise<i32> = Promise::pending();
        let waiter = {
            let promise = promise.clone();
            thread::spawn(move || promise.wait())
        };
        thread::sleep(Duration::from_millis(20));
        promise.cancel();
        let result = waiter.join().expect("waiter panicked");
        assert!(result.unwrap_err().is_cancelled());
    }

    // =========================================================================
    // Observation
    // =========================================================================

    #[test]
    fn wait_timeout_on_pending() {
        let promise: Promise<i32> = Promise::pending();
        assert!(promise.wait_timeout(Duration::from_millis(10)).is_none());
        assert!(!promise.is_done());
    }

    #[test]
    fn wait_or_cancel_times_out_with_reason() {
        let p: Promise<i32> = Promise::pending();
        let failure = p.wait_or_cancel(Duration::from_millis(10)).unwrap_err();
        assert_eq!(failure.cancel_reason().map(|r| r.kind), Some(CancelKind::Timeout));
        assert!(p.is_cancelled());

        let done = Promise::ready(3);
        assert_eq!(done.wait_or_cancel(Duration::from_millis(1)).ok(), Some(3));
    }

    #[test]
    fn try_get_and_state() {
        let promise: Promise<i32> = Promise::pending();
        assert!(promise.try_get().is_none());
        assert!(promise.state().is_pending());
        promise.fail(Failure::task("bad"));
        assert!(promise.state().is_failed());
        assert!(matches!(promise.try_get(), Some(Err(_))));
    }

    #[test]
    fn on_complete_after_resolution_runs_inline() {
        let promise = Promise::ready(2);
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        promise.on_complete(move |r| {
            if let Ok(v) = r {
                seen_clone.store(*v, Ordering::SeqCst);
            }
        });
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn succeed_survives_panicking_observer() {
        let promise: Promise<i32> = Promise::pending();
        promise.on_complete(|_| panic!("observer exploded"));
        let mapped = promise.map(|x| x + 1);
        let gathered = crate::combinator::all_settled(vec![promise.clone()]);

        // Resolving on this thread must not unwind.
        assert!(promise.succeed(1));
        assert_eq!(mapped.try_get().and_then(Result::ok), Some(2));
        assert!(gathered.is_done());

        // An observer attached after resolution is contained too.
        promise.on_complete(|_| panic!("late observer exploded"));
        assert_eq!(promise.map(|x| x * 10).try_get().and_then(Result::ok), Some(10));
    }

    #[test]
    fn debug_reports_state() {
        let promise: Promise<i32> = Promise::pending();
        assert!(format!("{promise:?}").contains("pending"));
        promise.succeed(1);
        assert!(format!("{promise:?}").contains("succeeded"));
    }

    // =========================================================================
    // std::future::Future
    // =========================================================================

    #[test]
    fn poll_registers_waker_and_wakes_on_completion() {
        let flag = Arc::new(FlagWaker(AtomicBool::new(false)));
        let waker = Waker::from(Arc::clone(&flag));
        let mut promise: Promise<i32> = Promise::pending();

        assert!(poll_once(&mut promise, &waker).is_pending());
        assert!(poll_once(&mut promise, &waker).is_pending());
        assert!(!flag.0.load(Ordering::SeqCst));

        promise.clone().succeed(11);
        assert!(flag.0.load(Ordering::SeqCst));
        assert!(matches!(poll_once(&mut promise, &waker), Poll::Ready(Ok(11))));
    }
}
