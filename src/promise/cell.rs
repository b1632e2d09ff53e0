//! The single-assignment cell behind every promise.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                     WRITE-ONCE RESOLUTION                      │
//! │                                                                │
//! │   writer A ── complete(v) ──┐                                  │
//! │                             ├──► value.set() under lock        │
//! │   writer B ── complete(e) ──┘        │                         │
//! │                                      ├── winner: take waiters  │
//! │                                      └── loser: no-op, false   │
//! │                                                                │
//! │   winner (lock released) ──► notify condvar                    │
//! │                          ──► wake wakers                       │
//! │                          ──► run callbacks in attach order     │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The value lives in a `OnceLock`, so readers never take the lock once the
//! cell is resolved. The waiter list is guarded by a mutex and the value is
//! only ever set while holding it; a callback is therefore either queued
//! before resolution (and run by the winner) or sees the value and runs
//! immediately on the attaching thread. Callbacks are always invoked with
//! the lock released, and a panicking callback is contained and logged
//! without skipping the ones after it.

use parking_lot::{Condvar, Mutex};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::OnceLock;
use std::task::Waker;
use std::time::{Duration, Instant};

use crate::error::Failure;
use crate::tracing_compat::warn;
use crate::types::PanicPayload;

/// Completion callback invoked with the terminal result.
pub(crate) type Callback<T> = Box<dyn FnOnce(&Result<T, Failure>) + Send + 'static>;

struct Waiters<T> {
    callbacks: Vec<Callback<T>>,
    wakers: Vec<Waker>,
}

pub(crate) struct Cell<T> {
    value: OnceLock<Result<T, Failure>>,
    waiters: Mutex<Waiters<T>>,
    condvar: Condvar,
}

impl<T> Cell<T> {
    pub(crate) fn new() -> Self {
        Self {
            value: OnceLock::new(),
            waiters: Mutex::new(Waiters {
                callbacks: Vec::new(),
                wakers: Vec::new(),
            }),
            condvar: Condvar::new(),
        }
    }

    pub(crate) fn resolved(result: Result<T, Failure>) -> Self {
        let cell = Self::new();
        let _ = cell.value.set(result);
        cell
    }

    /// Returns the terminal result, if any.
    pub(crate) fn get(&self) -> Option<&Result<T, Failure>> {
        self.value.get()
    }

    /// Resolves the cell. Exactly one caller ever gets `true`.
    pub(crate) fn complete(&self, result: Result<T, Failure>) -> bool {
        let (callbacks, wakers) = {
            let mut waiters = self.waiters.lock();
            if self.value.set(result).is_err() {
                return false;
            }
            (
                std::mem::take(&mut waiters.callbacks),
                std::mem::take(&mut waiters.wakers),
            )
        };

        self.condvar.notify_all();
        for waker in wakers {
            waker.wake();
        }

        // Set above and never cleared.
        if let Some(result) = self.value.get() {
            for callback in callbacks {
                invoke(callback, result);
            }
        }
        true
    }

    /// Registers a callback, running it now if the cell is already resolved.
    pub(crate) fn subscribe(&self, callback: Callback<T>) {
        {
            let mut waiters = self.waiters.lock();
            if self.value.get().is_none() {
                waiters.callbacks.push(callback);
                return;
            }
        }
        if let Some(result) = self.value.get() {
            invoke(callback, result);
        }
    }

    /// Registers a waker; returns the result instead if already resolved.
    pub(crate) fn register_waker(&self, waker: &Waker) -> Option<&Result<T, Failure>> {
        let mut waiters = self.waiters.lock();
        if let Some(result) = self.value.get() {
            return Some(result);
        }
        if !waiters.wakers.iter().any(|w| w.will_wake(waker)) {
            waiters.wakers.push(waker.clone());
        }
        None
    }

    /// Blocks until the cell is resolved.
    pub(crate) fn wait(&self) -> &Result<T, Failure> {
        if let Some(result) = self.value.get() {
            return result;
        }
        let mut waiters = self.waiters.lock();
        loop {
            if let Some(result) = self.value.get() {
                return result;
            }
            self.condvar.wait(&mut waiters);
        }
    }

    /// Blocks until the cell is resolved or `timeout` elapses.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> Option<&Result<T, Failure>> {
        if let Some(result) = self.value.get() {
            return Some(result);
        }
        let deadline = Instant::now() + timeout;
        let mut waiters = self.waiters.lock();
        loop {
            if let Some(result) = self.value.get() {
                return Some(result);
            }
            if self.condvar.wait_until(&mut waiters, deadline).timed_out() {
                return self.value.get();
            }
        }
    }

    pub(crate) fn pending_callbacks(&self) -> usize {
        self.waiters.lock().callbacks.len()
    }
}

/// Runs one callback. A panic is contained so later callbacks still run.
fn invoke<T>(callback: Callback<T>, result: &Result<T, Failure>) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(result))) {
        let payload = PanicPayload::from_unwind(payload.as_ref());
        warn!(%payload, "completion callback panicked");
    }
}
