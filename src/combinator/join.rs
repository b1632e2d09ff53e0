//! Join combinators: fan-in many promises into one.
//!
//! Both combinators wait on an ordered collection of promises and produce a
//! single promise whose value is index-aligned with the input, regardless of
//! the order in which the members complete.
//!
//! # Semantics
//!
//! `all(ps)` is the fail-fast form:
//! 1. Resolves `Ok(values)` once every member succeeded, values in input order
//! 2. Resolves with the first failure *by completion order* as soon as any
//!    member fails
//! 3. Never cancels the remaining members; they run to completion and their
//!    late results are discarded
//!
//! `all_settled(ps)` is the total form:
//! 1. Resolves only once every member is resolved
//! 2. Always succeeds, with one `Result` per input position
//!
//! # Invariants
//!
//! - Output length equals input length
//! - Output position `i` holds the outcome of input position `i`
//! - An empty input resolves immediately with an empty vector

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Failure;
use crate::promise::Promise;

/// Index-aligned slots filled as members complete.
struct Gather<S> {
    slots: Vec<Option<S>>,
    remaining: usize,
}

impl<S: Clone> Gather<S> {
    fn new(len: usize) -> Self {
        Self {
            slots: vec![None; len],
            remaining: len,
        }
    }

    /// Fills a slot. Returns every slot once the last one is filled.
    fn fill(&mut self, index: usize, value: S) -> Option<Vec<Option<S>>> {
        if self.slots[index].is_none() {
            self.slots[index] = Some(value);
            self.remaining -= 1;
        }
        if self.remaining == 0 {
            Some(std::mem::take(&mut self.slots))
        } else {
            None
        }
    }
}

/// Unwraps gathered slots; every slot is filled by construction.
fn collect_slots<S>(slots: Vec<Option<S>>) -> Result<Vec<S>, Failure> {
    slots
        .into_iter()
        .collect::<Option<Vec<S>>>()
        .ok_or_else(|| Failure::combinator("aggregate resolved with an empty slot"))
}

/// Waits for every promise to succeed, failing fast on the first failure.
///
/// # Example
///
/// ```
/// use completable::combinator::all;
/// use completable::Promise;
///
/// let joined = all(vec![Promise::ready(1), Promise::ready(2)]);
/// assert_eq!(joined.wait().ok(), Some(vec![1, 2]));
/// ```
pub fn all<T, I>(promises: I) -> Promise<Vec<T>>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Promise<T>>,
{
    let promises: Vec<Promise<T>> = promises.into_iter().collect();
    if promises.is_empty() {
        return Promise::ready(Vec::new());
    }

    let out = Promise::pending();
    let gather = Arc::new(Mutex::new(Gather::<T>::new(promises.len())));

    for (index, promise) in promises.iter().enumerate() {
        let gather = Arc::clone(&gather);
        let out = out.clone();
        promise.on_complete(move |result| match result {
            Ok(value) => {
                let finished = gather.lock().fill(index, value.clone());
                if let Some(slots) = finished {
                    out.complete(collect_slots(slots));
                }
            }
            Err(failure) => {
                out.complete(Err(failure.clone()));
            }
        });
    }

    out
}

/// Waits for every promise to resolve and reports each outcome by position.
///
/// The returned promise never fails on account of its members.
///
/// # Example
///
/// ```
/// use completable::combinator::all_settled;
/// use completable::{Failure, Promise};
///
/// let settled = all_settled(vec![
///     Promise::ready("x"),
///     Promise::failed(Failure::task("E")),
///     Promise::ready("z"),
/// ]);
/// let outcomes = settled.wait().unwrap();
/// assert_eq!(outcomes.len(), 3);
/// assert!(outcomes[1].is_err());
/// ```
pub fn all_settled<T, I>(promises: I) -> Promise<Vec<Result<T, Failure>>>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Promise<T>>,
{
    let promises: Vec<Promise<T>> = promises.into_iter().collect();
    if promises.is_empty() {
        return Promise::ready(Vec::new());
    }

    let out = Promise::pending();
    let gather = Arc::new(Mutex::new(Gather::<Result<T, Failure>>::new(
        promises.len(),
    )));

    for (index, promise) in promises.iter().enumerate() {
        let gather = Arc::clone(&gather);
        let out = out.clone();
        promise.on_complete(move |result| {
            let finished = gather.lock().fill(index, result.clone());
            if let Some(slots) = finished {
                out.complete(collect_slots(slots));
            }
        });
    }

    out
}
