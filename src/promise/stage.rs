//! Combinator stages attached to a promise.
//!
//! Every stage returns a new promise and leaves its upstream untouched:
//!
//! | Stage | Runs on | Result |
//! |-------|---------|--------|
//! | [`map`](Promise::map) | success | `f(v)`; failures pass through re-typed |
//! | [`try_map`](Promise::try_map) | success | `f(v)`, which may fail |
//! | [`recover`](Promise::recover) | failure | `f(e)`; successes pass through |
//! | [`handle`](Promise::handle) | always | `f(Some(v), None)` or `f(None, Some(e))` |
//! | [`and_then`](Promise::and_then) | success | the promise returned by `f(v)`, flattened |
//! | [`inspect`](Promise::inspect) | always | the upstream result, after `f` observed it |
//!
//! A panic inside a stage function resolves the downstream promise with a
//! combinator failure; it never escapes into the resolving thread.

use std::panic::{catch_unwind, AssertUnwindSafe};

use super::Promise;
use crate::error::Failure;
use crate::types::PanicPayload;

/// Runs a stage function, turning a panic into a combinator failure.
fn run_stage<R>(f: impl FnOnce() -> Result<R, Failure>) -> Result<R, Failure> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let payload = PanicPayload::from_unwind(payload.as_ref());
        Err(Failure::combinator(payload.to_string()))
    })
}

impl<T> Promise<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// The general stage: consumes the upstream result and produces the next.
    fn then_stage<R, F>(&self, f: F) -> Promise<R>
    where
        R: Send + Sync + 'static,
        F: FnOnce(Result<T, Failure>) -> Result<R, Failure> + Send + 'static,
    {
        let next = Promise::pending();
        let out = next.clone();
        self.on_complete(move |result| {
            let result = result.clone();
            out.complete(run_stage(move || f(result)));
        });
        next
    }

    /// Transforms a success value. `f` is never invoked on failure.
    pub fn map<R, F>(&self, f: F) -> Promise<R>
    where
        R: Send + Sync + 'static,
        F: FnOnce(T) -> R + Send + 'static,
    {
        self.then_stage(move |result| result.map(f))
    }

    /// Transforms a success value with a function that may itself fail.
    pub fn try_map<R, F>(&self, f: F) -> Promise<R>
    where
        R: Send + Sync + 'static,
        F: FnOnce(T) -> Result<R, Failure> + Send + 'static,
    {
        self.then_stage(move |result| result.and_then(f))
    }

    /// Replaces a failure with a value. `f` is never invoked on success.
    pub fn recover<F>(&self, f: F) -> Self
    where
        F: FnOnce(Failure) -> T + Send + 'static,
    {
        self.then_stage(move |result| result.or_else(|failure| Ok(f(failure))))
    }

    /// Observes either outcome and produces a new value.
    ///
    /// `f` is invoked exactly once; exactly one of its arguments is `Some`.
    pub fn handle<R, F>(&self, f: F) -> Promise<R>
    where
        R: Send + Sync + 'static,
        F: FnOnce(Option<T>, Option<Failure>) -> R + Send + 'static,
    {
        self.then_stage(move |result| {
            Ok(match result {
                Ok(value) => f(Some(value), None),
                Err(failure) => f(None, Some(failure)),
            })
        })
    }

    /// Chains a dependent promise produced from the success value.
    pub fn and_then<R, F>(&self, f: F) -> Promise<R>
    where
        R: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Promise<R> + Send + 'static,
    {
        let next = Promise::pending();
        let out = next.clone();
        self.on_complete(move |result| match result.clone() {
            Ok(value) => match run_stage(move || Ok(f(value))) {
                Ok(inner) => inner.on_complete(move |inner_result| {
                    out.complete(inner_result.clone());
                }),
                Err(failure) => {
                    out.complete(Err(failure));
                }
            },
            Err(failure) => {
                out.complete(Err(failure));
            }
        });
        next
    }

    /// Runs `f` on the terminal result, then passes the result through.
    ///
    /// If `f` panics the downstream promise fails with a combinator failure.
    pub fn inspect<F>(&self, f: F) -> Self
    where
        F: FnOnce(&Result<T, Failure>) + Send + 'static,
    {
        self.then_stage(move |result| {
            f(&result);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureCategory;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    fn flag() -> (Arc<AtomicBool>, Arc<AtomicBool>) {
        let f = Arc::new(AtomicBool::new(false));
        (Arc::clone(&f), f)
    }

    // =========================================================================
    // map / try_map
    // =========================================================================

    #[test]
    fn map_transforms_success() {
        let p = Promise::ready(21).map(|x| x * 2);
        assert_eq!(p.wait().ok(), Some(42));
    }

    #[test]
    fn map_skips_failure() {
        let (called, seen) = flag();
        let failure = Failure::task("Age cannot be negative");
        let p: Promise<i32> = Promise::failed(failure.clone());
        let mapped = p.map(move |x| {
            called.store(true, Ordering::SeqCst);
            x + 1
        });
        let err = mapped.wait().unwrap_err();
        assert!(err.same_as(&failure));
        assert!(!seen.load(Ordering::SeqCst));
    }

    #[test]
    fn map_panic_becomes_combinator_failure() {
        let p = Promise::ready(1).map(|_| -> i32 { panic!("bad stage") });
        let err = p.wait().unwrap_err();
        assert_eq!(err.category(), FailureCategory::Combinator);
        assert!(err.message().contains("bad stage"));
    }

    #[test]
    fn try_map_propagates_stage_failure() {
        let p = Promise::ready("abc").try_map(|s| {
            s.parse::<i32>()
                .map_err(|e| Failure::combinator("not a number").with_source(e))
        });
        let err = p.wait().unwrap_err();
        assert_eq!(err.category(), FailureCategory::Combinator);
    }

    // =========================================================================
    // recover
    // =========================================================================

    #[test]
    fn recover_replaces_failure() {
        let p: Promise<String> = Promise::failed(Failure::task("boom"));
        let recovered = p.recover(|e| format!("recovered from {}", e.message()));
        assert_eq!(recovered.wait().ok().as_deref(), Some("recovered from boom"));
    }

    #[test]
    fn recover_skips_success() {
        let (called, seen) = flag();
        let p = Promise::ready(5).recover(move |_| {
            called.store(true, Ordering::SeqCst);
            0
        });
        assert_eq!(p.wait().ok(), Some(5));
        assert!(!seen.load(Ordering::SeqCst));
    }

    // =========================================================================
    // handle
    // =========================================================================

    #[test]
    fn handle_sees_exactly_one_side() {
        let ok = Promise::ready(3).handle(|v, e| (v, e.is_some()));
        assert_eq!(ok.wait().ok(), Some((Some(3), false)));

        let failed: Promise<i32> = Promise::failed(Failure::task("x"));
        let handled = failed.handle(|v, e| (v, e.map(|f| f.message().to_string())));
        assert_eq!(handled.wait().ok(), Some((None, Some("x".to_string()))));
    }

    #[test]
    fn handle_runs_once_per_attachment() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let p: Promise<i32> = Promise::pending();
        let h = p.handle(move |_, _| calls_clone.fetch_add(1, Ordering::SeqCst));
        p.succeed(1);
        p.succeed(2);
        assert_eq!(h.wait().ok(), Some(0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    // =========================================================================
    // chaining
    // =========================================================================

    #[test]
    fn chain_changes_types() {
        let p = Promise::ready(4)
            .map(|x| x * 10)
            .map(|x| format!("n={x}"))
            .map(|s| s.len());
        assert_eq!(p.wait().ok(), Some(4));
    }

    #[test]
    fn failure_then_map_then_recover_yields_default() {
        let (called, seen) = flag();
        let p: Promise<String> = Promise::failed(Failure::task("Remote failure"));
        let out = p
            .map(move |s: String| {
                called.store(true, Ordering::SeqCst);
                s.to_uppercase()
            })
            .recover(|_| "DEFAULT".to_string());
        assert_eq!(out.wait().ok().as_deref(), Some("DEFAULT"));
        assert!(!seen.load(Ordering::SeqCst));
    }

    #[test]
    fn stages_on_pending_run_when_resolved() {
        let p: Promise<i32> = Promise::pending();
        let mapped = p.map(|x| x + 1);
        assert!(!mapped.is_done());
        p.succeed(1);
        assert_eq!(mapped.wait().ok(), Some(2));
    }

    #[test]
    fn sibling_stages_run_in_attach_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let p: Promise<i32> = Promise::pending();
        let stages: Vec<Promise<()>> = (0..4)
            .map(|i| {
                let order = Arc::clone(&order);
                p.map(move |_| order.lock().push(i))
            })
            .collect();
        p.succeed(0);
        for s in &stages {
            assert!(s.wait().is_ok());
        }
        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
    }

    // =========================================================================
    // and_then / inspect
    // =========================================================================

    #[test]
    fn and_then_flattens() {
        let inner: Promise<String> = Promise::pending();
        let inner_clone = inner.clone();
        let p = Promise::ready(2).and_then(move |_| inner_clone);
        assert!(!p.is_done());
        inner.succeed("inner".into());
        assert_eq!(p.wait().ok().as_deref(), Some("inner"));
    }

    #[test]
    fn and_then_skips_on_failure() {
        let p: Promise<i32> = Promise::failed(Failure::task("first"));
        let chained = p.and_then(|x| Promise::ready(x + 1));
        assert_eq!(chained.wait().unwrap_err().message(), "first");
    }

    #[test]
    fn and_then_panic_is_contained() {
        let p = Promise::ready(1).and_then(|_| -> Promise<i32> { panic!("no inner") });
        assert_eq!(p.wait().unwrap_err().category(), FailureCategory::Combinator);
    }

    #[test]
    fn inspect_passes_result_through() {
        let (called, seen) = flag();
        let p = Promise::ready(8).inspect(move |r| {
            called.store(r.is_ok(), Ordering::SeqCst);
        });
        assert_eq!(p.wait().ok(), Some(8));
        assert!(seen.load(Ordering::SeqCst));
    }

    #[test]
    fn cancelling_downstream_leaves_upstream_alone() {
        let p: Promise<i32> = Promise::pending();
        let mapped = p.map(|x| x * 2);
        assert!(mapped.cancel());
        p.succeed(5);
        assert!(mapped.is_cancelled());
        assert_eq!(p.wait().ok(), Some(5));
    }

    #[test]
    fn cancelled_upstream_flows_through_map() {
        let p: Promise<i32> = Promise::pending();
        let mapped = p.map(|x| x * 2);
        p.cancel();
        assert!(mapped.wait().unwrap_err().is_cancelled());
    }
}
