//! Sample workloads built on the public API.
//!
//! Three scenarios exercise the combinator stages end to end:
//!
//! - [`exceptionally`]: a validation failure recovered to `"Unknown"` and
//!   then mapped to a process verdict.
//! - [`handle`]: the same failure recovered through a two-argument handler.
//! - [`multiple_downloads`]: simulated remote fetches that all fail, each
//!   handled into a status line and gathered with [`all_settled`].
//!
//! Progress is reported through an injected [`LogSink`].

use std::sync::Arc;
use std::time::Duration;

use crate::combinator::all_settled;
use crate::error::Failure;
use crate::observability::{LogRecord, LogSink};
use crate::promise::Promise;
use crate::runtime::Executor;

/// Message carried by every simulated fetch failure.
pub const REMOTE_FAILURE: &str = "Remote failure";

/// Classifies an age, rejecting negative values.
pub fn classify_age(age: i32) -> Result<&'static str, Failure> {
    if age < 0 {
        return Err(Failure::task("Age cannot be negative"));
    }
    Ok(if age > 18 { "Adult" } else { "Child" })
}

/// Recovers a failed classification to `"Unknown"`, then maps it to
/// `"Process failed"` or `"Process Succeed"`.
pub fn exceptionally(executor: &Executor, age: i32, sink: Arc<dyn LogSink>) -> Promise<String> {
    executor
        .submit(move || classify_age(age).map(str::to_string))
        .recover(move |failure| {
            sink.record(
                LogRecord::warn("Oops! We have an exception")
                    .with_field("error", failure.message()),
            );
            "Unknown".to_string()
        })
        .map(|status| {
            if status.eq_ignore_ascii_case("Unknown") {
                "Process failed".to_string()
            } else {
                "Process Succeed".to_string()
            }
        })
}

/// Recovers a failed classification to `"Unknown!"` through `handle`.
pub fn handle(executor: &Executor, age: i32, sink: Arc<dyn LogSink>) -> Promise<String> {
    executor
        .submit(move || classify_age(age).map(str::to_string))
        .handle(move |value, failure| match (value, failure) {
            (Some(value), None) => value,
            (None, Some(failure)) => {
                sink.record(
                    LogRecord::warn("Oops! We have an exception")
                        .with_field("error", failure.message()),
                );
                "Unknown!".to_string()
            }
            _ => unreachable!("handle passes exactly one of value or failure"),
        })
}

/// Returns `count` download locations.
#[must_use]
pub fn download_locations(count: usize) -> Vec<String> {
    (1..=count)
        .map(|i| format!("ftp://127.0.0.1/test{i}.out"))
        .collect()
}

/// Simulates a remote fetch that fails with [`REMOTE_FAILURE`] after `delay`.
pub fn fetch(
    executor: &Executor,
    location: String,
    delay: Duration,
    sink: Arc<dyn LogSink>,
) -> Promise<String> {
    executor.submit(move || {
        sink.record(LogRecord::info("Start Download").with_field("location", &location));
        std::thread::sleep(delay);
        Err(Failure::task(REMOTE_FAILURE))
    })
}

/// Fetches `location` and handles the outcome into a status line.
///
/// Always succeeds: `"Completed --> <location>"` or
/// `"Failed --> <location>"`.
pub fn download_status(
    executor: &Executor,
    location: String,
    delay: Duration,
    sink: Arc<dyn LogSink>,
) -> Promise<String> {
    let fetch_sink = Arc::clone(&sink);
    fetch(executor, location.clone(), delay, fetch_sink).handle(move |value, failure| {
        match (value, failure) {
            (Some(_), None) => format!("Completed --> {location}"),
            (None, Some(failure)) => {
                sink.record(
                    LogRecord::warn("Oops! We have an exception")
                        .with_field("location", &location)
                        .with_field("error", failure.message()),
                );
                format!("Failed --> {location}")
            }
            _ => unreachable!("handle passes exactly one of value or failure"),
        }
    })
}

/// Starts every download concurrently and gathers the status lines in
/// submission order.
pub fn multiple_downloads(
    executor: &Executor,
    locations: &[String],
    delay: Duration,
    sink: &Arc<dyn LogSink>,
) -> Promise<Vec<Result<String, Failure>>> {
    let downloads: Vec<_> = locations
        .iter()
        .map(|location| download_status(executor, location.clone(), delay, Arc::clone(sink)))
        .collect();
    all_settled(downloads)
}

/// Renders gathered results one per line.
#[must_use]
pub fn render_report(results: &[Result<String, Failure>]) -> String {
    results
        .iter()
        .map(|r| match r {
            Ok(line) => line.clone(),
            Err(failure) => format!("Error --> {failure}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
