//! Worker pool that runs task bodies and resolves their promises.
//!
//! ```text
//!   submit(body) ──► Task ──► SegQueue ──► worker 0..N ──► task.run()
//!        │                                                   │
//!        └──► Promise (Pending) ◄──────── complete(result) ◄─┘
//! ```
//!
//! # Design
//!
//! A fixed set of OS threads is spawned when the executor is built. Workers
//! pop jobs from a lock-free FIFO queue and park on a condition variable
//! when it is empty. Submission never blocks: it pushes the job, wakes one
//! worker and returns the pending promise.
//!
//! ## Lifecycle of a job
//!
//! - Every job resolves its promise exactly once. A body that returns an
//!   error or panics resolves it `Failed`.
//! - A job whose promise was cancelled while queued is skipped; its body
//!   never runs.
//! - A job that is dropped without running (queued at shutdown with no
//!   worker left) cancels its promise with [`CancelKind::Shutdown`], so no
//!   waiter is left hanging.
//!
//! ## Shutdown
//!
//! [`Executor::shutdown`] stops accepting work; workers drain the queue
//! and exit. Dropping the executor shuts down and waits up to
//! `shutdown_timeout` for the workers.
//!
//! [`CancelKind::Shutdown`]: crate::types::CancelKind::Shutdown

use crossbeam_queue::SegQueue;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{BuildError, Failure};
use crate::promise::Promise;
use crate::runtime::builder::ExecutorBuilder;
use crate::runtime::config::ExecutorConfig;
use crate::task::Task;
use crate::tracing_compat::{debug, trace, warn};
use crate::types::{CancelReason, TaskId};

/// A type-erased queued job.
trait Job: Send {
    fn id(&self) -> TaskId;
    fn run(self: Box<Self>);
}

/// A task paired with the promise it resolves.
struct ScheduledTask<T> {
    id: TaskId,
    task: Option<Task<T>>,
    promise: Promise<T>,
}

impl<T: Send + Sync + 'static> Job for ScheduledTask<T> {
    fn id(&self) -> TaskId {
        self.id
    }

    fn run(mut self: Box<Self>) {
        let Some(task) = self.task.take() else {
            return;
        };
        let id = self.id;
        if self.promise.is_done() {
            trace!(task = %id, "skipping task resolved before start");
            return;
        }
        let result = task.run();
        let failed = result.is_err();
        if self.promise.complete(result) {
            trace!(task = %id, failed, "task resolved");
        }
    }
}

impl<T> Drop for ScheduledTask<T> {
    fn drop(&mut self) {
        if self.task.take().is_some() {
            self.promise.cancel_with(&CancelReason::shutdown());
        }
    }
}

struct ExecutorInner {
    config: ExecutorConfig,
    /// Work queue.
    queue: SegQueue<Box<dyn Job>>,
    /// Number of queued jobs.
    pending_count: AtomicUsize,
    /// Number of live worker threads.
    active_threads: AtomicUsize,
    /// Number of workers currently running a job.
    busy_threads: AtomicUsize,
    /// Shutdown flag.
    shutdown: AtomicBool,
    /// Parking lot for idle workers.
    mutex: Mutex<()>,
    condvar: Condvar,
    /// Worker join handles.
    thread_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ExecutorInner {
    fn submit_task<T>(self: &Arc<Self>, task: Task<T>) -> Promise<T>
    where
        T: Send + Sync + 'static,
    {
        let promise = Promise::pending();
        let id = task.id();

        if self.shutdown.load(Ordering::Acquire) {
            debug!(task = %id, "rejecting task submitted after shutdown");
            promise.cancel_with(&CancelReason::shutdown());
            return promise;
        }

        // Counted before the push so a worker's decrement never runs first.
        self.pending_count.fetch_add(1, Ordering::Relaxed);
        self.queue.push(Box::new(ScheduledTask {
            id,
            task: Some(task),
            promise: promise.clone(),
        }));
        trace!(task = %id, "task submitted");

        {
            let _guard = self.mutex.lock();
            self.condvar.notify_one();
        }

        // Lost a race with shutdown after every worker already exited.
        if self.shutdown.load(Ordering::Acquire) && self.active_threads.load(Ordering::Acquire) == 0
        {
            self.drain_queue();
        }

        promise
    }

    /// Drops every queued job, cancelling their promises.
    fn drain_queue(&self) {
        while let Some(job) = self.queue.pop() {
            self.pending_count.fetch_sub(1, Ordering::Relaxed);
            debug!(task = %job.id(), "cancelling task dropped at shutdown");
            drop(job);
        }
    }

    fn notify_all(&self) {
        let _guard = self.mutex.lock();
        self.condvar.notify_all();
    }
}

/// The worker loop.
fn worker_loop(inner: &ExecutorInner) {
    loop {
        if let Some(job) = inner.queue.pop() {
            inner.pending_count.fetch_sub(1, Ordering::Relaxed);
            inner.busy_threads.fetch_add(1, Ordering::Relaxed);
            // Bodies and completion callbacks contain their own panics.
            job.run();
            inner.busy_threads.fetch_sub(1, Ordering::Relaxed);
            continue;
        }

        let mut guard = inner.mutex.lock();
        if !inner.queue.is_empty() {
            continue;
        }
        if inner.shutdown.load(Ordering::Acquire) {
            break;
        }
        inner.condvar.wait(&mut guard);
    }
}

fn spawn_worker(inner: &Arc<ExecutorInner>, index: usize) -> Result<(), BuildError> {
    let worker = Arc::clone(inner);
    let name = format!("{}-{index}", inner.config.thread_name_prefix);

    inner.active_threads.fetch_add(1, Ordering::AcqRel);
    let spawned = thread::Builder::new()
        .name(name)
        .stack_size(inner.config.thread_stack_size)
        .spawn(move || {
            if let Some(ref callback) = worker.config.on_thread_start {
                callback();
            }
            trace!(worker = index, "worker started");

            worker_loop(&worker);

            trace!(worker = index, "worker stopped");
            if let Some(ref callback) = worker.config.on_thread_stop {
                callback();
            }
            worker.active_threads.fetch_sub(1, Ordering::AcqRel);
        });

    match spawned {
        Ok(handle) => {
            inner.thread_handles.lock().push(handle);
            Ok(())
        }
        Err(err) => {
            inner.active_threads.fetch_sub(1, Ordering::AcqRel);
            Err(BuildError::Spawn(err))
        }
    }
}

/// Runs submitted tasks on a fixed pool of worker threads.
///
/// # Example
///
/// ```
/// use completable::{Executor, Failure};
///
/// let executor = Executor::builder().worker_threads(2).build().unwrap();
/// let age = -1;
/// let status = executor
///     .submit(move || {
///         if age < 0 {
///             return Err(Failure::task("Age cannot be negative"));
///         }
///         Ok(if age > 18 { "Adult" } else { "Child" })
///     })
///     .recover(|_| "Unknown");
/// assert_eq!(status.wait().ok(), Some("Unknown"));
/// ```
pub struct Executor {
    inner: Arc<ExecutorInner>,
}

impl Executor {
    /// Creates an executor with the default configuration.
    pub fn new() -> Result<Self, BuildError> {
        Self::with_config(ExecutorConfig::default())
    }

    /// Returns a builder for a custom executor.
    #[must_use]
    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::new()
    }

    /// Creates an executor from a configuration.
    pub fn with_config(config: ExecutorConfig) -> Result<Self, BuildError> {
        config.validate()?;
        let worker_threads = config.worker_threads;

        let inner = Arc::new(ExecutorInner {
            config,
            queue: SegQueue::new(),
            pending_count: AtomicUsize::new(0),
            active_threads: AtomicUsize::new(0),
            busy_threads: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
            mutex: Mutex::new(()),
            condvar: Condvar::new(),
            thread_handles: Mutex::new(Vec::with_capacity(worker_threads)),
        });
        let executor = Self { inner };

        for index in 0..worker_threads {
            // On failure, dropping `executor` stops the workers already spawned.
            spawn_worker(&executor.inner, index)?;
        }
        debug!(worker_threads, "executor started");

        Ok(executor)
    }

    /// Submits a fallible body for concurrent execution.
    ///
    /// Returns immediately with a pending promise. The body runs exactly
    /// once; an `Err` or a panic resolves the promise `Failed`.
    pub fn submit<T, F>(&self, body: F) -> Promise<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T, Failure> + Send + 'static,
    {
        self.inner.submit_task(Task::new(body))
    }

    /// Submits an infallible body.
    pub fn spawn<T, F>(&self, body: F) -> Promise<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.inner.submit_task(Task::from_fn(body))
    }

    /// Submits a prepared task.
    pub fn submit_task<T>(&self, task: Task<T>) -> Promise<T>
    where
        T: Send + Sync + 'static,
    {
        self.inner.submit_task(task)
    }

    /// Returns a cloneable handle for submitting from other threads.
    #[must_use]
    pub fn handle(&self) -> ExecutorHandle {
        ExecutorHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Returns the configuration this executor was built with.
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.inner.config
    }

    /// Returns the number of queued jobs.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending_count.load(Ordering::Relaxed)
    }

    /// Returns the number of live worker threads.
    #[must_use]
    pub fn active_threads(&self) -> usize {
        self.inner.active_threads.load(Ordering::Acquire)
    }

    /// Returns the number of workers currently running a job.
    #[must_use]
    pub fn busy_threads(&self) -> usize {
        self.inner.busy_threads.load(Ordering::Relaxed)
    }

    /// Returns `true` if the executor is shut down.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }

    /// Initiates shutdown.
    ///
    /// No new tasks are accepted. Queued tasks still run. Idempotent.
    pub fn shutdown(&self) {
        if !self.inner.shutdown.swap(true, Ordering::AcqRel) {
            debug!("executor shutting down");
        }
        self.inner.notify_all();
    }

    /// Shuts down and waits for all workers to exit.
    ///
    /// Returns `true` if every worker exited within `timeout`. Any job still
    /// queued after the workers exit is cancelled.
    pub fn shutdown_and_wait(&self, timeout: Duration) -> bool {
        self.shutdown();

        let deadline = Instant::now() + timeout;
        while self.inner.active_threads.load(Ordering::Acquire) > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(
                    active = self.inner.active_threads.load(Ordering::Acquire),
                    "executor workers still running after shutdown timeout"
                );
                return false;
            }
            self.inner.notify_all();
            thread::sleep(Duration::from_millis(5).min(remaining));
        }

        let current = thread::current().id();
        let handles: Vec<JoinHandle<()>> = self.inner.thread_handles.lock().drain(..).collect();
        for handle in handles {
            if handle.thread().id() != current {
                let _ = handle.join();
            }
        }
        self.inner.drain_queue();
        true
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        let _ = self.shutdown_and_wait(self.inner.config.shutdown_timeout);
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("worker_threads", &self.inner.config.worker_threads)
            .field("active_threads", &self.active_threads())
            .field("busy_threads", &self.busy_threads())
            .field("pending_tasks", &self.pending_count())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

/// A cloneable submission handle.
///
/// Handles do not keep workers alive: once the owning [`Executor`] shuts
/// down, submissions through a handle resolve as cancelled.
#[derive(Clone)]
pub struct ExecutorHandle {
    inner: Arc<ExecutorInner>,
}

impl ExecutorHandle {
    /// Submits a fallible body.
    pub fn submit<T, F>(&self, body: F) -> Promise<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T, Failure> + Send + 'static,
    {
        self.inner.submit_task(Task::new(body))
    }

    /// Submits an infallible body.
    pub fn spawn<T, F>(&self, body: F) -> Promise<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.inner.submit_task(Task::from_fn(body))
    }

    /// Returns `true` if the executor is shut down.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }
}

impl fmt::Debug for ExecutorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorHandle")
            .field("pending_tasks", &self.inner.pending_count.load(Ordering::Relaxed))
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}
