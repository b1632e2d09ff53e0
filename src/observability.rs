//! Injected log sinks for task bodies.
//!
//! The engine itself never writes to stdout, stderr or a global logger.
//! Code running inside tasks that wants to report progress receives an
//! `Arc<dyn LogSink>` and records structured [`LogRecord`]s through it.
//!
//! - [`NullSink`] discards everything.
//! - [`MemorySink`] keeps records in memory so tests can assert on them.
//! - `TracingSink` forwards to the `tracing` macros (requires the
//!   `tracing-integration` feature).
//!
//! # Example
//!
//! ```
//! use completable::observability::{LogLevel, LogRecord, LogSink, MemorySink};
//!
//! let sink = MemorySink::new();
//! sink.record(LogRecord::info("Downloading").with_field("location", "https://example.com/1"));
//! assert_eq!(sink.len(), 1);
//! assert_eq!(sink.records()[0].level(), LogLevel::Info);
//! ```

use core::fmt;
use parking_lot::Mutex;

/// Severity of a [`LogRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Very fine-grained detail.
    Trace,
    /// Debugging detail.
    Debug,
    /// Normal progress.
    Info,
    /// Something unexpected but recoverable.
    Warn,
    /// An operation failed.
    Error,
}

impl LogLevel {
    /// Returns the lowercase level name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    level: LogLevel,
    message: String,
    fields: Vec<(&'static str, String)>,
}

impl LogRecord {
    /// Creates a record at the given level.
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Creates a debug-level record.
    #[must_use]
    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, message)
    }

    /// Creates an info-level record.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    /// Creates a warn-level record.
    #[must_use]
    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, message)
    }

    /// Creates an error-level record.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    /// Attaches a key/value field.
    #[must_use]
    pub fn with_field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }

    /// Returns the level.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the attached fields in insertion order.
    #[must_use]
    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }

    /// Returns the value of the first field named `key`.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)?;
        for (key, value) in &self.fields {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

/// Destination for log records produced by task bodies.
pub trait LogSink: Send + Sync {
    /// Records one log line.
    fn record(&self, record: LogRecord);

    /// Returns `false` if records at `level` would be discarded.
    fn enabled(&self, level: LogLevel) -> bool {
        let _ = level;
        true
    }
}

/// A sink that discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn record(&self, _record: LogRecord) {}

    fn enabled(&self, _level: LogLevel) -> bool {
        false
    }
}

/// A sink that keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every record, in arrival order.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Returns the messages of every record, in arrival order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|r| r.message.clone())
            .collect()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Discards all records.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl LogSink for MemorySink {
    fn record(&self, record: LogRecord) {
        self.records.lock().push(record);
    }
}

/// A sink that forwards records to `tracing` events.
#[cfg(feature = "tracing-integration")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[cfg(feature = "tracing-integration")]
impl LogSink for TracingSink {
    fn record(&self, record: LogRecord) {
        let fields = record
            .fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        let message = record.message.as_str();
        match record.level {
            LogLevel::Trace => tracing::trace!(target: "completable::task", fields = %fields, "{message}"),
            LogLevel::Debug => tracing::debug!(target: "completable::task", fields = %fields, "{message}"),
            LogLevel::Info => tracing::info!(target: "completable::task", fields = %fields, "{message}"),
            LogLevel::Warn => tracing::warn!(target: "completable::task", fields = %fields, "{message}"),
            LogLevel::Error => tracing::error!(target: "completable::task", fields = %fields, "{message}"),
        }
    }
}
