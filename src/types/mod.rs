//! Core types shared across the engine.
//!
//! - [`id`]: Task identifiers
//! - [`outcome`]: Promise state snapshots and panic payloads
//! - [`cancel`]: Cancellation reason and kind types

pub mod cancel;
pub mod id;
pub mod outcome;

pub use cancel::{CancelKind, CancelReason};
pub use id::TaskId;
pub use outcome::{PanicPayload, PromiseState};
