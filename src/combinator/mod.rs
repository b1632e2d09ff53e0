//! Combinators that aggregate many promises into one.
//!
//! - [`join`]: [`all`] (fail-fast) and [`all_settled`] (total), both
//!   index-aligned with their input
//! - [`race`](mod@race): first member to settle wins
//!
//! Stages on a single promise (`map`, `recover`, `handle`, ...) live on
//! [`Promise`](crate::Promise) itself.

pub mod join;
pub mod race;

pub use join::{all, all_settled};
pub use race::{race, race_cancel_losers, RaceWinner};
