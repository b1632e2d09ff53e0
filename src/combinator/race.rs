//! Race combinator: the first promise to settle wins.
//!
//! `race(ps)` resolves with whatever the first member to settle resolves
//! with, success or failure. On success the winner's input position is
//! reported in [`RaceWinner::index`]; a winning failure is passed through
//! unchanged.
//!
//! Losers keep running by default. [`race_cancel_losers`] additionally
//! cancels every still-pending loser with [`CancelKind::RaceLost`]; for
//! executor tasks that have not started yet this means their bodies never
//! run.
//!
//! [`CancelKind::RaceLost`]: crate::types::CancelKind::RaceLost

use std::sync::Arc;

use crate::error::Failure;
use crate::promise::Promise;
use crate::types::CancelReason;

/// The winning member of a race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceWinner<T> {
    /// Input position of the winner.
    pub index: usize,
    /// The winner's value.
    pub value: T,
}

/// Resolves with the first member to settle.
///
/// An empty race can never produce a winner and fails immediately with a
/// combinator failure.
pub fn race<T, I>(promises: I) -> Promise<RaceWinner<T>>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Promise<T>>,
{
    race_inner(promises.into_iter().collect(), false)
}

/// Like [`race`], but cancels every pending loser once a winner is known.
pub fn race_cancel_losers<T, I>(promises: I) -> Promise<RaceWinner<T>>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Promise<T>>,
{
    race_inner(promises.into_iter().collect(), true)
}

fn race_inner<T>(promises: Vec<Promise<T>>, cancel_losers: bool) -> Promise<RaceWinner<T>>
where
    T: Clone + Send + Sync + 'static,
{
    if promises.is_empty() {
        return Promise::failed(Failure::combinator("race over no promises"));
    }

    let out = Promise::pending();
    let members = Arc::new(promises);

    for (index, promise) in members.iter().enumerate() {
        let out = out.clone();
        let losers = cancel_losers.then(|| Arc::clone(&members));
        promise.on_complete(move |result| {
            let won = out.complete(match result {
                Ok(value) => Ok(RaceWinner {
                    index,
                    value: value.clone(),
                }),
                Err(failure) => Err(failure.clone()),
            });
            if let (true, Some(members)) = (won, losers) {
                let reason = CancelReason::race_lost();
                for (i, loser) in members.iter().enumerate() {
                    if i != index {
                        loser.cancel_with(&reason);
                    }
                }
            }
        });
    }

    out
}
