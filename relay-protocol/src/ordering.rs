// Deterministic winner-order computation.
//
// This is the consistency core of the protocol: a pure function from
// (participant set, event time) to a total order. Properties:
// - Identical output on every participant that froze the same set and
//   observed the same event time
// - No I/O, no wall clock, no self-identity, no randomness
// - Rotates the head of the order as event time crosses TIME_SLICE
//   boundaries, spreading first-responder duty without memory

use std::collections::HashSet;
use thiserror::Error;

use crate::types::ParticipantId;
use crate::TIME_SLICE;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum OrderingError {
    /// Degenerate input: the caller should have short-circuited on an
    /// empty claimant set before asking for an order.
    #[error("cannot order an empty participant set")]
    EmptyParticipants,
}

/// Compute the candidate order for one round.
///
/// Participants are sorted into canonical ascending order (the only
/// tie-break source), then rotated by
/// `floor(event_time / TIME_SLICE) mod n`. Euclidean division keeps the
/// result well defined for any `i64` timestamp.
///
/// Called exactly once per round, on the frozen participant set. Callers
/// must never recompute mid-round: participants that froze slightly
/// different sets would otherwise walk different orders.
pub fn decide_order(
    participants: &HashSet<ParticipantId>,
    event_time: i64,
) -> Result<Vec<ParticipantId>, OrderingError> {
    if participants.is_empty() {
        return Err(OrderingError::EmptyParticipants);
    }

    let mut sorted: Vec<ParticipantId> = participants.iter().copied().collect();
    sorted.sort_unstable();

    let n = sorted.len();
    let base = event_time.div_euclid(TIME_SLICE).rem_euclid(n as i64) as usize;

    Ok((0..n).map(|i| sorted[(base + i) % n]).collect())
}
