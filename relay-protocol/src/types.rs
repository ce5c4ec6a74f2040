use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of any entity capable of marking the shared channel.
///
/// Participants are not assumed to be bots; a human pressing the same
/// reaction enters the candidate set like everyone else. The protocol
/// only requires that identities are comparable with a total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity of the shared event the round is arbitrated over (message id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub i64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Immutable inputs of one protocol round.
///
/// All three fields must come from the event itself. In particular
/// `event_time` is the source-observed timestamp carried by the message,
/// never a local clock read: every participant sees the same value, which
/// is what makes the computed order identical everywhere.
///
/// A round that cannot produce all three fields never starts; that is a
/// precondition failure (replayed or historical event, untrusted
/// timestamp), not an arbitration loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbitrationContext {
    /// The shared event being arbitrated.
    pub resource: ResourceId,
    /// Source-observed event timestamp, integer seconds.
    pub event_time: i64,
    /// This participant's own identity.
    pub self_id: ParticipantId,
}

impl ArbitrationContext {
    pub fn new(resource: ResourceId, event_time: i64, self_id: ParticipantId) -> Self {
        Self {
            resource,
            event_time,
            self_id,
        }
    }
}
