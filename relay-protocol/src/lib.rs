//! Reaction-Based Leader-Election Protocol
//!
//! Multiple independent bot instances observe the same inbound message and
//! must agree on exactly one instance that performs the expensive reply
//! work, with no shared memory, no coordination service and no reliable
//! broadcast. The only communication medium is a lossy, eventually-visible
//! reaction API on the message itself.
//!
//! Consistency comes from determinism, not from control: every participant
//! that observes the same final claimant set and the same message timestamp
//! computes bit-for-bit the same winner order, then confirms the winner by
//! observing a single irrevocable confirmation mark.
//!
//! The protocol is stateless between rounds. Nothing is persisted, nothing
//! is retried, and failure recovery is forward-only pointer advancement
//! through the precomputed order.

pub mod arbiter;
pub mod channel;
pub mod ordering;
pub mod types;

pub use arbiter::Arbiter;
pub use channel::{ChannelError, MarkTag, ReactionChannel};
pub use ordering::{decide_order, OrderingError};
pub use types::{ArbitrationContext, ParticipantId, ResourceId};

use std::time::Duration;

/// Claim-window duration: how long a participant waits after placing its
/// claim mark before freezing the participant set.
///
/// Protocol constant. Identical across every deployed participant; making
/// this configurable per participant breaks global consistency.
pub const CLAIM_WAIT: Duration = Duration::from_millis(1000);

/// Per-candidate confirmation-window duration in the failover loop.
///
/// Protocol constant, same deployment rule as [`CLAIM_WAIT`].
pub const CONFIRM_WAIT: Duration = Duration::from_millis(700);

/// Rotation granularity for the winner order, in seconds of event time.
///
/// Protocol constant, same deployment rule as [`CLAIM_WAIT`].
pub const TIME_SLICE: i64 = 60;
