use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;

use crate::types::{ParticipantId, ResourceId};

/// The two protocol tags written to the shared channel.
///
/// How a tag is encoded on the wire (the original deployment uses fixed
/// reaction-emoji ids) is the channel implementation's business; the
/// protocol only distinguishes the two meanings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkTag {
    /// "I participate in this round's arbitration." Determines the
    /// participant set only; carries no priority.
    Claim,
    /// "I am this round's winner and am proceeding to act." Irrevocable
    /// once observed.
    Confirm,
}

/// Errors surfaced by a channel implementation.
///
/// The arbiter never inspects these beyond logging; any failure collapses
/// into a phase-specific verdict. They exist so channel implementations
/// can report what actually went wrong.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Transport-level failure (connect, timeout, broken stream).
    #[error("channel transport error: {0}")]
    Transport(String),

    /// The remote API answered with a non-success status.
    #[error("channel api error: {0}")]
    Api(String),

    /// The remote API answered with a payload we could not interpret.
    #[error("malformed channel payload: {0}")]
    Payload(String),
}

/// The shared read/write side channel all participants signal through.
///
/// Both operations are remote calls against an unreliable, eventually
/// visible medium. The arbiter treats every result as possibly stale:
/// a successful `mark` does not imply the next `observe` sees it.
///
/// Implementations are injected into the arbiter at construction; there
/// is deliberately no process-global client state.
#[async_trait]
pub trait ReactionChannel: Send + Sync {
    /// Read the set of participants whose `tag` marker is currently
    /// visible on `resource`. Duplicates collapse; observation order is
    /// meaningless.
    async fn observe(
        &self,
        resource: ResourceId,
        tag: MarkTag,
    ) -> Result<HashSet<ParticipantId>, ChannelError>;

    /// Add this participant's `tag` marker to `resource`.
    async fn mark(&self, resource: ResourceId, tag: MarkTag) -> Result<(), ChannelError>;
}

#[async_trait]
impl<C: ReactionChannel + ?Sized> ReactionChannel for std::sync::Arc<C> {
    async fn observe(
        &self,
        resource: ResourceId,
        tag: MarkTag,
    ) -> Result<HashSet<ParticipantId>, ChannelError> {
        (**self).observe(resource, tag).await
    }

    async fn mark(&self, resource: ResourceId, tag: MarkTag) -> Result<(), ChannelError> {
        (**self).mark(resource, tag).await
    }
}
