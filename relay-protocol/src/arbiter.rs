// Six-phase arbitration state machine.
//
// Phases run strictly in order and are never revisited:
//   1. initial check   — abstain if anyone already claimed
//   2. claim           — place our own claim mark
//   3. claim window    — fixed wait (CLAIM_WAIT)
//   4. collect         — freeze the participant set, exactly once
//   5. compute order   — decide_order, exactly once
//   6. confirmation    — walk the order, first observed confirm wins
//
// Failure handling is the protocol's entire recovery mechanism: a
// candidate that crashes, times out or fails its write is simply never
// observed confirming, and every other participant advances the pointer.
// No rollback, no retry, no re-read of the claim set mid-round.

use std::collections::HashSet;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::channel::{MarkTag, ReactionChannel};
use crate::ordering::decide_order;
use crate::types::ArbitrationContext;
use crate::{CLAIM_WAIT, CONFIRM_WAIT};

/// Drives one arbitration round per call over an injected channel.
///
/// Holds no round state of its own; a single instance is safely shared
/// across concurrent rounds for different resources.
pub struct Arbiter<C> {
    channel: C,
}

impl<C: ReactionChannel> Arbiter<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    /// Run one full round. Returns `true` iff this participant won and
    /// must perform the expensive action.
    ///
    /// Never fails: every channel error is absorbed into a verdict. The
    /// only observable outputs of a round are the marks it writes and
    /// the returned boolean.
    pub async fn compete(&self, ctx: &ArbitrationContext) -> bool {
        let resource = ctx.resource;

        // Phase 1: if a claim is already visible, this round started
        // without us; abstain. A failed read also abstains: proceeding
        // on uncertain information risks a duplicate winner.
        match self.channel.observe(resource, MarkTag::Claim).await {
            Ok(claimants) if !claimants.is_empty() => {
                debug!(%resource, claimants = claimants.len(), "claim already present, abstaining");
                return false;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(%resource, error = %e, "initial claim read failed, abstaining");
                return false;
            }
        }

        // Phase 2: place our claim.
        if let Err(e) = self.channel.mark(resource, MarkTag::Claim).await {
            warn!(%resource, error = %e, "claim mark failed, abstaining");
            return false;
        }

        // Phase 3: fixed claim window.
        sleep(CLAIM_WAIT).await;

        // Phase 4: freeze the participant set. This is the only collect;
        // the set is never re-read afterwards. An empty or failed read
        // here means the channel could not reflect our own successful
        // claim within the window: we are the only known claimant, so we
        // proceed. This is evidence of channel staleness, not of losing.
        let participants: HashSet<_> = match self.channel.observe(resource, MarkTag::Claim).await {
            Ok(claimants) if claimants.is_empty() => {
                warn!(%resource, "own claim not visible after window, proceeding as sole claimant");
                return true;
            }
            Ok(claimants) => claimants,
            Err(e) => {
                warn!(%resource, error = %e, "collect read failed, proceeding as sole claimant");
                return true;
            }
        };

        // Phase 5: compute the order, exactly once.
        let order = match decide_order(&participants, ctx.event_time) {
            Ok(order) => order,
            Err(e) => {
                warn!(%resource, error = %e, "order computation failed, abstaining");
                return false;
            }
        };
        debug!(%resource, candidates = order.len(), "order fixed");

        // Phase 6: sequential confirmation. Strictly in order, one
        // candidate per window, never skipping ahead. The first round in
        // which any confirm mark is observed ends the protocol for
        // everyone; whether we won is just whether it was our turn.
        for candidate in &order {
            if *candidate == ctx.self_id {
                // Our turn: place the confirmation mark. Failure is
                // logged and ignored; the observe below is the only
                // signal with "happens" semantics.
                if let Err(e) = self.channel.mark(resource, MarkTag::Confirm).await {
                    warn!(%resource, error = %e, "confirm mark failed");
                }
            }

            sleep(CONFIRM_WAIT).await;

            match self.channel.observe(resource, MarkTag::Confirm).await {
                Ok(confirmers) if !confirmers.is_empty() => {
                    let won = *candidate == ctx.self_id;
                    debug!(%resource, %candidate, won, "confirmation observed");
                    return won;
                }
                Ok(_) => {}
                Err(e) => {
                    // Indistinguishable from "no confirmation yet";
                    // advance the pointer like everyone else will.
                    debug!(%resource, error = %e, "confirm read failed, advancing");
                }
            }
        }

        // Every candidate had its window and none confirmed: the round
        // produced no winner. A legitimate steady-state outcome.
        warn!(%resource, "no confirmation observed, round void");
        false
    }
}
