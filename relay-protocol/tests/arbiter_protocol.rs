//! Protocol scenario tests against a simulated channel.
//!
//! The simulated channel models the real medium's defining property:
//! marks become visible only after a propagation delay, and any call can
//! be made to fail per participant. Tests run under paused tokio time so
//! the fixed protocol windows elapse instantly and deterministically.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use relay_protocol::{
    Arbiter, ArbitrationContext, ChannelError, MarkTag, ParticipantId, ReactionChannel, ResourceId,
};

/// How long a written mark takes to become observable.
const VISIBILITY_DELAY: std::time::Duration = std::time::Duration::from_millis(100);

/// Per-participant failure injection.
#[derive(Debug, Clone, Copy, Default)]
struct Policy {
    /// Fail the phase-1 claim read.
    fail_first_claim_observe: bool,
    /// Fail the phase-4 collect read.
    fail_collect_observe: bool,
    /// Fail the phase-2 claim write.
    fail_claim_mark: bool,
    /// Fail the phase-6 confirm write.
    fail_confirm_mark: bool,
    /// Claim marks never become observable (extreme propagation lag).
    hide_claim_marks: bool,
}

/// Marks visible to every participant, with per-mark visibility times.
#[derive(Default)]
struct SimState {
    marks: Mutex<HashMap<(ResourceId, MarkTag), Vec<(ParticipantId, Instant)>>>,
}

impl SimState {
    /// Seed a mark that is already visible, as if placed long ago.
    fn seed_visible(&self, resource: ResourceId, tag: MarkTag, who: ParticipantId) {
        self.marks
            .lock()
            .unwrap()
            .entry((resource, tag))
            .or_default()
            .push((who, Instant::now()));
    }

    fn visible_set(&self, resource: ResourceId, tag: MarkTag) -> HashSet<ParticipantId> {
        let now = Instant::now();
        self.marks
            .lock()
            .unwrap()
            .get(&(resource, tag))
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, visible_at)| *visible_at <= now)
                    .map(|(who, _)| *who)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One participant's view of the shared channel.
struct SimChannel {
    state: Arc<SimState>,
    self_id: ParticipantId,
    policy: Policy,
    claim_observes: Arc<AtomicUsize>,
    confirm_observes: Arc<AtomicUsize>,
    marks_attempted: Arc<AtomicUsize>,
}

impl SimChannel {
    fn new(state: Arc<SimState>, self_id: ParticipantId, policy: Policy) -> Self {
        Self {
            state,
            self_id,
            policy,
            claim_observes: Arc::new(AtomicUsize::new(0)),
            confirm_observes: Arc::new(AtomicUsize::new(0)),
            marks_attempted: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl ReactionChannel for SimChannel {
    async fn observe(
        &self,
        resource: ResourceId,
        tag: MarkTag,
    ) -> Result<HashSet<ParticipantId>, ChannelError> {
        match tag {
            MarkTag::Claim => {
                let nth = self.claim_observes.fetch_add(1, Ordering::SeqCst);
                if nth == 0 && self.policy.fail_first_claim_observe {
                    return Err(ChannelError::Transport("injected: claim read".into()));
                }
                if nth > 0 && self.policy.fail_collect_observe {
                    return Err(ChannelError::Transport("injected: collect read".into()));
                }
                if self.policy.hide_claim_marks {
                    return Ok(HashSet::new());
                }
            }
            MarkTag::Confirm => {
                self.confirm_observes.fetch_add(1, Ordering::SeqCst);
            }
        }
        Ok(self.state.visible_set(resource, tag))
    }

    async fn mark(&self, resource: ResourceId, tag: MarkTag) -> Result<(), ChannelError> {
        self.marks_attempted.fetch_add(1, Ordering::SeqCst);
        match tag {
            MarkTag::Claim if self.policy.fail_claim_mark => {
                return Err(ChannelError::Api("injected: claim write".into()));
            }
            MarkTag::Confirm if self.policy.fail_confirm_mark => {
                return Err(ChannelError::Api("injected: confirm write".into()));
            }
            _ => {}
        }
        let visible_at = Instant::now() + VISIBILITY_DELAY;
        self.state
            .marks
            .lock()
            .unwrap()
            .entry((resource, tag))
            .or_default()
            .push((self.self_id, visible_at));
        Ok(())
    }
}

const RESOURCE: ResourceId = ResourceId(900_001);

/// event_time = 0 makes the rotation base 0: the order is the plain
/// ascending sort, which keeps failover expectations readable.
fn ctx(self_id: u64) -> ArbitrationContext {
    ArbitrationContext::new(RESOURCE, 0, ParticipantId(self_id))
}

/// Run one arbiter per participant concurrently against shared state.
async fn run_round(state: &Arc<SimState>, policies: &[(u64, Policy)]) -> Vec<(u64, bool)> {
    let mut tasks = Vec::new();
    for &(id, policy) in policies {
        let channel = SimChannel::new(Arc::clone(state), ParticipantId(id), policy);
        tasks.push(tokio::spawn(async move {
            let arbiter = Arbiter::new(channel);
            (id, arbiter.compete(&ctx(id)).await)
        }));
    }

    let mut verdicts = Vec::new();
    for task in tasks {
        verdicts.push(task.await.unwrap());
    }
    verdicts
}

#[tokio::test(start_paused = true)]
async fn already_claimed_short_circuits_without_side_effects() {
    let state = Arc::new(SimState::default());
    state.seed_visible(RESOURCE, MarkTag::Claim, ParticipantId(77));

    let channel = SimChannel::new(Arc::clone(&state), ParticipantId(1), Policy::default());
    let marks = Arc::clone(&channel.marks_attempted);

    let arbiter = Arbiter::new(channel);
    assert!(!arbiter.compete(&ctx(1)).await);
    assert_eq!(marks.load(Ordering::SeqCst), 0, "abstaining must not write");
}

#[tokio::test(start_paused = true)]
async fn failed_initial_read_fails_closed() {
    let state = Arc::new(SimState::default());
    let policy = Policy {
        fail_first_claim_observe: true,
        ..Policy::default()
    };

    let channel = SimChannel::new(Arc::clone(&state), ParticipantId(1), policy);
    let marks = Arc::clone(&channel.marks_attempted);

    let arbiter = Arbiter::new(channel);
    assert!(!arbiter.compete(&ctx(1)).await);
    assert_eq!(marks.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_claim_write_abstains() {
    let state = Arc::new(SimState::default());
    let policy = Policy {
        fail_claim_mark: true,
        ..Policy::default()
    };

    let channel = SimChannel::new(Arc::clone(&state), ParticipantId(1), policy);
    let arbiter = Arbiter::new(channel);
    assert!(!arbiter.compete(&ctx(1)).await);
}

#[tokio::test(start_paused = true)]
async fn sole_claimant_fast_path_skips_confirmation() {
    let state = Arc::new(SimState::default());
    let policy = Policy {
        hide_claim_marks: true,
        ..Policy::default()
    };

    let channel = SimChannel::new(Arc::clone(&state), ParticipantId(1), policy);
    let confirm_observes = Arc::clone(&channel.confirm_observes);

    let arbiter = Arbiter::new(channel);
    assert!(
        arbiter.compete(&ctx(1)).await,
        "own claim invisible after the window means we proceed"
    );
    assert_eq!(
        confirm_observes.load(Ordering::SeqCst),
        0,
        "fast path must terminate before the confirmation loop"
    );
}

#[tokio::test(start_paused = true)]
async fn failed_collect_read_proceeds_optimistically() {
    let state = Arc::new(SimState::default());
    let policy = Policy {
        fail_collect_observe: true,
        ..Policy::default()
    };

    let channel = SimChannel::new(Arc::clone(&state), ParticipantId(1), policy);
    let arbiter = Arbiter::new(channel);
    assert!(arbiter.compete(&ctx(1)).await);
}

#[tokio::test(start_paused = true)]
async fn single_participant_wins_its_own_round() {
    let state = Arc::new(SimState::default());
    let verdicts = run_round(&state, &[(1, Policy::default())]).await;
    assert_eq!(verdicts, vec![(1, true)]);
}

#[tokio::test(start_paused = true)]
async fn sequential_failover_promotes_first_confirmable_candidate() {
    let state = Arc::new(SimState::default());

    // Order is [1, 2, 3]; only participant 3 can write its confirm mark.
    let broken = Policy {
        fail_confirm_mark: true,
        ..Policy::default()
    };
    let verdicts = run_round(
        &state,
        &[(1, broken), (2, broken), (3, Policy::default())],
    )
    .await;

    let by_id: HashMap<u64, bool> = verdicts.into_iter().collect();
    assert_eq!(by_id[&1], false);
    assert_eq!(by_id[&2], false);
    assert_eq!(by_id[&3], true);
}

#[tokio::test(start_paused = true)]
async fn exhaustion_leaves_no_winner() {
    let state = Arc::new(SimState::default());

    let broken = Policy {
        fail_confirm_mark: true,
        ..Policy::default()
    };
    let verdicts = run_round(&state, &[(1, broken), (2, broken), (3, broken)]).await;

    assert!(
        verdicts.iter().all(|&(_, won)| !won),
        "a round with no observable confirmation is void for everyone"
    );
}

#[tokio::test(start_paused = true)]
async fn at_most_one_winner_in_a_healthy_round() {
    let state = Arc::new(SimState::default());

    let policies: Vec<(u64, Policy)> =
        (1..=5).map(|id| (id, Policy::default())).collect();
    let verdicts = run_round(&state, &policies).await;

    let winners: Vec<u64> = verdicts
        .iter()
        .filter(|&&(_, won)| won)
        .map(|&(id, _)| id)
        .collect();
    assert_eq!(winners.len(), 1, "verdicts: {verdicts:?}");
    // base = 0, so the head of the ascending order confirms first.
    assert_eq!(winners[0], 1);
}

#[tokio::test(start_paused = true)]
async fn claim_write_failures_shrink_the_round_but_keep_one_winner() {
    let state = Arc::new(SimState::default());

    let no_claim = Policy {
        fail_claim_mark: true,
        ..Policy::default()
    };
    let verdicts = run_round(
        &state,
        &[(1, no_claim), (2, Policy::default()), (3, Policy::default())],
    )
    .await;

    let by_id: HashMap<u64, bool> = verdicts.into_iter().collect();
    assert_eq!(by_id[&1], false, "a participant that never claimed abstains");
    assert_eq!(
        by_id.values().filter(|&&won| won).count(),
        1,
        "exactly one of the remaining claimants wins"
    );
}
