//! The per-world quorum state machine.
//!
//! A [`QuorumTracker`] counts participants currently resting in one world.
//! Each inbound event is processed to completion: update the counter,
//! re-evaluate against the live population when the event can complete a
//! quorum, then emit exactly one side effect (a progress notice, or the
//! transition followed by the morning notice).
//!
//! # States
//!
//! The counter alone encodes the state: `resting == 0` is Idle, anything
//! above is Accumulating. A transition returns the tracker to Idle.
//!
//! # Edge cases
//!
//! | Situation | Policy |
//! |---|---|
//! | counter would go negative | clamp to 0 |
//! | population is 0 at evaluation | never transitions |
//! | threshold outside `[0, 1]` | rejected, previous value kept |
//! | transition fires | counter reset to 0 regardless of overcount |
//! | participant joins twice without leaving | counted twice |
//!
//! The tracker is not `Sync`-aware: callers serialize access, normally by
//! running it inside [`crate::actor`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use slumber_types::{ParticipantId, RestCause, WorldId};
use tracing::{debug, info};

use crate::host::WorldHost;
use crate::notice::Notice;
use crate::threshold::{QuorumError, Threshold};

/// Result of processing one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The event did not concern the quorum (departure of a non-resting
    /// participant).
    Ignored,

    /// The counter changed and the quorum is not (or was not re-checked as)
    /// reached.
    Accumulating {
        /// Participants counted as resting after the event.
        resting: u32,
        /// Head count required at the moment of the event.
        required: u32,
    },

    /// The quorum was reached: the host fast-forwarded and the counter was
    /// reset.
    Transitioned {
        /// Counter value that triggered the transition.
        resting: u32,
        /// Population observed at evaluation.
        population: u32,
        /// Head count required at evaluation.
        required: u32,
    },
}

impl Outcome {
    /// Whether this outcome fired the transition.
    pub const fn is_transition(&self) -> bool {
        matches!(self, Self::Transitioned { .. })
    }
}

/// Read-only view of a tracker's state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackerSnapshot {
    /// The world this tracker belongs to.
    pub world: WorldId,
    /// Participants currently counted as resting.
    pub resting: u32,
    /// Active threshold.
    pub threshold: Threshold,
    /// Number of transitions fired since creation.
    pub transitions: u64,
    /// Wall-clock time of the most recent transition.
    pub last_transition_at: Option<DateTime<Utc>>,
}

/// Quorum state machine for a single world.
#[derive(Debug)]
pub struct QuorumTracker<H> {
    world: WorldId,
    host: H,
    threshold: Threshold,
    resting: u32,
    transitions: u64,
    last_transition_at: Option<DateTime<Utc>>,
}

impl<H: WorldHost> QuorumTracker<H> {
    /// Create an idle tracker for `world`.
    pub const fn new(world: WorldId, threshold: Threshold, host: H) -> Self {
        Self {
            world,
            host,
            threshold,
            resting: 0,
            transitions: 0,
            last_transition_at: None,
        }
    }

    /// A participant entered the resting state.
    ///
    /// The caller has already checked the participant is allowed to affect
    /// the quorum.
    pub fn on_join_rest(&mut self, participant: ParticipantId) -> Outcome {
        self.resting = self.resting.saturating_add(1);
        debug!(world = %self.world, %participant, resting = self.resting, "participant resting");
        self.evaluate(participant, RestCause::Joined)
    }

    /// A participant left the resting state before the transition.
    ///
    /// Leaving never triggers the transition; only a progress notice is sent.
    pub fn on_leave_rest(&mut self, participant: ParticipantId) -> Outcome {
        self.resting = self.resting.saturating_sub(1);
        let required = self.threshold.required_count(self.host.population_size());
        debug!(
            world = %self.world,
            %participant,
            resting = self.resting,
            required,
            "participant stopped resting"
        );
        self.announce(participant, RestCause::Left, required);
        Outcome::Accumulating {
            resting: self.resting,
            required,
        }
    }

    /// A participant disconnected from the world.
    ///
    /// The host must already have removed the participant from its
    /// population. When the participant was resting both sides of the ratio
    /// changed, so the quorum is re-checked.
    pub fn on_participant_departed(
        &mut self,
        participant: ParticipantId,
        was_resting: bool,
    ) -> Outcome {
        if !was_resting {
            return Outcome::Ignored;
        }
        self.resting = self.resting.saturating_sub(1);
        debug!(world = %self.world, %participant, resting = self.resting, "resting participant departed");
        self.evaluate(participant, RestCause::Departed)
    }

    /// A participant explicitly asked to be counted.
    pub fn on_manual_trigger(&mut self, participant: ParticipantId) -> Outcome {
        self.resting = self.resting.saturating_add(1);
        debug!(world = %self.world, %participant, resting = self.resting, "manual rest request");
        self.evaluate(participant, RestCause::Requested)
    }

    /// Replace the threshold from a raw value.
    ///
    /// Takes effect at the next evaluation; never evaluates by itself.
    /// Returns the previous threshold.
    ///
    /// # Errors
    ///
    /// Returns [`QuorumError::InvalidThreshold`] and keeps the current value
    /// when `value` is outside `[0, 1]`.
    pub fn reconfigure_threshold(&mut self, value: f64) -> Result<Threshold, QuorumError> {
        let threshold = Threshold::new(value)?;
        Ok(self.set_threshold(threshold))
    }

    /// Replace the threshold with an already validated one, returning the
    /// previous value.
    pub fn set_threshold(&mut self, threshold: Threshold) -> Threshold {
        let previous = core::mem::replace(&mut self.threshold, threshold);
        info!(world = %self.world, %previous, current = %threshold, "threshold reconfigured");
        previous
    }

    /// Current state of the tracker.
    pub const fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            world: self.world,
            resting: self.resting,
            threshold: self.threshold,
            transitions: self.transitions,
            last_transition_at: self.last_transition_at,
        }
    }

    /// Participants currently counted as resting.
    pub const fn resting(&self) -> u32 {
        self.resting
    }

    /// Active threshold.
    pub const fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// The world this tracker belongs to.
    pub const fn world(&self) -> WorldId {
        self.world
    }

    /// The host this tracker reports to.
    pub const fn host(&self) -> &H {
        &self.host
    }

    fn evaluate(&mut self, participant: ParticipantId, cause: RestCause) -> Outcome {
        let population = self.host.population_size();
        let required = self.threshold.required_count(population);

        if !self.threshold.is_reached(self.resting, population) {
            self.announce(participant, cause, required);
            return Outcome::Accumulating {
                resting: self.resting,
                required,
            };
        }

        self.host.apply_transition();
        self.host.broadcast(&Notice::Morning);

        let resting = core::mem::take(&mut self.resting);
        self.transitions = self.transitions.saturating_add(1);
        self.last_transition_at = Some(Utc::now());

        info!(
            world = %self.world,
            resting,
            population,
            required,
            transitions = self.transitions,
            "quorum reached, world fast-forwarded"
        );

        Outcome::Transitioned {
            resting,
            population,
            required,
        }
    }

    fn announce(&self, participant: ParticipantId, cause: RestCause, required: u32) {
        self.host.broadcast(&Notice::Resting {
            participant,
            name: self.host.display_name(participant),
            cause,
            resting: self.resting,
            required,
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;

    /// Host double with a settable population that records every call.
    #[derive(Default)]
    struct FakeHost {
        population: Cell<u32>,
        notices: RefCell<Vec<Notice>>,
        transitions: Cell<u32>,
    }

    impl FakeHost {
        fn with_population(population: u32) -> Self {
            let host = Self::default();
            host.population.set(population);
            host
        }
    }

    impl WorldHost for FakeHost {
        fn population_size(&self) -> u32 {
            self.population.get()
        }

        fn broadcast(&self, notice: &Notice) {
            self.notices.borrow_mut().push(notice.clone());
        }

        fn apply_transition(&self) {
            self.transitions.set(self.transitions.get().saturating_add(1));
        }

        fn display_name(&self, _participant: ParticipantId) -> String {
            String::from("p")
        }
    }

    fn tracker(population: u32, threshold: f64) -> QuorumTracker<FakeHost> {
        QuorumTracker::new(
            WorldId::new(),
            Threshold::new(threshold).unwrap(),
            FakeHost::with_population(population),
        )
    }

    #[test]
    fn starts_idle() {
        let t = tracker(4, 0.5);
        assert_eq!(t.resting(), 0);
        let snap = t.snapshot();
        assert_eq!(snap.transitions, 0);
        assert!(snap.last_transition_at.is_none());
    }

    #[test]
    fn half_of_four_needs_two() {
        let mut t = tracker(4, 0.5);
        let first = t.on_join_rest(ParticipantId::new());
        assert_eq!(
            first,
            Outcome::Accumulating {
                resting: 1,
                required: 2
            }
        );
        assert_eq!(t.host().transitions.get(), 0);

        let second = t.on_join_rest(ParticipantId::new());
        assert_eq!(
            second,
            Outcome::Transitioned {
                resting: 2,
                population: 4,
                required: 2
            }
        );
        assert_eq!(t.resting(), 0);
        assert_eq!(t.host().transitions.get(), 1);
        assert_eq!(t.snapshot().transitions, 1);
        assert!(t.snapshot().last_transition_at.is_some());
    }

    #[test]
    fn single_participant_transitions_immediately() {
        let mut t = tracker(1, 0.5);
        let outcome = t.on_join_rest(ParticipantId::new());
        assert!(outcome.is_transition());
        assert_eq!(t.resting(), 0);
    }

    #[test]
    fn empty_population_never_transitions() {
        let mut t = tracker(0, 0.5);
        for _ in 0..5 {
            let outcome = t.on_join_rest(ParticipantId::new());
            assert_eq!(
                outcome,
                Outcome::Accumulating {
                    resting: t.resting(),
                    required: 1
                }
            );
        }
        assert_eq!(t.resting(), 5);
        assert_eq!(t.host().transitions.get(), 0);
    }

    #[test]
    fn leave_clamps_at_zero() {
        let mut t = tracker(4, 0.5);
        let outcome = t.on_leave_rest(ParticipantId::new());
        assert_eq!(
            outcome,
            Outcome::Accumulating {
                resting: 0,
                required: 2
            }
        );
        let _ = t.on_leave_rest(ParticipantId::new());
        assert_eq!(t.resting(), 0);
    }

    #[test]
    fn leave_never_transitions() {
        let mut t = tracker(4, 0.5);
        let _ = t.on_join_rest(ParticipantId::new());
        // The quorum is now reachable at one out of two, but leaving only reports.
        t.host().population.set(1);
        let outcome = t.on_leave_rest(ParticipantId::new());
        assert!(!outcome.is_transition());
        assert_eq!(t.host().transitions.get(), 0);
    }

    #[test]
    fn leave_broadcasts_status() {
        let mut t = tracker(4, 0.5);
        let _ = t.on_join_rest(ParticipantId::new());
        let _ = t.on_leave_rest(ParticipantId::new());
        let notices = t.host().notices.borrow();
        let last = notices.last().unwrap();
        assert_eq!(last.to_string(), "p leaves their bed (0/2)");
    }

    #[test]
    fn departure_of_resting_participant_rechecks() {
        let mut t = tracker(3, 0.5);
        let _ = t.on_join_rest(ParticipantId::new());
        let _ = t.on_join_rest(ParticipantId::new());
        assert_eq!(t.resting(), 2);
        assert_eq!(t.host().transitions.get(), 0);

        // Host removes the participant before signalling.
        t.host().population.set(2);
        let outcome = t.on_participant_departed(ParticipantId::new(), true);
        assert_eq!(
            outcome,
            Outcome::Transitioned {
                resting: 1,
                population: 2,
                required: 1
            }
        );
        assert_eq!(t.resting(), 0);
    }

    #[test]
    fn departure_of_awake_participant_is_ignored() {
        let mut t = tracker(3, 0.5);
        let _ = t.on_join_rest(ParticipantId::new());
        let before = t.host().notices.borrow().len();
        t.host().population.set(2);
        let outcome = t.on_participant_departed(ParticipantId::new(), false);
        assert_eq!(outcome, Outcome::Ignored);
        assert_eq!(t.resting(), 1);
        assert_eq!(t.host().notices.borrow().len(), before);
    }

    #[test]
    fn departure_clamps_at_zero() {
        let mut t = tracker(3, 0.5);
        let outcome = t.on_participant_departed(ParticipantId::new(), true);
        assert!(!outcome.is_transition());
        assert_eq!(t.resting(), 0);
    }

    #[test]
    fn manual_trigger_counts_like_join() {
        let mut t = tracker(2, 0.5);
        let outcome = t.on_manual_trigger(ParticipantId::new());
        assert!(outcome.is_transition());
        let notices = t.host().notices.borrow();
        assert_eq!(notices.as_slice(), &[Notice::Morning]);
    }

    #[test]
    fn double_join_counts_twice() {
        let mut t = tracker(5, 0.5);
        let p = ParticipantId::new();
        let _ = t.on_join_rest(p);
        let _ = t.on_join_rest(p);
        assert_eq!(t.resting(), 2);
    }

    #[test]
    fn overcount_resets_to_zero() {
        let mut t = tracker(4, 0.5);
        let _ = t.on_manual_trigger(ParticipantId::new());
        t.host().population.set(0);
        let _ = t.on_join_rest(ParticipantId::new());
        let _ = t.on_join_rest(ParticipantId::new());
        assert_eq!(t.resting(), 3);

        t.host().population.set(2);
        let outcome = t.on_join_rest(ParticipantId::new());
        assert_eq!(
            outcome,
            Outcome::Transitioned {
                resting: 4,
                population: 2,
                required: 1
            }
        );
        assert_eq!(t.resting(), 0);
    }

    #[test]
    fn transition_fires_once_per_cycle() {
        let mut t = tracker(2, 0.5);
        assert!(t.on_join_rest(ParticipantId::new()).is_transition());
        t.host().population.set(4);
        assert!(!t.on_join_rest(ParticipantId::new()).is_transition());
        assert!(t.on_join_rest(ParticipantId::new()).is_transition());
        assert_eq!(t.host().transitions.get(), 2);
    }

    #[test]
    fn transition_broadcasts_morning_only() {
        let mut t = tracker(4, 0.5);
        let _ = t.on_join_rest(ParticipantId::new());
        let _ = t.on_join_rest(ParticipantId::new());
        let notices = t.host().notices.borrow();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices.first().unwrap().to_string(), "p is sleeping (1/2)");
        assert_eq!(notices.last(), Some(&Notice::Morning));
    }

    #[test]
    fn counter_never_negative_under_mixed_sequences() {
        let mut t = tracker(10, 1.0);
        let script = [true, false, false, true, true, false, false, false, true];
        for join in script {
            if join {
                let _ = t.on_join_rest(ParticipantId::new());
            } else {
                let _ = t.on_leave_rest(ParticipantId::new());
            }
        }
        assert_eq!(t.resting(), 1);
    }

    #[test]
    fn reconfigure_rejects_out_of_range() {
        let mut t = tracker(4, 0.5);
        let err = t.reconfigure_threshold(1.2);
        assert_eq!(err, Err(QuorumError::InvalidThreshold { value: 1.2 }));
        assert_eq!(t.threshold().value(), 0.5);
    }

    #[test]
    fn reconfigure_applies_to_next_evaluation_only() {
        let mut t = tracker(4, 1.0);
        let _ = t.on_join_rest(ParticipantId::new());
        let _ = t.on_join_rest(ParticipantId::new());
        assert_eq!(t.resting(), 2);

        let previous = t.reconfigure_threshold(0.5).unwrap();
        assert_eq!(previous.value(), 1.0);
        // Lowering the bar does not fire by itself.
        assert_eq!(t.host().transitions.get(), 0);
        assert_eq!(t.resting(), 2);

        assert!(t.on_join_rest(ParticipantId::new()).is_transition());
    }

    #[test]
    fn zero_threshold_still_needs_an_event() {
        let mut t = tracker(3, 0.0);
        assert_eq!(t.host().transitions.get(), 0);
        assert!(t.on_join_rest(ParticipantId::new()).is_transition());
    }
}
