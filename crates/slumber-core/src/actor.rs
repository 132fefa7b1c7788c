//! Per-world tracker actor.
//!
//! Every [`QuorumTracker`] runs inside its own tokio task that drains a
//! bounded queue of [`TrackerCommand`]s. One command is processed to
//! completion (read, modify, evaluate, reset) before the next is taken, so
//! two events for the same world can never interleave. Trackers for
//! different worlds are separate tasks with no shared state.
//!
//! [`TrackerHandle`] is the cloneable client side. Each request carries a
//! `oneshot` reply so callers can await the [`Outcome`].

use slumber_types::{ParticipantId, WorldId};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::host::WorldHost;
use crate::threshold::{QuorumError, Threshold};
use crate::tracker::{Outcome, QuorumTracker, TrackerSnapshot};

/// Depth of each tracker's command queue.
const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Errors returned by [`TrackerHandle`] requests.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum TrackerError {
    /// The actor task has stopped and can no longer accept commands.
    #[error("tracker for world {world} is closed")]
    Closed {
        /// The world whose tracker is gone.
        world: WorldId,
    },

    /// The request was rejected by the quorum core.
    #[error(transparent)]
    Quorum(#[from] QuorumError),
}

/// Requests processed by a tracker actor.
#[derive(Debug)]
pub enum TrackerCommand {
    /// A participant entered the resting state.
    JoinRest {
        /// The participant.
        participant: ParticipantId,
        /// Where to send the outcome.
        reply: oneshot::Sender<Outcome>,
    },

    /// A participant left the resting state.
    LeaveRest {
        /// The participant.
        participant: ParticipantId,
        /// Where to send the outcome.
        reply: oneshot::Sender<Outcome>,
    },

    /// A participant disconnected.
    Departed {
        /// The participant.
        participant: ParticipantId,
        /// Whether the participant was counted as resting.
        was_resting: bool,
        /// Where to send the outcome.
        reply: oneshot::Sender<Outcome>,
    },

    /// A participant explicitly asked to be counted.
    ManualTrigger {
        /// The participant.
        participant: ParticipantId,
        /// Where to send the outcome.
        reply: oneshot::Sender<Outcome>,
    },

    /// Replace the threshold. Replies with the previous value.
    SetThreshold {
        /// The validated new threshold.
        threshold: Threshold,
        /// Where to send the previous threshold.
        reply: oneshot::Sender<Threshold>,
    },

    /// Read the tracker state.
    Snapshot {
        /// Where to send the snapshot.
        reply: oneshot::Sender<TrackerSnapshot>,
    },
}

/// Cloneable client for a running tracker actor.
#[derive(Debug, Clone)]
pub struct TrackerHandle {
    world: WorldId,
    tx: mpsc::Sender<TrackerCommand>,
}

impl TrackerHandle {
    /// The world this handle's tracker belongs to.
    pub const fn world(&self) -> WorldId {
        self.world
    }

    /// Whether the actor task has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Signal that a participant entered the resting state.
    pub async fn join_rest(&self, participant: ParticipantId) -> Result<Outcome, TrackerError> {
        self.request(|reply| TrackerCommand::JoinRest { participant, reply })
            .await
    }

    /// Signal that a participant left the resting state.
    pub async fn leave_rest(&self, participant: ParticipantId) -> Result<Outcome, TrackerError> {
        self.request(|reply| TrackerCommand::LeaveRest { participant, reply })
            .await
    }

    /// Signal that a participant disconnected from the world.
    pub async fn participant_departed(
        &self,
        participant: ParticipantId,
        was_resting: bool,
    ) -> Result<Outcome, TrackerError> {
        self.request(|reply| TrackerCommand::Departed {
            participant,
            was_resting,
            reply,
        })
        .await
    }

    /// Signal an explicit request to be counted.
    pub async fn manual_trigger(&self, participant: ParticipantId) -> Result<Outcome, TrackerError> {
        self.request(|reply| TrackerCommand::ManualTrigger { participant, reply })
            .await
    }

    /// Validate and apply a new threshold. Returns the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Quorum`] without contacting the actor when
    /// `value` is outside `[0, 1]`.
    pub async fn reconfigure_threshold(&self, value: f64) -> Result<Threshold, TrackerError> {
        let threshold = Threshold::new(value)?;
        self.set_threshold(threshold).await
    }

    /// Apply an already validated threshold. Returns the previous one.
    pub async fn set_threshold(&self, threshold: Threshold) -> Result<Threshold, TrackerError> {
        self.request(|reply| TrackerCommand::SetThreshold { threshold, reply })
            .await
    }

    /// Read the tracker state.
    pub async fn snapshot(&self) -> Result<TrackerSnapshot, TrackerError> {
        self.request(|reply| TrackerCommand::Snapshot { reply }).await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> TrackerCommand,
    ) -> Result<T, TrackerError> {
        let closed = TrackerError::Closed { world: self.world };
        let (reply, rx) = oneshot::channel();
        self.tx.send(build(reply)).await.map_err(|_err| closed)?;
        rx.await.map_err(|_err| closed)
    }
}

/// Start an actor task owning `tracker` and return its handle.
///
/// The task ends once every handle has been dropped. Must be called from
/// within a tokio runtime.
pub fn spawn_tracker<H>(tracker: QuorumTracker<H>) -> TrackerHandle
where
    H: WorldHost + Send + 'static,
{
    let world = tracker.world();
    let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
    tokio::spawn(run_tracker(tracker, rx));
    debug!(%world, "tracker actor spawned");
    TrackerHandle { world, tx }
}

async fn run_tracker<H: WorldHost>(
    mut tracker: QuorumTracker<H>,
    mut rx: mpsc::Receiver<TrackerCommand>,
) {
    while let Some(command) = rx.recv().await {
        apply(&mut tracker, command);
    }
    debug!(world = %tracker.world(), "tracker actor stopped");
}

/// Process one command. A dropped reply receiver only means the caller
/// stopped waiting; the event has still been applied.
fn apply<H: WorldHost>(tracker: &mut QuorumTracker<H>, command: TrackerCommand) {
    match command {
        TrackerCommand::JoinRest { participant, reply } => {
            let _ = reply.send(tracker.on_join_rest(participant));
        }
        TrackerCommand::LeaveRest { participant, reply } => {
            let _ = reply.send(tracker.on_leave_rest(participant));
        }
        TrackerCommand::Departed {
            participant,
            was_resting,
            reply,
        } => {
            let _ = reply.send(tracker.on_participant_departed(participant, was_resting));
        }
        TrackerCommand::ManualTrigger { participant, reply } => {
            let _ = reply.send(tracker.on_manual_trigger(participant));
        }
        TrackerCommand::SetThreshold { threshold, reply } => {
            let _ = reply.send(tracker.set_threshold(threshold));
        }
        TrackerCommand::Snapshot { reply } => {
            let _ = reply.send(tracker.snapshot());
        }
    }
}
