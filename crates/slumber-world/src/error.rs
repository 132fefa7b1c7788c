//! Error types for the `slumber-world` crate.

use slumber_types::{ParticipantId, WorldId};

/// Errors that can occur while managing a world's membership.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// The participant is already present in the world.
    #[error("participant {participant} is already in world {world}")]
    AlreadyPresent {
        /// The world.
        world: WorldId,
        /// The participant.
        participant: ParticipantId,
    },

    /// The participant is not present in the world.
    #[error("participant {participant} is not in world {world}")]
    NotPresent {
        /// The world.
        world: WorldId,
        /// The participant.
        participant: ParticipantId,
    },
}
