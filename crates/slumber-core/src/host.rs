//! The host boundary of the quorum core.
//!
//! The tracker never touches clocks, weather, or connections directly. It
//! reads the live population and emits side effects through [`WorldHost`],
//! which the owning server implements once per world.

use std::sync::Arc;

use slumber_types::ParticipantId;

use crate::notice::Notice;

/// Services a world provides to its quorum tracker.
///
/// Every method must be fast, synchronous, and non-blocking: the tracker
/// calls them while processing an event to completion. Delivery is
/// fire-and-forget; retry policy belongs to the host.
pub trait WorldHost {
    /// Number of participants currently active in the world.
    ///
    /// Read at every evaluation, never cached by the tracker.
    fn population_size(&self) -> u32;

    /// Deliver a notice to everyone in the world.
    fn broadcast(&self, notice: &Notice);

    /// Perform the collective fast-forward (advance the clock to daybreak,
    /// clear adverse weather).
    fn apply_transition(&self);

    /// Human-readable name for a participant, used in notices.
    fn display_name(&self, participant: ParticipantId) -> String {
        participant.to_string()
    }
}

impl<H: WorldHost + ?Sized> WorldHost for Arc<H> {
    fn population_size(&self) -> u32 {
        (**self).population_size()
    }

    fn broadcast(&self, notice: &Notice) {
        (**self).broadcast(notice);
    }

    fn apply_transition(&self) {
        (**self).apply_transition();
    }

    fn display_name(&self, participant: ParticipantId) -> String {
        (**self).display_name(participant)
    }
}
