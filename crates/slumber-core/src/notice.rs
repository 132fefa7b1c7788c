//! Broadcast payloads emitted by the quorum tracker.
//!
//! The tracker hands structured notices to its host; the host decides how
//! to render and deliver them. [`core::fmt::Display`] gives the plain-text
//! rendering used by the reference host.

use serde::Serialize;
use slumber_types::{ParticipantId, RestCause};

/// A message the tracker asks the host to deliver to the whole world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Progress report after a participant's resting status changed.
    Resting {
        /// The participant whose status changed.
        participant: ParticipantId,
        /// Host-resolved display name of the participant.
        name: String,
        /// What changed.
        cause: RestCause,
        /// Participants counted as resting after the change.
        resting: u32,
        /// Head count required at the moment of the change.
        required: u32,
    },

    /// The quorum was reached and the world was fast-forwarded.
    Morning,
}

impl core::fmt::Display for Notice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Resting {
                name,
                cause,
                resting,
                required,
                ..
            } => {
                let verb = match cause {
                    RestCause::Joined | RestCause::Requested => "is sleeping",
                    RestCause::Left => "leaves their bed",
                    RestCause::Departed => "leaves the game while sleeping",
                };
                write!(f, "{name} {verb} ({resting}/{required})")
            }
            Self::Morning => f.write_str("Good morning"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resting(cause: RestCause) -> Notice {
        Notice::Resting {
            participant: ParticipantId::new(),
            name: String::from("alice"),
            cause,
            resting: 1,
            required: 2,
        }
    }

    #[test]
    fn renders_progress() {
        assert_eq!(resting(RestCause::Joined).to_string(), "alice is sleeping (1/2)");
        assert_eq!(resting(RestCause::Requested).to_string(), "alice is sleeping (1/2)");
        assert_eq!(
            resting(RestCause::Left).to_string(),
            "alice leaves their bed (1/2)"
        );
        assert_eq!(
            resting(RestCause::Departed).to_string(),
            "alice leaves the game while sleeping (1/2)"
        );
    }

    #[test]
    fn renders_morning() {
        assert_eq!(Notice::Morning.to_string(), "Good morning");
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(resting(RestCause::Left)).ok();
        let kind = json
            .as_ref()
            .and_then(|v| v.get("kind"))
            .and_then(serde_json::Value::as_str);
        assert_eq!(kind, Some("resting"));
    }
}
