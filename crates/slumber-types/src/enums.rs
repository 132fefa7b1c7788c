//! Enumeration types shared between the quorum core and its hosts.

use serde::{Deserialize, Serialize};

/// Coarse phase of a world's day clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    /// Daylight: leaving a bed does not count as leaving rest.
    Day,
    /// Night: participants may rest and leaving a bed is counted.
    Night,
}

/// Weather condition of a world.
///
/// Derived from the two independent flags a host tracks (storm and
/// thunder). A thunderstorm implies a storm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    /// No adverse weather.
    Clear,
    /// Rain or snow without thunder.
    Storm,
    /// Storm with thunder.
    Thunderstorm,
}

impl Weather {
    /// Build the condition from a host's storm and thunder flags.
    pub const fn from_flags(storm: bool, thundering: bool) -> Self {
        match (storm, thundering) {
            (_, true) => Self::Thunderstorm,
            (true, false) => Self::Storm,
            (false, false) => Self::Clear,
        }
    }

    /// Whether this condition is cleared by a fast-forward.
    pub const fn is_adverse(self) -> bool {
        !matches!(self, Self::Clear)
    }
}

/// Why a participant's resting status changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestCause {
    /// The participant lay down (implicit state change).
    Joined,
    /// The participant asked to be counted explicitly.
    Requested,
    /// The participant got up before morning.
    Left,
    /// The participant disconnected while resting.
    Departed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weather_from_flags() {
        assert_eq!(Weather::from_flags(false, false), Weather::Clear);
        assert_eq!(Weather::from_flags(true, false), Weather::Storm);
        assert_eq!(Weather::from_flags(true, true), Weather::Thunderstorm);
        assert_eq!(Weather::from_flags(false, true), Weather::Thunderstorm);
    }

    #[test]
    fn only_clear_is_not_adverse() {
        assert!(!Weather::Clear.is_adverse());
        assert!(Weather::Storm.is_adverse());
        assert!(Weather::Thunderstorm.is_adverse());
    }
}
