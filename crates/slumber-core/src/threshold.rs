//! Quorum threshold arithmetic.
//!
//! A [`Threshold`] is the fraction of a world's population that must be
//! resting at the same time for the fast-forward to fire. The required
//! head count is derived from the live population on every evaluation and
//! is never stored, because membership changes between events.

use serde::{Deserialize, Serialize};

/// Fraction used when no valid value has been configured.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Errors raised at the configuration boundary of the quorum core.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum QuorumError {
    /// The supplied fraction is not a number in `[0, 1]`.
    #[error("threshold {value} is outside [0, 1]")]
    InvalidThreshold {
        /// The rejected value.
        value: f64,
    },
}

/// Validated quorum fraction in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Threshold(f64);

impl Threshold {
    /// Create a threshold, rejecting NaN and anything outside `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`QuorumError::InvalidThreshold`] for out-of-range input.
    pub fn new(value: f64) -> Result<Self, QuorumError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(QuorumError::InvalidThreshold { value })
        }
    }

    /// Return the raw fraction.
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Head count needed for a population of the given size.
    ///
    /// This is `max(1, ceil(threshold * population))`, settled against
    /// [`Self::is_reached`] so the announced count is exactly the one that
    /// fires even when the float product rounds past an integer. An empty
    /// population still requires one, which can never be met.
    pub fn required_count(self, population: u32) -> u32 {
        if population == 0 {
            return 1;
        }
        let raw = (self.0 * f64::from(population)).ceil();
        // raw lies in [0, population] because the fraction is in [0, 1].
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mut required = (raw as u32).clamp(1, population);
        while required > 1 && self.is_reached(required.saturating_sub(1), population) {
            required = required.saturating_sub(1);
        }
        while required < population && !self.is_reached(required, population) {
            required = required.saturating_add(1);
        }
        required
    }

    /// Whether `resting / population >= threshold` with a non-empty population.
    pub fn is_reached(self, resting: u32, population: u32) -> bool {
        if population == 0 {
            return false;
        }
        f64::from(resting) / f64::from(population) >= self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLD)
    }
}

impl TryFrom<f64> for Threshold {
    type Error = QuorumError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Threshold> for f64 {
    fn from(threshold: Threshold) -> Self {
        threshold.0
    }
}

impl core::fmt::Display for Threshold {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
