//! Day clock for a hosted world.
//!
//! Time is measured in ticks within a day of [`DAY_LENGTH`] ticks, plus a
//! count of completed days. The day phase is derived from the time of day,
//! never stored independently.
//!
//! | Ticks | Phase |
//! |---|---|
//! | `0 .. NIGHTFALL` | Day |
//! | `NIGHTFALL .. DAY_LENGTH` | Night |
//!
//! The fast-forward moves the clock to [`DAYBREAK`] of the following day.

use slumber_types::TimeOfDay;

/// Ticks in one full day.
pub const DAY_LENGTH: u64 = 24_000;

/// First tick of the night. Leaving a bed before this is a normal wake-up.
pub const NIGHTFALL: u64 = 13_000;

/// Time of day the fast-forward sets.
pub const DAYBREAK: u64 = 10;

/// Day clock tracking the time of day and elapsed days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DayClock {
    /// Ticks since the start of the current day, always `< DAY_LENGTH`.
    time: u64,

    /// Completed days.
    day: u64,
}

impl DayClock {
    /// Create a clock at the given time of day on day 0.
    ///
    /// Values past the end of the day wrap into following days.
    pub const fn at(time: u64) -> Self {
        let mut clock = Self { time: 0, day: 0 };
        clock.advance(time);
        clock
    }

    /// Advance the clock by `ticks`, rolling over into following days.
    pub const fn advance(&mut self, ticks: u64) {
        let carried = self.time.saturating_add(ticks);
        self.day = self.day.saturating_add(carried / DAY_LENGTH);
        self.time = carried % DAY_LENGTH;
    }

    /// Jump to [`DAYBREAK`], moving to the next day unless it is still
    /// before daybreak today.
    pub const fn fast_forward(&mut self) {
        if self.time >= DAYBREAK {
            self.day = self.day.saturating_add(1);
        }
        self.time = DAYBREAK;
    }

    /// Ticks since the start of the current day.
    pub const fn time(&self) -> u64 {
        self.time
    }

    /// Completed days.
    pub const fn day(&self) -> u64 {
        self.day
    }

    /// Whether it is currently night.
    pub const fn is_night(&self) -> bool {
        self.time >= NIGHTFALL
    }

    /// Current day phase.
    pub const fn time_of_day(&self) -> TimeOfDay {
        if self.is_night() {
            TimeOfDay::Night
        } else {
            TimeOfDay::Day
        }
    }
}
