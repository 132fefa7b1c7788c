//! Live state of one hosted world.
//!
//! [`WorldState`] is shared between the engine's event loop and the world's
//! quorum tracker actor, so all mutable fields use atomics or a short-lived
//! [`std::sync::Mutex`]. No lock is ever held across an `.await`, which keeps
//! [`WorldHost::population_size`] a cheap synchronous read.
//!
//! Chat is fanned out over a [`tokio::sync::broadcast`] channel shared by all
//! worlds of a server. Sending with no subscriber is not an error: delivery
//! is fire-and-forget.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use slumber_core::{Notice, WorldHost};
use slumber_types::{ParticipantId, TimeOfDay, Weather, WorldId};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::clock::DayClock;
use crate::error::WorldError;

/// Capacity of the chat channel.
///
/// A subscriber that falls behind by more than this many announcements
/// receives [`broadcast::error::RecvError::Lagged`] and skips ahead.
pub const CHAT_CAPACITY: usize = 256;

/// Who an announcement is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "to", content = "participant", rename_all = "snake_case")]
pub enum Audience {
    /// Everyone in the world.
    World,
    /// A single participant.
    Participant(ParticipantId),
}

/// A chat line emitted by a world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Announcement {
    /// The world that emitted the line.
    pub world: WorldId,
    /// Display name of that world.
    pub world_name: String,
    /// Recipients.
    pub audience: Audience,
    /// Rendered text.
    pub text: String,
}

/// Create the chat channel shared by the worlds of one server.
pub fn chat_channel() -> broadcast::Sender<Announcement> {
    let (tx, _) = broadcast::channel(CHAT_CAPACITY);
    tx
}

/// Online participants plus every name ever seen, so notices about a
/// participant who just disconnected still carry a readable name.
#[derive(Debug, Default)]
struct Roster {
    online: BTreeSet<ParticipantId>,
    names: BTreeMap<ParticipantId, String>,
}

/// Mutable state of a single world.
#[derive(Debug)]
pub struct WorldState {
    id: WorldId,
    name: String,
    clock: Mutex<DayClock>,
    storm: AtomicBool,
    thundering: AtomicBool,
    roster: Mutex<Roster>,
    chat: broadcast::Sender<Announcement>,
}

impl WorldState {
    /// Create an empty world at dawn with clear weather.
    pub fn new(name: &str, chat: broadcast::Sender<Announcement>) -> Self {
        Self {
            id: WorldId::new(),
            name: name.to_owned(),
            clock: Mutex::new(DayClock::default()),
            storm: AtomicBool::new(false),
            thundering: AtomicBool::new(false),
            roster: Mutex::new(Roster::default()),
            chat,
        }
    }

    /// The world's identifier.
    pub const fn id(&self) -> WorldId {
        self.id
    }

    /// The world's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Add a participant to the world.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::AlreadyPresent`] if the participant is online.
    pub fn admit(&self, participant: ParticipantId, name: &str) -> Result<(), WorldError> {
        let mut roster = self.roster();
        if !roster.online.insert(participant) {
            return Err(WorldError::AlreadyPresent {
                world: self.id,
                participant,
            });
        }
        roster.names.insert(participant, name.to_owned());
        debug!(world = %self.name, %participant, display_name = name, online = roster.online.len(), "participant joined");
        Ok(())
    }

    /// Remove a participant from the world. The name stays known.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NotPresent`] if the participant is not online.
    pub fn remove(&self, participant: ParticipantId) -> Result<(), WorldError> {
        let mut roster = self.roster();
        if !roster.online.remove(&participant) {
            return Err(WorldError::NotPresent {
                world: self.id,
                participant,
            });
        }
        debug!(world = %self.name, %participant, online = roster.online.len(), "participant left");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Clock and weather
    // -----------------------------------------------------------------------

    /// Current clock value.
    pub fn clock(&self) -> DayClock {
        *self.lock_clock()
    }

    /// Advance the clock by `ticks`.
    pub fn advance_clock(&self, ticks: u64) -> DayClock {
        let mut clock = self.lock_clock();
        clock.advance(ticks);
        *clock
    }

    /// Whether it is currently night in this world.
    pub fn is_night(&self) -> bool {
        self.clock().is_night()
    }

    /// Current day phase.
    pub fn time_of_day(&self) -> TimeOfDay {
        self.clock().time_of_day()
    }

    /// Set the storm and thunder flags.
    pub fn set_weather(&self, storm: bool, thundering: bool) {
        self.storm.store(storm, Ordering::Release);
        self.thundering.store(thundering, Ordering::Release);
    }

    /// Current weather condition.
    pub fn weather(&self) -> Weather {
        Weather::from_flags(
            self.storm.load(Ordering::Acquire),
            self.thundering.load(Ordering::Acquire),
        )
    }

    // -----------------------------------------------------------------------
    // Chat
    // -----------------------------------------------------------------------

    /// Send a line to everyone in the world.
    pub fn announce(&self, text: String) {
        self.send(Audience::World, text);
    }

    /// Send a line to a single participant.
    pub fn tell(&self, participant: ParticipantId, text: String) {
        self.send(Audience::Participant(participant), text);
    }

    fn send(&self, audience: Audience, text: String) {
        // send fails only when nobody is subscribed, which is not an error.
        let _ = self.chat.send(Announcement {
            world: self.id,
            world_name: self.name.clone(),
            audience,
            text,
        });
    }

    fn roster(&self) -> MutexGuard<'_, Roster> {
        self.roster.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_clock(&self) -> MutexGuard<'_, DayClock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WorldHost for WorldState {
    fn population_size(&self) -> u32 {
        u32::try_from(self.roster().online.len()).unwrap_or(u32::MAX)
    }

    fn broadcast(&self, notice: &Notice) {
        self.announce(notice.to_string());
    }

    fn apply_transition(&self) {
        let clock = {
            let mut clock = self.lock_clock();
            clock.fast_forward();
            *clock
        };
        let weather = self.weather();
        self.set_weather(false, false);
        info!(
            world = %self.name,
            day = clock.day(),
            time = clock.time(),
            weather_cleared = weather.is_adverse(),
            "night skipped"
        );
    }

    fn display_name(&self, participant: ParticipantId) -> String {
        self.roster()
            .names
            .get(&participant)
            .cloned()
            .unwrap_or_else(|| participant.to_string())
    }
}
