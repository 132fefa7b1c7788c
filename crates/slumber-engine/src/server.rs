//! The host side of the rest quorum.
//!
//! [`Server`] owns the worlds, the online player sessions, and the
//! [`QuorumRegistry`]. It turns raw [`HostEvent`]s into tracker signals:
//! it resolves player names to participants, applies the permission gate,
//! ignores bed exits during the day, and wakes every sleeper in a world once
//! its night has been skipped.
//!
//! Player-facing replies go out on the world chat channel. Console replies
//! go to the log.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use slumber_core::config::SlumberConfig;
use slumber_core::{Outcome, QuorumRegistry, TrackerError, TrackerHandle, TrackerSnapshot};
use slumber_types::ParticipantId;
use slumber_world::{Announcement, WorldState, chat_channel};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::events::{Command, HostEvent, SET_PERCENTAGE_USAGE};

/// Told to a player who lacks the rest permission.
pub const NO_PERMISSION: &str = "You haven't the permission to use GoodSleep!";

/// Reply to a successful reload.
pub const RELOADED: &str = "Plugin reloaded !";

/// Reply to a failed reload.
pub const RELOAD_FAILED: &str = "Error ! Plugin not reloaded !";

/// Told to the console when it tries to rest.
pub const PLAYERS_ONLY: &str = "Only players can use /sleep";

/// One online player.
#[derive(Debug, Clone)]
struct Session {
    id: ParticipantId,
    world: String,
    /// Lying in a bed, counted or not.
    in_bed: bool,
    /// Counted as resting by the world's tracker.
    counted: bool,
}

/// Worlds, sessions, and trackers of one game server.
#[derive(Debug)]
pub struct Server {
    config_path: PathBuf,
    config: SlumberConfig,
    chat: broadcast::Sender<Announcement>,
    worlds: BTreeMap<String, Arc<WorldState>>,
    sessions: BTreeMap<String, Session>,
    registry: QuorumRegistry,
}

impl Server {
    /// Build a server hosting every world named in `config`, each with its
    /// tracker already running.
    ///
    /// `config_path` is where `reload` reads from and where a changed
    /// percentage is saved. Must be called from within a tokio runtime.
    pub fn new(config: SlumberConfig, config_path: PathBuf) -> Self {
        let registry = QuorumRegistry::new(config.quorum.threshold_or_default());
        let mut server = Self {
            config_path,
            config,
            chat: chat_channel(),
            worlds: BTreeMap::new(),
            sessions: BTreeMap::new(),
            registry,
        };
        let names = server.config.worlds.clone();
        for name in &names {
            server.host_world(name);
        }
        server
    }

    /// Subscribe to every chat line emitted by any world.
    pub fn subscribe_chat(&self) -> broadcast::Receiver<Announcement> {
        self.chat.subscribe()
    }

    /// The world called `name`, if hosted.
    pub fn world(&self, name: &str) -> Option<&Arc<WorldState>> {
        self.worlds.get(name)
    }

    /// The configuration currently in effect.
    pub const fn config(&self) -> &SlumberConfig {
        &self.config
    }

    /// Names of online players, in order.
    pub fn online(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }

    /// Snapshot every world's tracker, keyed by world name.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Tracker`] if a tracker actor has stopped.
    pub async fn status(&self) -> Result<Vec<(String, TrackerSnapshot)>, EngineError> {
        let mut status = Vec::with_capacity(self.registry.len());
        for (_, handle) in self.registry.iter() {
            let world = handle.world();
            let Some(hosted) = self.worlds.values().find(|hosted| hosted.id() == world) else {
                continue;
            };
            status.push((hosted.name().to_owned(), handle.snapshot().await?));
        }
        Ok(status)
    }

    /// Process one host event.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when the event is inconsistent with the
    /// server's state (unknown player or world, duplicate join, unknown
    /// command) or a tracker has stopped.
    pub async fn handle(&mut self, event: HostEvent) -> Result<(), EngineError> {
        match event {
            HostEvent::Join { player, world } => self.join(player, &world),
            HostEvent::Quit { player } => self.quit(&player).await,
            HostEvent::BedEnter { player } => self.bed_enter(&player).await,
            HostEvent::BedLeave { player } => self.bed_leave(&player).await,
            HostEvent::Time { world, ticks } => {
                let clock = self.hosted(&world)?.advance_clock(ticks);
                debug!(%world, day = clock.day(), time = clock.time(), "clock advanced");
                Ok(())
            }
            HostEvent::Weather {
                world,
                storm,
                thundering,
            } => {
                let hosted = self.hosted(&world)?;
                hosted.set_weather(storm, thundering);
                debug!(%world, weather = ?hosted.weather(), "weather changed");
                Ok(())
            }
            HostEvent::Command { player, name, args } => {
                let command = Command::parse(&name, &args)?;
                self.command(player.as_deref(), command).await
            }
        }
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    fn join(&mut self, player: String, world_name: &str) -> Result<(), EngineError> {
        if self.sessions.contains_key(&player) {
            return Err(EngineError::AlreadyOnline { name: player });
        }
        let world = Arc::clone(self.hosted(world_name)?);
        let id = ParticipantId::new();
        world.admit(id, &player)?;
        info!(%player, world = world_name, participant = %id, "player joined");
        self.sessions.insert(
            player,
            Session {
                id,
                world: world_name.to_owned(),
                in_bed: false,
                counted: false,
            },
        );
        Ok(())
    }

    async fn quit(&mut self, player: &str) -> Result<(), EngineError> {
        let session = self.session(player)?.clone();
        let world = Arc::clone(self.hosted(&session.world)?);
        world.remove(session.id)?;
        self.sessions.remove(player);
        info!(%player, world = %session.world, was_resting = session.counted, "player quit");

        // Only a counted session can move the quorum, even if its permission
        // was revoked since it lay down.
        if !session.counted {
            return Ok(());
        }
        let outcome = self
            .tracker(&world)
            .participant_departed(session.id, true)
            .await?;
        self.settle(&session.world, &outcome);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Beds
    // -----------------------------------------------------------------------

    async fn bed_enter(&mut self, player: &str) -> Result<(), EngineError> {
        let (id, world_name) = self.mark_in_bed(player, true)?;
        let world = Arc::clone(self.hosted(&world_name)?);
        if !self.config.permissions.allows(player) {
            world.tell(id, NO_PERMISSION.to_owned());
            return Ok(());
        }
        if let Some(session) = self.sessions.get_mut(player) {
            session.counted = true;
        }
        let outcome = self.tracker(&world).join_rest(id).await?;
        self.settle(&world_name, &outcome);
        Ok(())
    }

    async fn bed_leave(&mut self, player: &str) -> Result<(), EngineError> {
        let session = self.session(player)?.clone();
        if !session.in_bed {
            debug!(%player, "bed exit without bed entry ignored");
            return Ok(());
        }
        self.mark_in_bed(player, false)?;
        let world = Arc::clone(self.hosted(&session.world)?);
        // The gate guards new rests only; a counted session always releases.
        if !session.counted {
            if !self.config.permissions.allows(player) {
                world.tell(session.id, NO_PERMISSION.to_owned());
            }
            return Ok(());
        }
        if let Some(current) = self.sessions.get_mut(player) {
            current.counted = false;
        }
        // Waking up at dawn is not leaving the rest.
        if !world.is_night() {
            debug!(
                %player,
                time = world.clock().time(),
                phase = ?world.time_of_day(),
                "daytime bed exit not counted"
            );
            return Ok(());
        }
        let _ = self.tracker(&world).leave_rest(session.id).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    async fn command(&mut self, player: Option<&str>, command: Command) -> Result<(), EngineError> {
        match command {
            Command::Sleep => {
                let Some(player) = player else {
                    self.reply(None, PLAYERS_ONLY);
                    return Ok(());
                };
                let session = self.session(player)?.clone();
                let world = Arc::clone(self.hosted(&session.world)?);
                if !self.config.permissions.allows(player) {
                    world.tell(session.id, NO_PERMISSION.to_owned());
                    return Ok(());
                }
                let outcome = self.tracker(&world).manual_trigger(session.id).await?;
                self.settle(&session.world, &outcome);
                Ok(())
            }
            Command::Reload => self.reload(player).await,
            Command::SetSleepPercentage(None) => {
                self.reply(player, SET_PERCENTAGE_USAGE);
                Ok(())
            }
            Command::SetSleepPercentage(Some(value)) => {
                self.set_sleep_percentage(player, value).await
            }
        }
    }

    async fn reload(&mut self, player: Option<&str>) -> Result<(), EngineError> {
        let config = match SlumberConfig::from_file(&self.config_path) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %self.config_path.display(), error = %err, "reload failed");
                self.reply(player, RELOAD_FAILED);
                return Ok(());
            }
        };
        let sleep_percentage = config.quorum.sleep_percentage;
        match self.registry.reconfigure_all(sleep_percentage).await {
            Ok(previous) => {
                self.config = config;
                let names = self.config.worlds.clone();
                for name in &names {
                    self.host_world(name);
                }
                info!(previous = %previous, sleep_percentage, "configuration reloaded");
                self.reply(player, RELOADED);
                Ok(())
            }
            Err(TrackerError::Quorum(err)) => {
                warn!(error = %err, "reload rejected, keeping current configuration");
                self.reply(player, RELOAD_FAILED);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn set_sleep_percentage(
        &mut self,
        player: Option<&str>,
        value: f64,
    ) -> Result<(), EngineError> {
        match self.registry.reconfigure_all(value).await {
            Ok(previous) => {
                self.config.quorum.sleep_percentage = value;
                if let Err(err) = self.config.save(&self.config_path) {
                    warn!(path = %self.config_path.display(), error = %err, "failed to save configuration");
                }
                info!(previous = %previous, sleep_percentage = value, "sleep percentage changed");
                self.reply(player, &format!("Sleep percentage changed to {value}"));
                Ok(())
            }
            Err(TrackerError::Quorum(_)) => {
                self.reply(player, SET_PERCENTAGE_USAGE);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn host_world(&mut self, name: &str) {
        if self.worlds.contains_key(name) {
            return;
        }
        let world = Arc::new(WorldState::new(name, self.chat.clone()));
        let _ = self.tracker(&world);
        info!(world = name, id = %world.id(), "world hosted");
        self.worlds.insert(name.to_owned(), world);
    }

    fn tracker(&mut self, world: &Arc<WorldState>) -> TrackerHandle {
        let host = Arc::clone(world);
        self.registry.tracker_for(world.id(), move || host)
    }

    fn hosted(&self, name: &str) -> Result<&Arc<WorldState>, EngineError> {
        self.worlds.get(name).ok_or_else(|| EngineError::UnknownWorld {
            name: name.to_owned(),
        })
    }

    fn session(&self, player: &str) -> Result<&Session, EngineError> {
        self.sessions
            .get(player)
            .ok_or_else(|| EngineError::UnknownPlayer {
                name: player.to_owned(),
            })
    }

    fn mark_in_bed(
        &mut self,
        player: &str,
        in_bed: bool,
    ) -> Result<(ParticipantId, String), EngineError> {
        let session = self
            .sessions
            .get_mut(player)
            .ok_or_else(|| EngineError::UnknownPlayer {
                name: player.to_owned(),
            })?;
        session.in_bed = in_bed;
        Ok((session.id, session.world.clone()))
    }

    /// After a transition everyone in the world is awake again.
    fn settle(&mut self, world: &str, outcome: &Outcome) {
        if !outcome.is_transition() {
            return;
        }
        let mut woken = 0_u32;
        for session in self.sessions.values_mut().filter(|s| s.world == world) {
            if session.in_bed || session.counted {
                woken = woken.saturating_add(1);
            }
            session.in_bed = false;
            session.counted = false;
        }
        debug!(%world, woken, "sleepers woken");
    }

    fn reply(&self, player: Option<&str>, text: &str) {
        player
            .and_then(|name| self.sessions.get(name))
            .and_then(|session| Some((session.id, self.worlds.get(&session.world)?)))
            .map_or_else(
                || info!(target: "slumber::console", "{text}"),
                |(id, world)| world.tell(id, text.to_owned()),
            );
    }
}
