//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure an inbound host event can produce.
//! The event loop logs it and moves on to the next event.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: slumber_core::config::ConfigError,
    },

    /// A tracker request failed.
    #[error("tracker error: {source}")]
    Tracker {
        /// The underlying tracker error.
        #[from]
        source: slumber_core::TrackerError,
    },

    /// A membership change was inconsistent with the world state.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: slumber_world::WorldError,
    },

    /// The event names a world this server does not host.
    #[error("unknown world: {name}")]
    UnknownWorld {
        /// The requested world name.
        name: String,
    },

    /// The event names a player who is not online.
    #[error("player {name} is not online")]
    UnknownPlayer {
        /// The player name.
        name: String,
    },

    /// A join was received for a player who is already online.
    #[error("player {name} is already online")]
    AlreadyOnline {
        /// The player name.
        name: String,
    },

    /// The command is not one this engine understands.
    #[error("unknown command: {name}")]
    UnknownCommand {
        /// The command name as received.
        name: String,
    },
}
