//! Reference host world for the Slumber rest quorum.
//!
//! This crate models the parts of a game world the quorum core talks to:
//! a day clock, storm and thunder flags, live membership, and a chat
//! channel. [`WorldState`] implements [`slumber_core::WorldHost`], so a
//! world can be handed directly to its tracker.
//!
//! # Modules
//!
//! - [`clock`] -- [`DayClock`] with night detection and the fast-forward.
//! - [`world`] -- [`WorldState`], chat [`Announcement`]s, and membership.
//! - [`error`] -- Error types for membership operations.
//!
//! [`DayClock`]: clock::DayClock
//! [`WorldState`]: world::WorldState
//! [`Announcement`]: world::Announcement

pub mod clock;
pub mod error;
pub mod world;

// Re-export primary types at crate root.
pub use clock::{DAY_LENGTH, DAYBREAK, DayClock, NIGHTFALL};
pub use error::WorldError;
pub use world::{Announcement, Audience, CHAT_CAPACITY, WorldState, chat_channel};
