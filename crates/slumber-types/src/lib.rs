//! Shared type definitions for the Slumber rest quorum.
//!
//! This crate is the single source of truth for identifiers and small
//! enumerations used across the workspace.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for worlds and participants
//! - [`enums`] -- Time-of-day, weather, and rest-cause enumerations

pub mod enums;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use enums::{RestCause, TimeOfDay, Weather};
pub use ids::{ParticipantId, WorldId};
