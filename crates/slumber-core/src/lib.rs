//! Rest quorum state machine for the Slumber workspace.
//!
//! Within one world, this crate counts how many participants are resting.
//! When that count reaches a configured fraction of the live population the
//! world is fast-forwarded once and the count resets.
//!
//! # Modules
//!
//! - [`threshold`] -- [`Threshold`] validation and required-count arithmetic.
//! - [`tracker`] -- [`QuorumTracker`], the per-world state machine.
//! - [`host`] -- [`WorldHost`], the services a world provides to its tracker.
//! - [`notice`] -- Broadcast payloads emitted by the tracker.
//! - [`actor`] -- Tokio task wrapper that serializes events per world.
//! - [`registry`] -- One tracker actor per world, with shared reconfiguration.
//! - [`config`] -- Loading `slumber-config.yaml` into typed structs.
//!
//! [`Threshold`]: threshold::Threshold
//! [`QuorumTracker`]: tracker::QuorumTracker
//! [`WorldHost`]: host::WorldHost

pub mod actor;
pub mod config;
pub mod host;
pub mod notice;
pub mod registry;
pub mod threshold;
pub mod tracker;

pub use actor::{TrackerError, TrackerHandle, spawn_tracker};
pub use host::WorldHost;
pub use notice::Notice;
pub use registry::QuorumRegistry;
pub use threshold::{QuorumError, Threshold};
pub use tracker::{Outcome, QuorumTracker, TrackerSnapshot};
