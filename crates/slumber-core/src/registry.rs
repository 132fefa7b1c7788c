//! One tracker per world.
//!
//! The [`QuorumRegistry`] maps each [`WorldId`] to its own tracker actor,
//! spawning it the first time the world is observed. There is no shared
//! counter: accumulation in one world never affects another.
//!
//! The registry also owns the default threshold. A reconfiguration is
//! validated once, pushed to every live tracker, and used for trackers
//! spawned afterwards.

use std::collections::BTreeMap;

use slumber_types::WorldId;
use tracing::{info, warn};

use crate::actor::{TrackerError, TrackerHandle, spawn_tracker};
use crate::host::WorldHost;
use crate::threshold::Threshold;
use crate::tracker::QuorumTracker;

/// Directory of per-world tracker actors.
#[derive(Debug, Default)]
pub struct QuorumRegistry {
    default_threshold: Threshold,
    trackers: BTreeMap<WorldId, TrackerHandle>,
}

impl QuorumRegistry {
    /// Create an empty registry whose trackers start at `default_threshold`.
    pub const fn new(default_threshold: Threshold) -> Self {
        Self {
            default_threshold,
            trackers: BTreeMap::new(),
        }
    }

    /// Return the tracker for `world`, spawning it with the host produced by
    /// `host` if this is the first time the world is seen.
    ///
    /// Must be called from within a tokio runtime.
    pub fn tracker_for<H, F>(&mut self, world: WorldId, host: F) -> TrackerHandle
    where
        H: WorldHost + Send + 'static,
        F: FnOnce() -> H,
    {
        if let Some(handle) = self.trackers.get(&world).filter(|h| !h.is_closed()) {
            return handle.clone();
        }
        let handle = spawn_tracker(QuorumTracker::new(world, self.default_threshold, host()));
        info!(%world, threshold = %self.default_threshold, "quorum tracker created");
        self.trackers.insert(world, handle.clone());
        handle
    }

    /// Look up the tracker for `world` without creating it.
    pub fn get(&self, world: WorldId) -> Option<&TrackerHandle> {
        self.trackers.get(&world)
    }

    /// Apply a new threshold to every tracker and to trackers created later.
    ///
    /// Returns the previous default. Trackers whose actor has stopped are
    /// dropped from the registry.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Quorum`] without touching any tracker when
    /// `value` is outside `[0, 1]`.
    pub async fn reconfigure_all(&mut self, value: f64) -> Result<Threshold, TrackerError> {
        let threshold = Threshold::new(value)?;
        let previous = core::mem::replace(&mut self.default_threshold, threshold);

        let mut closed = Vec::new();
        for (world, handle) in &self.trackers {
            if let Err(err) = handle.set_threshold(threshold).await {
                warn!(%world, error = %err, "dropping closed tracker");
                closed.push(*world);
            }
        }
        for world in closed {
            self.trackers.remove(&world);
        }

        info!(%previous, current = %threshold, worlds = self.trackers.len(), "threshold applied to all worlds");
        Ok(previous)
    }

    /// Threshold given to newly spawned trackers.
    pub const fn default_threshold(&self) -> Threshold {
        self.default_threshold
    }

    /// Iterate over the registered trackers.
    pub fn iter(&self) -> impl Iterator<Item = (&WorldId, &TrackerHandle)> {
        self.trackers.iter()
    }

    /// Number of registered trackers.
    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    /// Whether no tracker has been created yet.
    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }
}
