//! Tracker configuration.
//!
//! Defaults match the reference deployment: 0.5 landmark confidence, badge
//! tiers at 10/20/50 reps, and the builtin exercise table.

use motion::milestones::default_tiers;
use motion::{MilestoneTier, ProfileRegistry};
use std::sync::Arc;

/// Per-session settings, copied into every session at creation
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Events buffered per subscriber before the oldest is dropped
    pub queue_capacity: usize,
    /// Landmarks reported below this confidence count as occluded
    pub min_visibility: f32,
    pub milestones: Vec<MilestoneTier>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            min_visibility: 0.5,
            milestones: default_tiers(),
        }
    }
}

impl SessionConfig {
    /// Clamped to at least one slot so the terminal event always fits
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_min_visibility(mut self, min_visibility: f32) -> Self {
        self.min_visibility = min_visibility.clamp(0.0, 1.0);
        self
    }

    pub fn with_milestones(mut self, milestones: Vec<MilestoneTier>) -> Self {
        self.milestones = milestones;
        self
    }
}

/// Everything a `WorkoutTracker` needs
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub session: SessionConfig,
    pub profiles: Arc<ProfileRegistry>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            profiles: ProfileRegistry::builtin(),
        }
    }
}

impl TrackerConfig {
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn with_profiles(mut self, profiles: Arc<ProfileRegistry>) -> Self {
        self.profiles = profiles;
        self
    }
}
