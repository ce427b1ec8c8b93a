//! Two-phase repetition counter.
//!
//! ## Algorithm
//! The counter waits for the joint to pass the `up` threshold, then for it
//! to pass the `down` threshold; the second crossing completes a rep.
//!
//! ```text
//!            θ > up                     θ < down  (rep += 1)
//! AwaitingUp ──────────▶ AwaitingDown ───────────────────────▶ AwaitingUp
//! ```
//!
//! Angles between the two thresholds change nothing, so jitter around either
//! boundary can't produce extra counts.

use crate::profile::Thresholds;
use serde::{Deserialize, Serialize};

/// Which threshold the counter is waiting to see crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    AwaitingUp,
    AwaitingDown,
}

/// Snapshot of a counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepCounterState {
    pub phase: Phase,
    pub total_reps: u32,
}

/// Emitted when a repetition completes; carries the new running total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepCompleted {
    pub total_reps: u32,
}

/// Hysteresis state machine over a stream of joint angles.
#[derive(Debug, Clone)]
pub struct RepCounter {
    thresholds: Thresholds,
    state: RepCounterState,
}

impl RepCounter {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            state: RepCounterState::default(),
        }
    }

    /// Feed one angle sample (degrees).
    ///
    /// Returns `Some` exactly when this sample completes a rep. Non-finite
    /// samples are ignored.
    pub fn observe(&mut self, angle_deg: f64) -> Option<RepCompleted> {
        if !angle_deg.is_finite() {
            return None;
        }

        match self.state.phase {
            Phase::AwaitingUp if angle_deg > self.thresholds.up() => {
                self.state.phase = Phase::AwaitingDown;
                None
            }
            Phase::AwaitingDown if angle_deg < self.thresholds.down() => {
                self.state.phase = Phase::AwaitingUp;
                self.state.total_reps = self.state.total_reps.saturating_add(1);
                Some(RepCompleted {
                    total_reps: self.state.total_reps,
                })
            }
            _ => None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn total_reps(&self) -> u32 {
        self.state.total_reps
    }

    pub fn state(&self) -> RepCounterState {
        self.state
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }
}
