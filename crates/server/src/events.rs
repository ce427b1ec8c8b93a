//! Events published to session subscribers.
//!
//! Serialized as JSON objects tagged by `type`, e.g.
//! `{"type":"rep","totalReps":3}` or
//! `{"type":"stopped","totalReps":3,"reason":"requested"}`.

use motion::Badge;
use serde::{Deserialize, Serialize};

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    /// An explicit `stop` command
    Requested,
    /// The landmark stream closed
    StreamEnded,
}

/// Error reasons reported to clients as events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorReason {
    InvalidExercise,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// A repetition completed; carries the cumulative count
    Rep {
        #[serde(rename = "totalReps")]
        total_reps: u32,
    },

    /// A badge tier was reached for the first time this session
    Milestone {
        badge: Badge,
        #[serde(rename = "totalReps")]
        total_reps: u32,
    },

    /// A `start` request was rejected
    Error { reason: ErrorReason },

    /// Terminal event; nothing follows it on the same session
    Stopped {
        #[serde(rename = "totalReps")]
        total_reps: u32,
        reason: StopReason,
    },
}

impl SessionEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionEvent::Stopped { .. })
    }

    /// Running total carried by the event, if any
    pub fn total_reps(&self) -> Option<u32> {
        match self {
            SessionEvent::Rep { total_reps }
            | SessionEvent::Milestone { total_reps, .. }
            | SessionEvent::Stopped { total_reps, .. } => Some(*total_reps),
            SessionEvent::Error { .. } => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
