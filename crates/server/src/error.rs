//! Errors reported to callers of the tracker's commands.
//!
//! Per-frame problems (occluded joints, degenerate angles) never show up
//! here; sessions swallow them. Everything in this enum is a client-request
//! error and only affects the request that caused it.

use crate::events::{ErrorReason, SessionEvent};
use crate::session::SessionId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    /// `start` named an exercise with no registered profile
    #[error("Unknown exercise: {0}")]
    UnknownExercise(String),

    /// No active session has this id
    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),

    /// A session with this id is already registered
    #[error("Session already exists: {0}")]
    DuplicateSession(SessionId),
}

impl TrackerError {
    /// Event form for transports that report errors on the event channel
    pub fn as_event(&self) -> Option<SessionEvent> {
        match self {
            TrackerError::UnknownExercise(_) => Some(SessionEvent::Error {
                reason: ErrorReason::InvalidExercise,
            }),
            _ => None,
        }
    }
}

/// Convenience type alias for tracker results
pub type Result<T> = std::result::Result<T, TrackerError>;
