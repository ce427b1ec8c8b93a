//! Error types for the motion crate.
//!
//! Two families live here:
//! - `MotionError`: per-frame input problems. Callers skip the frame and
//!   keep going; these never end a session.
//! - `ProfileError`: problems with exercise configuration or lookups,
//!   reported straight back to whoever asked.

use pose_data::LandmarkId;
use thiserror::Error;

/// Per-frame failures while turning landmarks into an angle
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionError {
    /// Two of the three joint points coincide (or are not finite numbers)
    #[error("Joint angle is undefined for this frame")]
    UndefinedAngle,

    /// A landmark of the joint triple is absent or too low-confidence
    #[error("Landmark {0} is missing or occluded")]
    MissingLandmark(LandmarkId),
}

/// Failures registering or looking up exercise profiles
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProfileError {
    /// No profile registered under this name
    #[error("Unknown exercise: {0}")]
    NotFound(String),

    /// Thresholds violate `0 < down < up < 180`
    #[error("Invalid thresholds up={up} down={down}: {reason}")]
    InvalidThresholds {
        up: f64,
        down: f64,
        reason: &'static str,
    },

    #[error("Exercise name must not be empty")]
    EmptyName,

    /// The same landmark appears twice in a joint triple
    #[error("Joint triple for {name} repeats landmark {landmark}")]
    RepeatedLandmark { name: String, landmark: LandmarkId },

    /// A profile with this name is already registered
    #[error("Exercise already registered: {0}")]
    Duplicate(String),

    /// Profile document could not be decoded
    #[error("Invalid profile document: {0}")]
    InvalidDocument(String),
}

/// Convenience type alias for per-frame results
pub type Result<T> = std::result::Result<T, MotionError>;
