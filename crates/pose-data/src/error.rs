//! Error types for the pose-data crate.
//!
//! Everything here describes a problem with recorded or incoming pose data:
//! unreadable files, malformed frame lines, or landmark values that fall
//! outside the normalized coordinate space.

use thiserror::Error;

/// Errors that can occur while reading or validating landmark frames
#[derive(Error, Debug)]
pub enum PoseDataError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading a recording
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A frame line couldn't be parsed
    ///
    /// Stores where the problem was found so recordings can be fixed by hand
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// A frame line is not valid JSON or lacks the `landmarks` field
    #[error("Malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    /// Landmark name that isn't part of the BlazePose topology
    #[error("Unknown landmark: {0}")]
    UnknownLandmark(String),

    /// Array-form frame with the wrong number of landmarks
    #[error("Expected {expected} landmarks but found {found}")]
    LandmarkCountMismatch { expected: usize, found: usize },

    /// A coordinate or visibility value was not a finite number
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, PoseDataError>;
