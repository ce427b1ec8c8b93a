//! # Pose Data Crate
//!
//! Landmark types that cross the boundary with the pose estimator, plus
//! helpers for reading recorded streams and generating synthetic ones.
//!
//! ## Main Components
//!
//! - **types**: `Point2D`, `LandmarkId`, `Landmark`, `LandmarkSet`
//! - **parser**: JSON Lines recordings to `Vec<LandmarkSet>`
//! - **synthetic**: frames and angle traces with known geometry
//! - **error**: error types for pose data
//!
//! ## Example Usage
//!
//! ```ignore
//! use pose_data::{parser, LandmarkId};
//! use std::path::Path;
//!
//! let frames = parser::load_frames(Path::new("recordings/curl.jsonl"))?;
//! let elbow = frames[0].visible_point(LandmarkId::LeftElbow, 0.5);
//! ```

pub mod error;
pub mod parser;
pub mod synthetic;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{PoseDataError, Result};
pub use types::{Landmark, LandmarkId, LandmarkSet, LandmarkSetBuilder, Point2D};
