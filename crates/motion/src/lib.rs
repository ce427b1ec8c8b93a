//! Motion analysis for repetition counting.
//!
//! This crate provides:
//! - `angle`: vertex angle of three landmarks
//! - `profile`: validated exercise profiles and their registry
//! - `rep_counter`: the two-threshold repetition state machine
//! - `milestones`: badge tiers awarded as the count grows
//!
//! ## Architecture
//! Each frame passes through the stages in order:
//! 1. The profile's joint triple selects three landmarks from the frame
//! 2. `joint_angle` turns them into one angle (or skips the frame)
//! 3. `RepCounter::observe` advances the state machine
//! 4. Completed reps feed the `MilestoneTracker`
//!
//! ## Example Usage
//! ```ignore
//! use motion::{joint_angle, ProfileRegistry, RepCounter};
//!
//! let profile = ProfileRegistry::builtin().lookup("bicep curl")?;
//! let mut counter = RepCounter::new(profile.thresholds());
//!
//! for frame in frames {
//!     if let Ok(angle) = joint_angle(&frame, profile.joints(), 0.5) {
//!         if let Some(rep) = counter.observe(angle) {
//!             println!("rep {}", rep.total_reps);
//!         }
//!     }
//! }
//! ```

pub mod angle;
pub mod error;
pub mod milestones;
pub mod profile;
pub mod rep_counter;

// Re-export main types
pub use angle::{angle, joint_angle};
pub use error::{MotionError, ProfileError};
pub use milestones::{Badge, MilestoneTier, MilestoneTracker};
pub use profile::{ExerciseProfile, JointTriple, ProfileDocument, ProfileRegistry, Thresholds};
pub use rep_counter::{Phase, RepCompleted, RepCounter, RepCounterState};
