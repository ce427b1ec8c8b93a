//! Session layer of the rep tracker.
//!
//! This crate turns the motion primitives into a multi-session service:
//! sessions keyed by id, each with its own counter and subscriber fan-out,
//! driven either frame by frame or from a stream on its own task.
//!
//! - `orchestrator`: `WorkoutTracker`, the start/submit/stop command surface
//! - `session`: one tracked exercise and its counter
//! - `broadcaster`: bounded, drop-oldest event delivery per subscriber
//! - `registry`: id to session lookup
//! - `events`: the JSON event vocabulary

pub mod broadcaster;
pub mod config;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod registry;
pub mod session;

pub use broadcaster::{SessionBroadcaster, SubscriberId, Subscription};
pub use config::{SessionConfig, TrackerConfig};
pub use error::{Result, TrackerError};
pub use events::{ErrorReason, SessionEvent, StopReason};
pub use orchestrator::{StartedStream, WorkoutTracker};
pub use registry::SessionRegistry;
pub use session::{FrameOutcome, SessionId, TrackingSession};
