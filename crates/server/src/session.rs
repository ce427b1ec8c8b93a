//! Tracking sessions.
//!
//! A `TrackingSession` owns one exercise profile and one rep counter for its
//! whole life. Frames go in through `submit` (or a stream via `consume`),
//! and rep events come out through the session's broadcaster.
//!
//! ## Concurrency
//! The counter has a single logical writer (the session's frame stream), but
//! `stop` may arrive from any task. Counter and terminal flag share one
//! short-lived lock, so every `rep` published before a stop is delivered
//! before `stopped`, and nothing is published after it.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use motion::{joint_angle, ExerciseProfile, MilestoneTracker, MotionError, Phase, RepCounter};
use parking_lot::Mutex;
use pose_data::LandmarkSet;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, instrument, trace};
use uuid::Uuid;

use crate::broadcaster::{SessionBroadcaster, Subscription};
use crate::config::SessionConfig;
use crate::events::{SessionEvent, StopReason};

// =============================================================================
// Session identifiers
// =============================================================================

/// Opaque session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// A fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// =============================================================================
// Frame outcomes
// =============================================================================

/// What happened to one submitted frame (diagnostics only)
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// The session was already stopped; the frame was dropped
    Ignored,
    /// No angle could be computed for this frame
    Skipped(MotionError),
    /// Angle computed, no rep completed
    Idle,
    /// A rep completed; carries the new total
    Rep(u32),
}

// =============================================================================
// TrackingSession
// =============================================================================

#[derive(Debug)]
struct CounterState {
    counter: RepCounter,
    milestones: MilestoneTracker,
    stopped: Option<StopReason>,
}

#[derive(Debug)]
pub struct TrackingSession {
    id: SessionId,
    profile: Arc<ExerciseProfile>,
    min_visibility: f32,
    state: Mutex<CounterState>,
    broadcaster: SessionBroadcaster,
    /// Wakes `consume` out of a stream that has gone quiet
    stop_signal: Notify,
    frames_seen: AtomicU64,
    frames_skipped: AtomicU64,
}

impl TrackingSession {
    pub fn new(id: SessionId, profile: Arc<ExerciseProfile>, config: &SessionConfig) -> Self {
        let state = CounterState {
            counter: RepCounter::new(profile.thresholds()),
            milestones: MilestoneTracker::new(config.milestones.clone()),
            stopped: None,
        };
        Self {
            id,
            profile,
            min_visibility: config.min_visibility,
            state: Mutex::new(state),
            broadcaster: SessionBroadcaster::new(config.queue_capacity),
            stop_signal: Notify::new(),
            frames_seen: AtomicU64::new(0),
            frames_skipped: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn profile(&self) -> &Arc<ExerciseProfile> {
        &self.profile
    }

    /// Process one frame.
    ///
    /// Missing landmarks and degenerate angles skip the frame without
    /// touching the counter. After `stop`, frames are silently ignored.
    pub fn submit(&self, frame: &LandmarkSet) -> FrameOutcome {
        let mut state = self.state.lock();
        if state.stopped.is_some() {
            return FrameOutcome::Ignored;
        }
        self.frames_seen.fetch_add(1, Ordering::Relaxed);

        let angle = match joint_angle(frame, self.profile.joints(), self.min_visibility) {
            Ok(angle) => angle,
            Err(e) => {
                self.frames_skipped.fetch_add(1, Ordering::Relaxed);
                trace!(session = %self.id, "Skipping frame: {}", e);
                return FrameOutcome::Skipped(e);
            }
        };

        let Some(done) = state.counter.observe(angle) else {
            return FrameOutcome::Idle;
        };

        debug!(session = %self.id, total_reps = done.total_reps, "Rep completed");
        self.broadcaster.publish(SessionEvent::Rep {
            total_reps: done.total_reps,
        });
        if let Some(tier) = state.milestones.reached(done.total_reps) {
            info!(session = %self.id, badge = ?tier.badge, "Milestone reached");
            self.broadcaster.publish(SessionEvent::Milestone {
                badge: tier.badge,
                total_reps: done.total_reps,
            });
        }
        FrameOutcome::Rep(done.total_reps)
    }

    /// Drain a frame stream, then stop with `StreamEnded`.
    ///
    /// Returns as soon as the session is stopped from elsewhere, even while
    /// the stream is idle; the stream is dropped on return. Yields the final
    /// rep count.
    #[instrument(skip(self, frames), fields(session = %self.id, exercise = self.profile.name()))]
    pub async fn consume<S>(&self, frames: S) -> u32
    where
        S: Stream<Item = LandmarkSet>,
    {
        tokio::pin!(frames);
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.stop_signal.notified() => {
                    debug!("Session stopped while stream was still open");
                    break;
                }
                frame = frames.next() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };
            if self.submit(&frame) == FrameOutcome::Ignored {
                debug!("Session stopped while stream was still open");
                break;
            }
        }
        self.stop(StopReason::StreamEnded);
        self.total_reps()
    }

    /// Mark the session terminal and notify subscribers.
    ///
    /// Idempotent: returns true only for the call that actually stopped it.
    pub fn stop(&self, reason: StopReason) -> bool {
        let total_reps = {
            let mut state = self.state.lock();
            if state.stopped.is_some() {
                return false;
            }
            state.stopped = Some(reason);
            state.counter.total_reps()
        };

        self.broadcaster.close(SessionEvent::Stopped { total_reps, reason });
        // Leaves a permit if no consumer is parked yet
        self.stop_signal.notify_one();
        info!(
            session = %self.id,
            exercise = self.profile.name(),
            total_reps,
            ?reason,
            frames = self.frames_seen(),
            skipped = self.frames_skipped(),
            "Session stopped"
        );
        true
    }

    pub fn subscribe(&self) -> Subscription {
        self.broadcaster.subscribe()
    }

    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.broadcaster.unsubscribe(subscription.id())
    }

    pub fn subscriber_count(&self) -> usize {
        self.broadcaster.subscriber_count()
    }

    pub fn total_reps(&self) -> u32 {
        self.state.lock().counter.total_reps()
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().counter.phase()
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped.is_some()
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.state.lock().stopped
    }

    /// Frames accepted before the session stopped
    pub fn frames_seen(&self) -> u64 {
        self.frames_seen.load(Ordering::Relaxed)
    }

    /// Frames with no usable angle
    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped.load(Ordering::Relaxed)
    }
}
