//! # Workout Tracker
//!
//! Command surface for the tracking service:
//! 1. `start` resolves an exercise profile and registers a session
//! 2. Frames arrive through `submit`, or a whole stream via `start_with_stream`
//! 3. Subscribers receive `rep`, `milestone` and finally `stopped` events
//! 4. `stop` (or stream end) retires the session
//!
//! Sessions are independent; one tokio task per streamed session consumes
//! its frames while other sessions run concurrently on the same runtime.

use std::sync::Arc;

use motion::ProfileRegistry;
use pose_data::LandmarkSet;
use tokio::task::JoinHandle;
use tokio_stream::Stream;
use tracing::{debug, info};

use crate::broadcaster::Subscription;
use crate::config::TrackerConfig;
use crate::error::Result;
use crate::events::StopReason;
use crate::registry::SessionRegistry;
use crate::session::{FrameOutcome, SessionId, TrackingSession};

/// A session whose frames come from a spawned consumer task
#[derive(Debug)]
pub struct StartedStream {
    pub id: SessionId,
    /// Stays readable after the session leaves the tracker
    pub session: Arc<TrackingSession>,
    /// Registered before the consumer starts, so no event is missed
    pub events: Subscription,
    /// Resolves to the final rep count once the stream ends or the
    /// session is stopped
    pub task: JoinHandle<u32>,
}

/// Handle to the tracking service; cheap to clone
#[derive(Debug, Clone)]
pub struct WorkoutTracker {
    registry: Arc<SessionRegistry>,
}

impl Default for WorkoutTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkoutTracker {
    /// Tracker with the builtin exercise table and default session settings
    pub fn new() -> Self {
        Self::with_config(TrackerConfig::default())
    }

    pub fn with_config(config: TrackerConfig) -> Self {
        info!(
            "Workout tracker ready with {} exercises",
            config.profiles.len()
        );
        Self {
            registry: Arc::new(SessionRegistry::new(config.profiles, config.session)),
        }
    }

    /// Open a session for `exercise`.
    ///
    /// Unknown exercise names fail with `UnknownExercise` and create nothing.
    pub fn start(&self, exercise: &str) -> Result<SessionId> {
        let id = SessionId::new();
        let session = self.registry.create(id, exercise)?;
        info!(session = %id, exercise = session.profile().name(), "Session started");
        Ok(id)
    }

    /// `start` plus a subscription that is live before the id is handed out
    pub fn start_subscribed(&self, exercise: &str) -> Result<(SessionId, Subscription)> {
        let id = SessionId::new();
        let session = self.registry.create(id, exercise)?;
        let events = session.subscribe();
        info!(session = %id, exercise = session.profile().name(), "Session started");
        Ok((id, events))
    }

    /// Start a session fed by `frames` on its own task.
    ///
    /// When the stream ends the session stops with `StreamEnded` and is
    /// removed from the tracker. Must be called within a tokio runtime.
    pub fn start_with_stream<S>(&self, exercise: &str, frames: S) -> Result<StartedStream>
    where
        S: Stream<Item = LandmarkSet> + Send + 'static,
    {
        let (id, events) = self.start_subscribed(exercise)?;
        let session = self.registry.get(id)?;
        let registry = Arc::clone(&self.registry);

        let consumer = Arc::clone(&session);
        let task = tokio::spawn(async move {
            let total = consumer.consume(frames).await;
            if registry.remove(id).is_ok() {
                debug!(session = %id, "Session retired after stream end");
            }
            total
        });

        Ok(StartedStream {
            id,
            session,
            events,
            task,
        })
    }

    /// Feed one frame to a session
    pub fn submit(&self, id: SessionId, frame: &LandmarkSet) -> Result<FrameOutcome> {
        Ok(self.registry.get(id)?.submit(frame))
    }

    pub fn subscribe(&self, id: SessionId) -> Result<Subscription> {
        Ok(self.registry.get(id)?.subscribe())
    }

    pub fn unsubscribe(&self, id: SessionId, subscription: &Subscription) -> Result<bool> {
        Ok(self.registry.get(id)?.unsubscribe(subscription))
    }

    /// Stop a session and return its final rep count.
    ///
    /// The session leaves the tracker first, so a repeated `stop` reports
    /// `UnknownSession`.
    pub fn stop(&self, id: SessionId) -> Result<u32> {
        let session = self.registry.remove(id)?;
        session.stop(StopReason::Requested);
        Ok(session.total_reps())
    }

    pub fn session(&self, id: SessionId) -> Result<Arc<TrackingSession>> {
        self.registry.get(id)
    }

    pub fn active_sessions(&self) -> Vec<SessionId> {
        self.registry.ids()
    }

    /// Exercise names accepted by `start`, sorted
    pub fn exercises(&self) -> Vec<String> {
        self.profiles().names().into_iter().map(str::to_string).collect()
    }

    pub fn profiles(&self) -> &Arc<ProfileRegistry> {
        self.registry.profiles()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::error::TrackerError;
    use crate::events::SessionEvent;
    use motion::Phase;
    use pose_data::synthetic::{frame_with_angle, rep_sequence};

    fn curl_frame(tracker: &WorkoutTracker, angle: f64) -> LandmarkSet {
        let profile = tracker.profiles().lookup("bicep curl").unwrap();
        frame_with_angle(profile.joints().as_tuple(), angle)
    }

    fn curl_frames(tracker: &WorkoutTracker, reps: usize) -> Vec<LandmarkSet> {
        rep_sequence(150.0, 60.0, reps, 4)
            .into_iter()
            .map(|angle| curl_frame(tracker, angle))
            .collect()
    }

    async fn drain(sub: &mut Subscription) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Some(event) = sub.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_start_then_stop_emits_single_stopped() {
        let tracker = WorkoutTracker::new();
        let id = tracker.start("bicep curl").unwrap();
        let mut sub = tracker.subscribe(id).unwrap();

        assert_eq!(tracker.stop(id).unwrap(), 0);
        assert_eq!(
            drain(&mut sub).await,
            vec![SessionEvent::Stopped {
                total_reps: 0,
                reason: StopReason::Requested
            }]
        );
    }

    #[test]
    fn test_unknown_exercise_creates_no_session() {
        let tracker = WorkoutTracker::new();
        let err = tracker.start("jumping jacks").unwrap_err();

        assert_eq!(err, TrackerError::UnknownExercise("jumping jacks".to_string()));
        assert_eq!(
            err.as_event(),
            Some(SessionEvent::Error {
                reason: crate::events::ErrorReason::InvalidExercise
            })
        );
        assert!(tracker.active_sessions().is_empty());
    }

    #[test]
    fn test_unknown_session_commands() {
        let tracker = WorkoutTracker::new();
        let ghost = SessionId::new();
        let frame = curl_frame(&tracker, 90.0);

        assert_eq!(
            tracker.submit(ghost, &frame).unwrap_err(),
            TrackerError::UnknownSession(ghost)
        );
        assert!(tracker.subscribe(ghost).is_err());
        assert_eq!(
            tracker.stop(ghost).unwrap_err(),
            TrackerError::UnknownSession(ghost)
        );
    }

    #[test]
    fn test_submit_after_stop_keeps_total() {
        let tracker = WorkoutTracker::new();
        let id = tracker.start("bicep curl").unwrap();
        let session = tracker.session(id).unwrap();

        for angle in [10.0, 160.0, 20.0] {
            tracker.submit(id, &curl_frame(&tracker, angle)).unwrap();
        }
        assert_eq!(tracker.stop(id).unwrap(), 1);
        assert!(matches!(
            tracker.stop(id),
            Err(TrackerError::UnknownSession(_))
        ));

        // A caller still holding the session sees a silent no-op
        for angle in [160.0, 20.0] {
            assert_eq!(
                session.submit(&curl_frame(&tracker, angle)),
                FrameOutcome::Ignored
            );
        }
        assert_eq!(session.total_reps(), 1);
        assert_eq!(session.phase(), Phase::AwaitingUp);
    }

    #[tokio::test]
    async fn test_subscribers_agree_despite_drops() {
        let config = TrackerConfig::default()
            .with_session(SessionConfig::default().with_queue_capacity(3));
        let tracker = WorkoutTracker::with_config(config);
        let (id, mut a) = tracker.start_subscribed("bicep curl").unwrap();
        let mut b = tracker.subscribe(id).unwrap();
        let mut fast = tracker.subscribe(id).unwrap();

        let mut fast_events = Vec::new();
        for frame in curl_frames(&tracker, 10) {
            tracker.submit(id, &frame).unwrap();
            while let Some(event) = fast.try_recv() {
                fast_events.push(event);
            }
        }
        let total = tracker.stop(id).unwrap();
        assert_eq!(total, 10);
        fast_events.extend(drain(&mut fast).await);

        let seen_a = drain(&mut a).await;
        let seen_b = drain(&mut b).await;
        assert_eq!(seen_a, seen_b);
        assert!(a.dropped() > 0);

        // Slow readers lost history, but the last rep before `stopped`
        // still matches the counter
        let last_rep = seen_a
            .iter()
            .filter(|e| matches!(e, SessionEvent::Rep { .. }))
            .filter_map(SessionEvent::total_reps)
            .last();
        assert_eq!(last_rep, Some(total));
        assert_eq!(
            seen_a.last(),
            Some(&SessionEvent::Stopped {
                total_reps: total,
                reason: StopReason::Requested
            })
        );

        let fast_reps: Vec<u32> = fast_events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Rep { .. }))
            .filter_map(SessionEvent::total_reps)
            .collect();
        assert_eq!(fast_reps, (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_stream_end_stops_and_retires_session() {
        let tracker = WorkoutTracker::new();
        let frames = curl_frames(&tracker, 3);
        let started = tracker
            .start_with_stream("bicep curl", tokio_stream::iter(frames))
            .unwrap();
        let StartedStream {
            id,
            session,
            mut events,
            task,
        } = started;

        assert_eq!(task.await.unwrap(), 3);
        let seen = drain(&mut events).await;
        assert_eq!(
            seen,
            vec![
                SessionEvent::Rep { total_reps: 1 },
                SessionEvent::Rep { total_reps: 2 },
                SessionEvent::Rep { total_reps: 3 },
                SessionEvent::Stopped {
                    total_reps: 3,
                    reason: StopReason::StreamEnded
                },
            ]
        );
        assert!(tracker.session(id).is_err());
        assert!(tracker.active_sessions().is_empty());
        assert_eq!(session.frames_seen(), 25);
        assert_eq!(session.stop_reason(), Some(StopReason::StreamEnded));
    }

    #[tokio::test]
    async fn test_stop_interrupts_open_stream() {
        let tracker = WorkoutTracker::new();
        let (tx, rx) = tokio::sync::mpsc::channel(8);
        let started = tracker
            .start_with_stream(
                "bicep curl",
                tokio_stream::wrappers::ReceiverStream::new(rx),
            )
            .unwrap();
        let mut events = started.events;

        for angle in [170.0, 20.0] {
            tx.send(curl_frame(&tracker, angle)).await.unwrap();
        }
        assert_eq!(events.recv().await, Some(SessionEvent::Rep { total_reps: 1 }));

        assert_eq!(tracker.stop(started.id).unwrap(), 1);
        assert_eq!(
            events.recv().await,
            Some(SessionEvent::Stopped {
                total_reps: 1,
                reason: StopReason::Requested
            })
        );

        // The producer is still connected but idle; stop alone must end the task
        let total = tokio::time::timeout(std::time::Duration::from_secs(2), started.task)
            .await
            .expect("consumer task should finish after stop")
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(events.recv().await, None);

        // The consumer dropped the receiving end and its session handle
        assert!(tx.is_closed());
        assert!(tx.send(curl_frame(&tracker, 170.0)).await.is_err());
        assert_eq!(Arc::strong_count(&started.session), 1);
    }

    #[test]
    fn test_exercise_listing() {
        let tracker = WorkoutTracker::new();
        assert_eq!(
            tracker.exercises(),
            vec!["bicep curl", "push-up", "shoulder press", "squats"]
        );
    }
}
