//! End-to-end tracking through the public `server` API.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use motion::ProfileRegistry;
use pose_data::synthetic::{frame_with_angle, rep_sequence};
use pose_data::{LandmarkId, LandmarkSet};
use server::{
    FrameOutcome, SessionConfig, SessionEvent, StopReason, Subscription, TrackerConfig,
    TrackerError, WorkoutTracker,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

fn frames_for(tracker: &WorkoutTracker, exercise: &str, reps: usize) -> Vec<LandmarkSet> {
    let profile = tracker.profiles().lookup(exercise).unwrap();
    rep_sequence(profile.up_angle_deg(), profile.down_angle_deg(), reps, 5)
        .into_iter()
        .map(|angle| frame_with_angle(profile.joints().as_tuple(), angle))
        .collect()
}

async fn collect(mut events: Subscription) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        seen.push(event);
    }
    seen
}

fn rep_totals(events: &[SessionEvent]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Rep { total_reps } => Some(*total_reps),
            _ => None,
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sessions_are_independent() {
    let tracker = WorkoutTracker::new();
    let plan = [
        ("bicep curl", 7),
        ("squats", 3),
        ("push-up", 12),
        ("shoulder press", 0),
    ];

    let mut running = Vec::new();
    for (exercise, reps) in plan {
        let frames = frames_for(&tracker, exercise, reps);
        let started = tracker
            .start_with_stream(exercise, tokio_stream::iter(frames))
            .unwrap();
        running.push((reps, started));
    }
    assert_eq!(tracker.active_sessions().len(), plan.len());

    for (reps, started) in running {
        let total = started.task.await.unwrap();
        assert_eq!(total as usize, reps);

        let events = collect(started.events).await;
        assert_eq!(rep_totals(&events), (1..=reps as u32).collect::<Vec<_>>());
        assert_eq!(
            events.last(),
            Some(&SessionEvent::Stopped {
                total_reps: reps as u32,
                reason: StopReason::StreamEnded
            })
        );
    }
    assert!(tracker.active_sessions().is_empty());
}

#[tokio::test]
async fn test_milestones_over_a_long_set() {
    let tracker = WorkoutTracker::new();
    let frames = frames_for(&tracker, "squats", 21);
    let started = tracker
        .start_with_stream("squats", tokio_stream::iter(frames))
        .unwrap();

    started.task.await.unwrap();
    let events = collect(started.events).await;

    let badges: Vec<(motion::Badge, u32)> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Milestone { badge, total_reps } => Some((*badge, *total_reps)),
            _ => None,
        })
        .collect();
    assert_eq!(
        badges,
        vec![(motion::Badge::Bronze, 10), (motion::Badge::Silver, 20)]
    );

    // Each milestone directly follows the rep that reached it
    for (i, event) in events.iter().enumerate() {
        if let SessionEvent::Milestone { total_reps, .. } = event {
            assert_eq!(
                events[i - 1],
                SessionEvent::Rep {
                    total_reps: *total_reps
                }
            );
        }
    }
}

#[tokio::test]
async fn test_occlusion_does_not_break_the_count() {
    let tracker = WorkoutTracker::new();
    let (id, events) = tracker.start_subscribed("bicep curl").unwrap();
    let profile = tracker.profiles().lookup("bicep curl").unwrap();
    let joints = profile.joints().as_tuple();

    // Wrist reported, but below the confidence cut-off
    let occluded: LandmarkSet = frame_with_angle(joints, 90.0)
        .iter()
        .map(|(landmark_id, landmark)| {
            let visibility = if landmark_id == LandmarkId::LeftWrist {
                0.1
            } else {
                1.0
            };
            (landmark_id, landmark.with_visibility(visibility))
        })
        .collect();

    tracker.submit(id, &frame_with_angle(joints, 165.0)).unwrap();
    for _ in 0..5 {
        tracker.submit(id, &occluded).unwrap();
        tracker.submit(id, &LandmarkSet::default()).unwrap();
    }
    tracker.submit(id, &frame_with_angle(joints, 40.0)).unwrap();

    let session = tracker.session(id).unwrap();
    assert_eq!(session.frames_skipped(), 10);
    assert_eq!(tracker.stop(id).unwrap(), 1);

    assert_eq!(
        collect(events).await,
        vec![
            SessionEvent::Rep { total_reps: 1 },
            SessionEvent::Stopped {
                total_reps: 1,
                reason: StopReason::Requested
            }
        ]
    );
}

#[tokio::test]
async fn test_custom_profiles_and_config() {
    let profiles = ProfileRegistry::from_json(
        r#"[{"name": "knee raise",
             "landmarks": ["left_hip", "left_knee", "left_ankle"],
             "up_angle": 150.0, "down_angle": 100.0}]"#,
    )
    .unwrap();
    let config = TrackerConfig::default()
        .with_profiles(Arc::new(profiles))
        .with_session(SessionConfig::default().with_milestones(Vec::new()));
    let tracker = WorkoutTracker::with_config(config);

    assert_eq!(tracker.exercises(), vec!["knee raise"]);
    assert_eq!(
        tracker.start("bicep curl").unwrap_err(),
        TrackerError::UnknownExercise("bicep curl".to_string())
    );

    let frames = frames_for(&tracker, "knee raise", 2);
    let started = tracker
        .start_with_stream("Knee Raise", tokio_stream::iter(frames))
        .unwrap();
    assert_eq!(started.task.await.unwrap(), 2);
    assert_eq!(rep_totals(&collect(started.events).await), vec![1, 2]);
}

#[tokio::test]
async fn test_live_stream_with_paced_producer() {
    let tracker = WorkoutTracker::new();
    let (tx, rx) = mpsc::channel(4);
    let started = tracker
        .start_with_stream("push-up", ReceiverStream::new(rx))
        .unwrap();
    let watcher = tokio::spawn(collect(started.events));

    for frame in frames_for(&tracker, "push-up", 3) {
        tx.send(frame).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    drop(tx);

    assert_eq!(started.task.await.unwrap(), 3);
    let events = watcher.await.unwrap();
    assert_eq!(rep_totals(&events), vec![1, 2, 3]);
    assert!(events.last().is_some_and(SessionEvent::is_terminal));
}

#[test]
fn test_stop_is_ordered_against_submits_on_other_threads() {
    const FRAMES: usize = 2000;

    // Large enough that no event is ever dropped
    let config =
        TrackerConfig::default().with_session(SessionConfig::default().with_queue_capacity(4096));
    let tracker = WorkoutTracker::with_config(config);
    let profile = tracker.profiles().lookup("bicep curl").unwrap();
    let joints = profile.joints().as_tuple();
    let (up, down) = (frame_with_angle(joints, 170.0), frame_with_angle(joints, 20.0));

    for round in 0..100usize {
        let (id, mut events) = tracker.start_subscribed("bicep curl").unwrap();
        let session = tracker.session(id).unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let submitter = {
            let session = Arc::clone(&session);
            let barrier = Arc::clone(&barrier);
            let (up, down) = (up.clone(), down.clone());
            thread::spawn(move || {
                barrier.wait();
                (0..FRAMES)
                    .map(|i| session.submit(if i % 2 == 0 { &up } else { &down }))
                    .collect::<Vec<_>>()
            })
        };

        barrier.wait();
        for _ in 0..round * 20 {
            std::hint::spin_loop();
        }
        let final_total = tracker.stop(id).unwrap();
        let outcomes = submitter.join().unwrap();

        // Once one frame is ignored, every later frame is too
        let cut = outcomes
            .iter()
            .position(|o| *o == FrameOutcome::Ignored)
            .unwrap_or(outcomes.len());
        assert!(
            outcomes[cut..].iter().all(|o| *o == FrameOutcome::Ignored),
            "round {round}: frame accepted after stop"
        );
        let counted = outcomes
            .iter()
            .filter(|o| matches!(o, FrameOutcome::Rep(_)))
            .count() as u32;
        assert_eq!(final_total, counted, "round {round}");

        // A late submit from yet another thread is a silent no-op
        let late = {
            let session = Arc::clone(&session);
            let frame = up.clone();
            thread::spawn(move || session.submit(&frame)).join().unwrap()
        };
        assert_eq!(late, FrameOutcome::Ignored);
        assert_eq!(session.total_reps(), counted);

        let mut seen = Vec::new();
        while let Some(event) = events.try_recv() {
            seen.push(event);
        }
        assert!(events.is_finished());
        assert_eq!(events.dropped(), 0);
        assert_eq!(rep_totals(&seen), (1..=counted).collect::<Vec<_>>(), "round {round}");
        assert_eq!(seen.iter().filter(|e| e.is_terminal()).count(), 1);
        assert_eq!(
            seen.last(),
            Some(&SessionEvent::Stopped {
                total_reps: counted,
                reason: StopReason::Requested
            })
        );
    }
}
