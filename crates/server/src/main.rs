//! Demo harness for the workout tracker.
//!
//! Runs two sessions side by side, each fed from its own frame channel,
//! with an athlete view and a coach view subscribed to the first one.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pose_data::synthetic::{frame_with_angle, rep_sequence};
use pose_data::LandmarkSet;
use server::{SessionEvent, Subscription, WorkoutTracker};

const FRAME_INTERVAL: Duration = Duration::from_millis(5);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,server=debug,motion=debug")),
        )
        .init();

    info!("Starting rep tracker demo harness");
    let tracker = WorkoutTracker::new();
    info!("Available exercises: {}", tracker.exercises().join(", "));

    let curls = spawn_athlete(&tracker, "bicep curl", 12)?;
    let squats = spawn_athlete(&tracker, "squats", 5)?;
    let coach = tracker
        .subscribe(curls.id)
        .context("Failed to attach coach dashboard")?;

    let watchers = [
        tokio::spawn(watch("athlete/curls", curls.events)),
        tokio::spawn(watch("coach/curls", coach)),
        tokio::spawn(watch("athlete/squats", squats.events)),
    ];

    let curl_total = curls.task.await.context("Curl session task failed")?;
    let squat_total = squats.task.await.context("Squat session task failed")?;
    for watcher in watchers {
        watcher.await.context("Event watcher failed")?;
    }

    info!("Final totals: {} curls, {} squats", curl_total, squat_total);
    info!("Active sessions left: {}", tracker.active_sessions().len());
    Ok(())
}

/// Start a streamed session and a producer pushing synthetic frames into it
fn spawn_athlete(
    tracker: &WorkoutTracker,
    exercise: &str,
    reps: usize,
) -> Result<server::StartedStream> {
    let profile = tracker
        .profiles()
        .lookup(exercise)
        .with_context(|| format!("No profile for {exercise}"))?;
    let (tx, rx) = mpsc::channel::<LandmarkSet>(32);
    let started = tracker
        .start_with_stream(exercise, ReceiverStream::new(rx))
        .with_context(|| format!("Failed to start {exercise} session"))?;

    let joints = profile.joints().as_tuple();
    let angles = rep_sequence(profile.up_angle_deg(), profile.down_angle_deg(), reps, 6);
    tokio::spawn(async move {
        for angle in angles {
            if tx.send(frame_with_angle(joints, angle)).await.is_err() {
                break;
            }
            tokio::time::sleep(FRAME_INTERVAL).await;
        }
    });

    Ok(started)
}

async fn watch(label: &'static str, mut events: Subscription) {
    while let Some(event) = events.recv().await {
        match &event {
            SessionEvent::Rep { total_reps } => info!("[{}] rep #{}", label, total_reps),
            SessionEvent::Milestone { badge, total_reps } => {
                info!("[{}] {:?} badge at {} reps", label, badge, total_reps)
            }
            SessionEvent::Stopped { total_reps, reason } => {
                info!("[{}] stopped ({:?}) with {} reps", label, reason, total_reps)
            }
            SessionEvent::Error { reason } => info!("[{}] error: {:?}", label, reason),
        }
    }
    if events.dropped() > 0 {
        info!("[{}] missed {} events", label, events.dropped());
    }
}
