use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use colored::Colorize;
use motion::{ExerciseProfile, ProfileRegistry};
use pose_data::synthetic::{frame_with_angle, rep_sequence};
use pose_data::{LandmarkSet, parser};
use rand::Rng;
use server::{SessionEvent, StartedStream, TrackerConfig, WorkoutTracker};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Rep Tracker - real-time exercise repetition counting
#[derive(Parser)]
#[command(name = "rep-tracker")]
#[command(about = "Counts exercise repetitions from pose landmark streams", long_about = None)]
struct Cli {
    /// JSON file with exercise profiles (replaces the builtin table)
    #[arg(short, long, global = true)]
    profiles: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the exercises that can be tracked
    Exercises {
        /// Print the profiles as a JSON document instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Replay a recorded landmark stream (JSON Lines) through a session
    Replay {
        /// Exercise to track
        #[arg(long)]
        exercise: String,

        /// Recording with one frame per line
        #[arg(long)]
        frames: PathBuf,

        /// Print raw JSON events
        #[arg(long)]
        json: bool,
    },

    /// Stream synthetic frames for a number of reps
    Simulate {
        /// Exercise to track
        #[arg(long)]
        exercise: String,

        /// Repetitions to perform
        #[arg(long, default_value = "10")]
        reps: usize,

        /// Random jitter added to each angle, in degrees
        #[arg(long, default_value = "0")]
        noise: f64,

        /// Also write the generated frames to this file
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Run many simulated sessions concurrently
    Benchmark {
        /// Number of concurrent sessions
        #[arg(long, default_value = "100")]
        sessions: usize,

        /// Repetitions per session
        #[arg(long, default_value = "20")]
        reps: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let tracker = build_tracker(cli.profiles.as_deref())?;

    match cli.command {
        Commands::Exercises { json } => handle_exercises(&tracker, json)?,
        Commands::Replay {
            exercise,
            frames,
            json,
        } => handle_replay(&tracker, &exercise, &frames, json).await?,
        Commands::Simulate {
            exercise,
            reps,
            noise,
            record,
        } => handle_simulate(&tracker, &exercise, reps, noise, record.as_deref()).await?,
        Commands::Benchmark { sessions, reps } => {
            handle_benchmark(&tracker, sessions, reps).await?
        }
    }

    Ok(())
}

fn build_tracker(profiles: Option<&Path>) -> Result<WorkoutTracker> {
    let Some(path) = profiles else {
        return Ok(WorkoutTracker::new());
    };

    let document = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read profiles from {}", path.display()))?;
    let registry = ProfileRegistry::from_json(&document)
        .with_context(|| format!("Invalid profile document {}", path.display()))?;
    info!("Loaded {} profiles from {}", registry.len(), path.display());

    Ok(WorkoutTracker::with_config(
        TrackerConfig::default().with_profiles(Arc::new(registry)),
    ))
}

fn lookup(tracker: &WorkoutTracker, exercise: &str) -> Result<Arc<ExerciseProfile>> {
    tracker.profiles().lookup(exercise).map_err(|_| {
        anyhow!(
            "Unknown exercise '{}' (available: {})",
            exercise,
            tracker.exercises().join(", ")
        )
    })
}

/// Handle the 'exercises' command
fn handle_exercises(tracker: &WorkoutTracker, json: bool) -> Result<()> {
    let profiles: Vec<&ExerciseProfile> = tracker.profiles().iter().map(Arc::as_ref).collect();
    if json {
        let document =
            serde_json::to_string_pretty(&profiles).context("Failed to encode profiles")?;
        println!("{}", document);
        return Ok(());
    }

    println!("{}", "Exercises:".bold().blue());
    for profile in profiles {
        let [proximal, vertex, distal] = profile.joints().as_array();
        println!(
            "{} {:<16} {} / {} / {}  up > {:.0}°  down < {:.0}°",
            "•".green(),
            profile.name(),
            proximal,
            vertex,
            distal,
            profile.up_angle_deg(),
            profile.down_angle_deg()
        );
    }
    Ok(())
}

/// Handle the 'replay' command
async fn handle_replay(
    tracker: &WorkoutTracker,
    exercise: &str,
    frames_path: &Path,
    json: bool,
) -> Result<()> {
    lookup(tracker, exercise)?;

    let start = Instant::now();
    let frames = parser::load_frames(frames_path)
        .with_context(|| format!("Failed to load {}", frames_path.display()))?;
    if !json {
        println!(
            "{} Loaded {} frames in {:?}",
            "✓".green(),
            frames.len(),
            start.elapsed()
        );
    }

    let started = tracker.start_with_stream(exercise, tokio_stream::iter(frames))?;
    run_to_completion(started, json).await
}

/// Handle the 'simulate' command
async fn handle_simulate(
    tracker: &WorkoutTracker,
    exercise: &str,
    reps: usize,
    noise: f64,
    record: Option<&Path>,
) -> Result<()> {
    let profile = lookup(tracker, exercise)?;
    let frames = synthesize(&profile, reps, noise);

    if let Some(path) = record {
        write_recording(path, &frames)?;
        println!(
            "{} Recorded {} frames to {}",
            "✓".green(),
            frames.len(),
            path.display()
        );
    }

    let started = tracker.start_with_stream(exercise, tokio_stream::iter(frames))?;
    run_to_completion(started, false).await
}

/// Handle the 'benchmark' command
async fn handle_benchmark(tracker: &WorkoutTracker, sessions: usize, reps: usize) -> Result<()> {
    if sessions == 0 {
        return Err(anyhow!("Benchmark needs at least one session"));
    }

    let names = tracker.exercises();
    if names.is_empty() {
        return Err(anyhow!("No exercises registered"));
    }

    // Generate every frame up front so only tracking is timed
    let mut workloads = Vec::with_capacity(sessions);
    for _ in 0..sessions {
        let name = &names[rand::rng().random_range(0..names.len())];
        let profile = lookup(tracker, name)?;
        workloads.push((name.clone(), synthesize(&profile, reps, 2.0)));
    }
    let total_frames: usize = workloads.iter().map(|(_, frames)| frames.len()).sum();

    let wall_clock = Instant::now();
    let mut handles = Vec::with_capacity(sessions);
    for (name, frames) in workloads {
        let start = Instant::now();
        let started = tracker.start_with_stream(&name, tokio_stream::iter(frames))?;
        drop(started.events);
        handles.push((start, started.task));
    }

    let mut timings = Vec::with_capacity(sessions);
    let mut total_reps = 0u64;
    for (start, task) in handles {
        total_reps += u64::from(task.await.context("Session task panicked")?);
        timings.push(start.elapsed());
    }
    let total_time = wall_clock.elapsed();

    timings.sort();
    let avg_latency = timings.iter().sum::<Duration>() / timings.len() as u32;
    let throughput = total_frames as f64 / total_time.as_secs_f64();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Sessions: {} ({} reps each)", sessions, reps);
    println!("Reps counted: {} of {}", total_reps, sessions * reps);
    println!("Total time: {:?}", total_time);
    println!("Average session latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(&timings, 0.50));
    println!("P95 latency: {:?}", percentile(&timings, 0.95));
    println!("P99 latency: {:?}", percentile(&timings, 0.99));
    println!("Throughput: {:.0} frames/second", throughput);

    Ok(())
}

/// Print every event of a streamed session, then a summary
async fn run_to_completion(started: StartedStream, json: bool) -> Result<()> {
    let StartedStream {
        session,
        mut events,
        task,
        ..
    } = started;

    while let Some(event) = events.recv().await {
        if json {
            println!("{}", event.to_json().context("Failed to encode event")?);
        } else {
            print_event(&event);
        }
    }
    let total = task.await.context("Session task panicked")?;

    if !json {
        println!(
            "{} {}: {} reps from {} frames ({} skipped)",
            "✓".green(),
            session.profile().name(),
            total.to_string().bold(),
            session.frames_seen(),
            session.frames_skipped()
        );
    }
    Ok(())
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::Rep { total_reps } => {
            println!("{} rep {}", "▲".green(), total_reps.to_string().bold())
        }
        SessionEvent::Milestone { badge, total_reps } => {
            let label = format!("{:?} badge", badge);
            println!("{} {} at {} reps", "★".yellow(), label.yellow().bold(), total_reps)
        }
        SessionEvent::Error { reason } => println!("{} {:?}", "✗".red(), reason),
        SessionEvent::Stopped { total_reps, reason } => {
            println!("{} stopped ({:?}) at {} reps", "■".blue(), reason, total_reps)
        }
    }
}

/// Synthetic frames for `reps` cycles, each angle jittered by up to `noise`
fn synthesize(profile: &ExerciseProfile, reps: usize, noise: f64) -> Vec<LandmarkSet> {
    let mut rng = rand::rng();
    let joints = profile.joints().as_tuple();
    rep_sequence(profile.up_angle_deg(), profile.down_angle_deg(), reps, 8)
        .into_iter()
        .map(|angle| {
            let jitter = if noise > 0.0 {
                rng.random_range(-noise..=noise)
            } else {
                0.0
            };
            frame_with_angle(joints, (angle + jitter).clamp(0.0, 180.0))
        })
        .collect()
}

fn write_recording(path: &Path, frames: &[LandmarkSet]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for frame in frames {
        let line = parser::to_frame_line(frame).context("Failed to encode frame")?;
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}

/// Nearest-rank percentile over sorted durations
fn percentile(sorted: &[Duration], q: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let rank = ((sorted.len() as f64 * q).ceil() as usize).clamp(1, sorted.len());
    sorted[rank - 1]
}
