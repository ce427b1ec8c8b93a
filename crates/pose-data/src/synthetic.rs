//! Synthetic landmark frames.
//!
//! Builds frames whose joint angle is known exactly, so the counter can be
//! driven without a camera: demos, benchmarks and tests all use these.

use crate::types::{Landmark, LandmarkId, LandmarkSet, Point2D};

/// Vertex position for generated frames
const VERTEX: Point2D = Point2D::new(0.5, 0.5);

/// Distance from the vertex to the other two joints
const LIMB_LENGTH: f64 = 0.2;

/// Build a frame containing only `triple`, with the vertex angle set to
/// `angle_deg`.
///
/// The proximal joint sits straight above the vertex; the distal joint is
/// rotated `angle_deg` away from it.
pub fn frame_with_angle(
    triple: (LandmarkId, LandmarkId, LandmarkId),
    angle_deg: f64,
) -> LandmarkSet {
    let (proximal, vertex, distal) = triple;
    let theta = angle_deg.to_radians();

    let proximal_point = VERTEX.translate(0.0, -LIMB_LENGTH);
    let distal_point = VERTEX.translate(LIMB_LENGTH * theta.sin(), -LIMB_LENGTH * theta.cos());

    LandmarkSet::builder()
        .landmark(proximal, visible(proximal_point))
        .landmark(vertex, visible(VERTEX))
        .landmark(distal, visible(distal_point))
        .build()
}

fn visible(point: Point2D) -> Landmark {
    Landmark {
        point,
        visibility: Some(1.0),
    }
}

/// Angle trace covering `reps` full cycles for the given thresholds.
///
/// Each cycle ramps from below `down` to above `up` and back, using
/// `steps` samples per half-cycle. The trace overshoots both thresholds,
/// so a counter starting in its initial phase sees exactly `reps` reps
/// (as long as `up < 180`).
pub fn rep_sequence(up: f64, down: f64, reps: usize, steps: usize) -> Vec<f64> {
    let steps = steps.max(1);
    let peak = up + (180.0 - up).clamp(0.0, 20.0) / 2.0;
    let trough = down - down.clamp(0.0, 20.0) / 2.0;

    let mut angles = Vec::with_capacity(reps * steps * 2 + 1);
    angles.push(trough);
    for _ in 0..reps {
        for i in 1..=steps {
            angles.push(trough + (peak - trough) * i as f64 / steps as f64);
        }
        for i in 1..=steps {
            angles.push(peak - (peak - trough) * i as f64 / steps as f64);
        }
    }
    angles
}
