//! Joint angle calculation.
//!
//! The angle at vertex `b` between segments `b→a` and `b→c`, from the dot
//! product: `cos θ = (ba · bc) / (|ba| |bc|)`.

use crate::error::{MotionError, Result};
use crate::profile::JointTriple;
use pose_data::{LandmarkSet, Point2D};

/// Angle at `b` in degrees, always within `[0, 180]`.
///
/// Fails with `UndefinedAngle` when `a` or `c` coincides with `b`, since
/// the direction of a zero-length segment is meaningless.
pub fn angle(a: Point2D, b: Point2D, c: Point2D) -> Result<f64> {
    let (bax, bay) = (a.x - b.x, a.y - b.y);
    let (bcx, bcy) = (c.x - b.x, c.y - b.y);

    let norm_ba = bax.hypot(bay);
    let norm_bc = bcx.hypot(bcy);
    if !(norm_ba.is_finite() && norm_bc.is_finite())
        || norm_ba <= f64::EPSILON
        || norm_bc <= f64::EPSILON
    {
        return Err(MotionError::UndefinedAngle);
    }

    // Rounding can push the ratio just past ±1
    let cosine = ((bax * bcx + bay * bcy) / (norm_ba * norm_bc)).clamp(-1.0, 1.0);
    Ok(cosine.acos().to_degrees())
}

/// Vertex angle of `joints` in one frame.
///
/// Landmarks below `min_visibility` count as missing.
pub fn joint_angle(frame: &LandmarkSet, joints: JointTriple, min_visibility: f32) -> Result<f64> {
    let point = |id| {
        frame
            .visible_point(id, min_visibility)
            .ok_or(MotionError::MissingLandmark(id))
    };
    angle(
        point(joints.proximal)?,
        point(joints.vertex)?,
        point(joints.distal)?,
    )
}
