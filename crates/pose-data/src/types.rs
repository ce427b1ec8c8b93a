//! Core pose types shared by every stage of the tracker.
//!
//! A pose estimator (outside this workspace) turns a camera frame into a set
//! of labelled 2-D landmarks. These types are the boundary with it:
//! - `Point2D` is a normalized image coordinate
//! - `LandmarkId` is the closed set of anatomical joints (BlazePose topology)
//! - `LandmarkSet` is one observed frame, immutable once built

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::PoseDataError;

// =============================================================================
// Points
// =============================================================================

/// A 2-D position in normalized image coordinates (`[0, 1]` on both axes).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Shift both coordinates by the same offset
    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

// =============================================================================
// Landmark identifiers
// =============================================================================

/// Anatomical landmarks produced by the pose estimator.
///
/// The discriminant is the landmark's index in the estimator's output array,
/// so array-form frames can be decoded positionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkId {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkId {
    /// Number of landmarks in one full estimator frame
    pub const COUNT: usize = 33;

    /// Every landmark, in estimator index order
    pub const ALL: [LandmarkId; Self::COUNT] = [
        Self::Nose,
        Self::LeftEyeInner,
        Self::LeftEye,
        Self::LeftEyeOuter,
        Self::RightEyeInner,
        Self::RightEye,
        Self::RightEyeOuter,
        Self::LeftEar,
        Self::RightEar,
        Self::MouthLeft,
        Self::MouthRight,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftPinky,
        Self::RightPinky,
        Self::LeftIndex,
        Self::RightIndex,
        Self::LeftThumb,
        Self::RightThumb,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::LeftHeel,
        Self::RightHeel,
        Self::LeftFootIndex,
        Self::RightFootIndex,
    ];

    /// Position in the estimator's output array
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// snake_case name used in recordings and logs
    pub fn name(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEyeInner => "left_eye_inner",
            Self::LeftEye => "left_eye",
            Self::LeftEyeOuter => "left_eye_outer",
            Self::RightEyeInner => "right_eye_inner",
            Self::RightEye => "right_eye",
            Self::RightEyeOuter => "right_eye_outer",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::MouthLeft => "mouth_left",
            Self::MouthRight => "mouth_right",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftPinky => "left_pinky",
            Self::RightPinky => "right_pinky",
            Self::LeftIndex => "left_index",
            Self::RightIndex => "right_index",
            Self::LeftThumb => "left_thumb",
            Self::RightThumb => "right_thumb",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
            Self::LeftHeel => "left_heel",
            Self::RightHeel => "right_heel",
            Self::LeftFootIndex => "left_foot_index",
            Self::RightFootIndex => "right_foot_index",
        }
    }
}

impl fmt::Display for LandmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LandmarkId {
    type Err = PoseDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.name() == wanted)
            .ok_or_else(|| PoseDataError::UnknownLandmark(s.to_string()))
    }
}

// =============================================================================
// Landmarks and frames
// =============================================================================

/// One landmark observation: position plus optional estimator confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    #[serde(flatten)]
    pub point: Point2D,
    /// Visibility / confidence in `[0, 1]`, when the estimator reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f32>,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            point: Point2D::new(x, y),
            visibility: None,
        }
    }

    pub fn with_visibility(mut self, visibility: f32) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// A landmark with unknown visibility is assumed visible
    pub fn is_visible(&self, min_visibility: f32) -> bool {
        self.visibility.is_none_or(|v| v >= min_visibility)
    }
}

/// All landmarks observed in a single frame.
///
/// Construct through [`LandmarkSet::builder`] or by collecting
/// `(LandmarkId, Landmark)` pairs; there are no mutators afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    landmarks: BTreeMap<LandmarkId, Landmark>,
}

impl LandmarkSet {
    pub fn builder() -> LandmarkSetBuilder {
        LandmarkSetBuilder::default()
    }

    pub fn get(&self, id: LandmarkId) -> Option<&Landmark> {
        self.landmarks.get(&id)
    }

    /// Position of `id` if present and visible enough to trust
    pub fn visible_point(&self, id: LandmarkId, min_visibility: f32) -> Option<Point2D> {
        self.landmarks
            .get(&id)
            .filter(|landmark| landmark.is_visible(min_visibility))
            .map(|landmark| landmark.point)
    }

    pub fn contains(&self, id: LandmarkId) -> bool {
        self.landmarks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Landmarks in estimator index order
    pub fn iter(&self) -> impl Iterator<Item = (LandmarkId, &Landmark)> {
        self.landmarks.iter().map(|(id, landmark)| (*id, landmark))
    }
}

impl FromIterator<(LandmarkId, Landmark)> for LandmarkSet {
    fn from_iter<I: IntoIterator<Item = (LandmarkId, Landmark)>>(iter: I) -> Self {
        Self {
            landmarks: iter.into_iter().collect(),
        }
    }
}

/// Builder for [`LandmarkSet`]; a later insert for the same id wins.
#[derive(Debug, Default)]
pub struct LandmarkSetBuilder {
    landmarks: BTreeMap<LandmarkId, Landmark>,
}

impl LandmarkSetBuilder {
    pub fn landmark(mut self, id: LandmarkId, landmark: Landmark) -> Self {
        self.landmarks.insert(id, landmark);
        self
    }

    pub fn point(self, id: LandmarkId, x: f64, y: f64) -> Self {
        self.landmark(id, Landmark::new(x, y))
    }

    pub fn build(self) -> LandmarkSet {
        LandmarkSet {
            landmarks: self.landmarks,
        }
    }
}
