//! Exercise profiles and the registry that holds them.
//!
//! A profile names the three landmarks whose vertex angle describes the
//! movement, and the two hysteresis thresholds for counting. Profiles are
//! validated once, when they are built, and shared read-only afterwards.

use crate::error::ProfileError;
use pose_data::LandmarkId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

// =============================================================================
// Joint triple and thresholds
// =============================================================================

/// Three landmarks, ordered (proximal, vertex, distal); the angle is taken
/// at the vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointTriple {
    pub proximal: LandmarkId,
    pub vertex: LandmarkId,
    pub distal: LandmarkId,
}

impl JointTriple {
    pub const fn new(proximal: LandmarkId, vertex: LandmarkId, distal: LandmarkId) -> Self {
        Self {
            proximal,
            vertex,
            distal,
        }
    }

    pub fn as_array(&self) -> [LandmarkId; 3] {
        [self.proximal, self.vertex, self.distal]
    }

    pub fn as_tuple(&self) -> (LandmarkId, LandmarkId, LandmarkId) {
        (self.proximal, self.vertex, self.distal)
    }
}

/// Counting thresholds in degrees; `up` is always strictly above `down`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    up: f64,
    down: f64,
}

impl Thresholds {
    /// Validate `0 < down < up < 180`.
    ///
    /// Angles never leave `[0, 180]` and both comparisons are strict, so a
    /// threshold on either bound could never be crossed.
    pub fn new(up: f64, down: f64) -> Result<Self, ProfileError> {
        let invalid = |reason| ProfileError::InvalidThresholds { up, down, reason };
        if !up.is_finite() || !down.is_finite() {
            return Err(invalid("thresholds must be finite"));
        }
        if up >= 180.0 || down <= 0.0 {
            return Err(invalid("thresholds must lie strictly inside (0, 180) degrees"));
        }
        if up <= down {
            return Err(invalid("up angle must be greater than down angle"));
        }
        Ok(Self { up, down })
    }

    pub fn up(&self) -> f64 {
        self.up
    }

    pub fn down(&self) -> f64 {
        self.down
    }
}

// =============================================================================
// ExerciseProfile
// =============================================================================

/// On-disk shape of a profile, matching the reference configuration keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileDocument {
    pub name: String,
    pub landmarks: [LandmarkId; 3],
    pub up_angle: f64,
    pub down_angle: f64,
}

/// A validated exercise definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProfileDocument", into = "ProfileDocument")]
pub struct ExerciseProfile {
    name: String,
    joints: JointTriple,
    thresholds: Thresholds,
}

impl ExerciseProfile {
    pub fn new(
        name: impl Into<String>,
        joints: JointTriple,
        up_angle_deg: f64,
        down_angle_deg: f64,
    ) -> Result<Self, ProfileError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ProfileError::EmptyName);
        }

        let [proximal, vertex, distal] = joints.as_array();
        let repeated = if proximal == vertex || proximal == distal {
            Some(proximal)
        } else if vertex == distal {
            Some(vertex)
        } else {
            None
        };
        if let Some(landmark) = repeated {
            return Err(ProfileError::RepeatedLandmark { name, landmark });
        }

        let thresholds = Thresholds::new(up_angle_deg, down_angle_deg)?;
        Ok(Self {
            name,
            joints,
            thresholds,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn joints(&self) -> JointTriple {
        self.joints
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn up_angle_deg(&self) -> f64 {
        self.thresholds.up()
    }

    pub fn down_angle_deg(&self) -> f64 {
        self.thresholds.down()
    }
}

impl TryFrom<ProfileDocument> for ExerciseProfile {
    type Error = ProfileError;

    fn try_from(doc: ProfileDocument) -> Result<Self, Self::Error> {
        let [proximal, vertex, distal] = doc.landmarks;
        Self::new(
            doc.name,
            JointTriple::new(proximal, vertex, distal),
            doc.up_angle,
            doc.down_angle,
        )
    }
}

impl From<ExerciseProfile> for ProfileDocument {
    fn from(profile: ExerciseProfile) -> Self {
        Self {
            landmarks: profile.joints.as_array(),
            up_angle: profile.thresholds.up(),
            down_angle: profile.thresholds.down(),
            name: profile.name,
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

const ARM: JointTriple = JointTriple::new(
    LandmarkId::LeftShoulder,
    LandmarkId::LeftElbow,
    LandmarkId::LeftWrist,
);

const LEG: JointTriple = JointTriple::new(
    LandmarkId::LeftHip,
    LandmarkId::LeftKnee,
    LandmarkId::LeftAnkle,
);

/// Reference exercise table: (name, joints, up, down)
const BUILTIN_PROFILES: [(&str, JointTriple, f64, f64); 4] = [
    ("bicep curl", ARM, 150.0, 60.0),
    ("squats", LEG, 170.0, 90.0),
    ("push-up", ARM, 160.0, 90.0),
    ("shoulder press", ARM, 160.0, 70.0),
];

static BUILTIN: LazyLock<Arc<ProfileRegistry>> = LazyLock::new(|| {
    let mut registry = ProfileRegistry::new();
    for (name, joints, up, down) in BUILTIN_PROFILES {
        let registered =
            ExerciseProfile::new(name, joints, up, down).and_then(|p| registry.register(p));
        if let Err(e) = registered {
            warn!("Skipping builtin profile {}: {}", name, e);
        }
    }
    Arc::new(registry)
});

/// Lookup key: names match case-insensitively, ignoring surrounding space
fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Exercise name → profile table.
///
/// Build one up front, then share it behind an `Arc`; there is no removal.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, Arc<ExerciseProfile>>,
}

impl ProfileRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide table of reference exercises
    pub fn builtin() -> Arc<ProfileRegistry> {
        Arc::clone(&BUILTIN)
    }

    /// Build a registry from a JSON array of profile documents.
    pub fn from_json(json: &str) -> Result<Self, ProfileError> {
        let docs: Vec<ProfileDocument> =
            serde_json::from_str(json).map_err(|e| ProfileError::InvalidDocument(e.to_string()))?;

        let mut registry = Self::new();
        for doc in docs {
            registry.register(ExerciseProfile::try_from(doc)?)?;
        }
        debug!("Loaded {} exercise profiles from document", registry.len());
        Ok(registry)
    }

    /// Add a validated profile; names must be unique.
    pub fn register(&mut self, profile: ExerciseProfile) -> Result<(), ProfileError> {
        let key = key(profile.name());
        if self.profiles.contains_key(&key) {
            return Err(ProfileError::Duplicate(profile.name().to_string()));
        }
        self.profiles.insert(key, Arc::new(profile));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<ExerciseProfile>, ProfileError> {
        self.profiles
            .get(&key(name))
            .cloned()
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))
    }

    /// Registered exercise names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.profiles.values().map(|p| p.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ExerciseProfile>> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
