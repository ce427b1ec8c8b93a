//! Parser for recorded landmark streams.
//!
//! Recordings are JSON Lines, one frame per line. Two shapes are accepted:
//! - named: `{"landmarks": {"left_elbow": {"x": 0.5, "y": 0.4, "visibility": 0.9}, ...}}`
//! - indexed: `{"landmarks": [{"x": ..., "y": ...}, ...]}` with exactly 33
//!   entries in estimator order
//!
//! Blank lines and lines starting with `#` are skipped. Lines are decoded in
//! parallel with Rayon; output keeps file order.

use crate::error::{PoseDataError, Result};
use crate::types::{Landmark, LandmarkId, LandmarkSet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, instrument};

#[derive(Debug, Deserialize)]
struct FrameRecord {
    landmarks: RecordedLandmarks,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordedLandmarks {
    Named(BTreeMap<String, Landmark>),
    Indexed(Vec<Landmark>),
}

#[derive(Serialize)]
struct FrameRecordRef<'a> {
    landmarks: &'a LandmarkSet,
}

fn validate(id: LandmarkId, landmark: Landmark) -> Result<(LandmarkId, Landmark)> {
    if !landmark.point.is_finite() {
        return Err(PoseDataError::InvalidValue {
            field: format!("{}.position", id),
            value: format!("({}, {})", landmark.point.x, landmark.point.y),
        });
    }
    if let Some(visibility) = landmark.visibility {
        if !(0.0..=1.0).contains(&visibility) {
            return Err(PoseDataError::InvalidValue {
                field: format!("{}.visibility", id),
                value: visibility.to_string(),
            });
        }
    }
    Ok((id, landmark))
}

/// Parse a single JSON frame into a [`LandmarkSet`].
pub fn parse_frame(line: &str) -> Result<LandmarkSet> {
    let record: FrameRecord = serde_json::from_str(line)?;

    match record.landmarks {
        RecordedLandmarks::Named(named) => named
            .into_iter()
            .map(|(name, landmark)| validate(name.parse()?, landmark))
            .collect(),
        RecordedLandmarks::Indexed(indexed) => {
            if indexed.len() != LandmarkId::COUNT {
                return Err(PoseDataError::LandmarkCountMismatch {
                    expected: LandmarkId::COUNT,
                    found: indexed.len(),
                });
            }
            LandmarkId::ALL
                .into_iter()
                .zip(indexed)
                .map(|(id, landmark)| validate(id, landmark))
                .collect()
        }
    }
}

/// Parse every frame in a JSON Lines document.
///
/// `source` only labels errors (usually the file name).
pub fn parse_frames(content: &str, source: &str) -> Result<Vec<LandmarkSet>> {
    let lines: Vec<&str> = content.lines().collect();

    lines
        .par_iter()
        .enumerate()
        .filter_map(|(idx, line)| {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return None;
            }
            Some(parse_frame(trimmed).map_err(|e| PoseDataError::ParseError {
                file: source.to_string(),
                line: idx + 1,
                reason: e.to_string(),
            }))
        })
        .collect()
}

/// Load a recorded frame stream from disk.
#[instrument(fields(path = %path.display()))]
pub fn load_frames(path: &Path) -> Result<Vec<LandmarkSet>> {
    if !path.exists() {
        return Err(PoseDataError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let content = fs::read_to_string(path)?;
    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let frames = parse_frames(&content, &source)?;
    debug!("Loaded {} frames from {}", frames.len(), source);
    Ok(frames)
}

/// Encode a frame in the named line format understood by [`parse_frame`].
pub fn to_frame_line(frame: &LandmarkSet) -> serde_json::Result<String> {
    serde_json::to_string(&FrameRecordRef { landmarks: frame })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point2D;

    #[test]
    fn test_parse_named_frame() {
        let line = r#"{"landmarks": {"left_shoulder": {"x": 0.5, "y": 0.2},
            "left_elbow": {"x": 0.5, "y": 0.4, "visibility": 0.95}}}"#;
        let frame = parse_frame(line).unwrap();

        assert_eq!(frame.len(), 2);
        let elbow = frame.get(LandmarkId::LeftElbow).unwrap();
        assert_eq!(elbow.point, Point2D::new(0.5, 0.4));
        assert_eq!(elbow.visibility, Some(0.95));
        assert_eq!(frame.get(LandmarkId::LeftShoulder).unwrap().visibility, None);
    }

    #[test]
    fn test_parse_indexed_frame() {
        let entries: Vec<String> = (0..LandmarkId::COUNT)
            .map(|i| format!(r#"{{"x": {}, "y": 0.5, "visibility": 1.0}}"#, i as f64 / 100.0))
            .collect();
        let line = format!(r#"{{"landmarks": [{}]}}"#, entries.join(","));

        let frame = parse_frame(&line).unwrap();
        assert_eq!(frame.len(), LandmarkId::COUNT);
        let wrist = frame.get(LandmarkId::LeftWrist).unwrap();
        assert!((wrist.point.x - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_indexed_frame_wrong_length() {
        let line = r#"{"landmarks": [{"x": 0.1, "y": 0.1}]}"#;
        let err = parse_frame(line).unwrap_err();
        assert!(matches!(
            err,
            PoseDataError::LandmarkCountMismatch { expected: 33, found: 1 }
        ));
    }

    #[test]
    fn test_unknown_landmark_name() {
        let line = r#"{"landmarks": {"left_tail": {"x": 0.1, "y": 0.1}}}"#;
        assert!(matches!(
            parse_frame(line),
            Err(PoseDataError::UnknownLandmark(name)) if name == "left_tail"
        ));
    }

    #[test]
    fn test_visibility_out_of_range() {
        let line = r#"{"landmarks": {"nose": {"x": 0.1, "y": 0.1, "visibility": 1.5}}}"#;
        assert!(matches!(parse_frame(line), Err(PoseDataError::InvalidValue { .. })));
    }

    #[test]
    fn test_malformed_json_is_not_a_bad_value() {
        assert!(matches!(parse_frame("not json"), Err(PoseDataError::Json(_))));
        assert!(matches!(
            parse_frame(r#"{"frame": 3}"#),
            Err(PoseDataError::Json(_))
        ));
        assert!(matches!(
            parse_frame(r#"{"landmarks": {"nose": {"x": 0.1}}}"#),
            Err(PoseDataError::Json(_))
        ));
    }

    #[test]
    fn test_parse_frames_skips_comments_and_reports_line() {
        let content = "# recorded at 30fps\n\
            {\"landmarks\": {\"nose\": {\"x\": 0.5, \"y\": 0.1}}}\n\
            \n\
            {\"landmarks\": {\"nose\": {\"x\": 0.5, \"y\": 0.2}}}\n";
        let frames = parse_frames(content, "curl.jsonl").unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].get(LandmarkId::Nose).unwrap().point.y, 0.2);

        let broken = "{\"landmarks\": {\"nose\": {\"x\": 0.5, \"y\": 0.1}}}\nnot json\n";
        match parse_frames(broken, "broken.jsonl") {
            Err(PoseDataError::ParseError { file, line, .. }) => {
                assert_eq!(file, "broken.jsonl");
                assert_eq!(line, 2);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_frame_line_is_parseable() {
        let frame = LandmarkSet::builder()
            .point(LandmarkId::LeftHip, 0.4, 0.5)
            .landmark(
                LandmarkId::LeftKnee,
                Landmark::new(0.42, 0.7).with_visibility(0.8),
            )
            .build();

        let line = to_frame_line(&frame).unwrap();
        assert!(line.contains("left_knee"));
        assert_eq!(parse_frame(&line).unwrap(), frame);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_frames(Path::new("does/not/exist.jsonl")).unwrap_err();
        assert!(matches!(err, PoseDataError::FileNotFound { .. }));
    }
}
