//! Aggregates over annotated face records.
//!
//! Every record is read defensively. The label, confidence and timestamp
//! come from the annotation metadata (`label`, `confidence`, `timestamp`,
//! or their wire names), and the face attributes come from the first entry
//! of `analysis.FaceDetails`. A record without a face detail only counts
//! towards [`FaceReport::total_records`]. Any attribute that is missing or
//! not numeric is left out of its aggregate instead of counting as zero.

use crate::annotation::record::{fields, parse_timestamp};
use crate::types::{Metadata, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Only this many per-record emotion breakdowns are kept.
pub const MAX_EMOTION_BREAKDOWNS: usize = 10;

/// Yaw below this magnitude (degrees) counts as a frontal pose.
pub const FRONTAL_YAW_DEGREES: f64 = 10.0;

// ==================== Report types ====================

/// A named count, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Count {
    pub name: String,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeEntry {
    /// Position of the record in the dataset.
    pub position: usize,
    pub low: f64,
    pub high: f64,
    pub avg: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityEntry {
    pub position: usize,
    pub brightness: i64,
    pub sharpness: i64,
    pub overall: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelConfidence {
    pub position: usize,
    pub label: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedConfidence {
    pub position: usize,
    /// `None` when the timestamp does not parse.
    pub time: Option<DateTime<Utc>>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedLabel {
    pub position: usize,
    pub time: Option<DateTime<Utc>>,
    pub label: String,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureCounts {
    pub smile: usize,
    pub beard: usize,
    pub mustache: usize,
}

/// Confidence of each detected feature; `0` when detected as absent,
/// `None` when the analyzer did not report it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDetail {
    pub position: usize,
    pub smile: Option<f64>,
    pub beard: Option<f64>,
    pub mustache: Option<f64>,
    pub eyes_open: Option<f64>,
    pub mouth_open: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoseCategory {
    Front,
    Right,
    Left,
}

impl PoseCategory {
    pub fn from_yaw(yaw: f64) -> Self {
        if yaw.abs() < FRONTAL_YAW_DEGREES {
            PoseCategory::Front
        } else if yaw > 0.0 {
            PoseCategory::Right
        } else {
            PoseCategory::Left
        }
    }
}

impl fmt::Display for PoseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoseCategory::Front => write!(f, "Front"),
            PoseCategory::Right => write!(f, "Right"),
            PoseCategory::Left => write!(f, "Left"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseEntry {
    pub position: usize,
    pub roll: i64,
    pub pitch: i64,
    pub yaw: i64,
    pub category: PoseCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EyeDirectionEntry {
    pub position: usize,
    pub yaw: i64,
    pub pitch: i64,
    pub confidence: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkEntry {
    pub position: usize,
    pub eye_distance: f64,
    pub mouth_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionBreakdown {
    pub position: usize,
    /// Lower-cased emotion type to rounded confidence.
    pub scores: BTreeMap<String, i64>,
}

/// Everything the Analytics node shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceReport {
    pub label_distribution: Vec<Count>,
    pub gender_distribution: Vec<Count>,
    pub ages: Vec<AgeEntry>,
    pub age_distribution: Vec<Count>,
    pub quality: Vec<QualityEntry>,
    pub label_confidence: Vec<LabelConfidence>,
    pub confidence_series: Vec<TimedConfidence>,
    pub label_timeline: Vec<TimedLabel>,
    pub facial_features: FeatureCounts,
    pub feature_details: Vec<FeatureDetail>,
    pub poses: Vec<PoseEntry>,
    pub pose_distribution: Vec<Count>,
    pub eye_directions: Vec<EyeDirectionEntry>,
    pub landmarks: Vec<LandmarkEntry>,
    pub emotion_breakdown: Vec<EmotionBreakdown>,
    /// Distinct labels, in first-seen order.
    pub labels: Vec<String>,
    pub total_records: usize,
}

impl FaceReport {
    /// Records that carried a face detail.
    pub fn faces(&self) -> usize {
        self.feature_details.len()
    }
}

// ==================== Aggregation ====================

/// Aggregate a dataset.
pub fn analyze(records: &[Record]) -> FaceReport {
    let mut report = FaceReport {
        total_records: records.len(),
        ..FaceReport::default()
    };

    for (position, record) in records.iter().enumerate() {
        let meta = &record.metadata;
        let analysis = analysis_document(meta);
        let Some(face) = analysis
            .as_ref()
            .and_then(|a| a.get("FaceDetails"))
            .and_then(|d| d.get(0))
        else {
            continue;
        };

        let label = lookup(meta, fields::LABEL).and_then(Value::as_str);
        let confidence = lookup(meta, fields::CONFIDENCE).and_then(parse_number);
        let time = lookup(meta, fields::TIMESTAMP).and_then(timestamp_of);
        let has_timestamp = lookup(meta, fields::TIMESTAMP).is_some();

        if let Some(label) = label {
            tally(&mut report.label_distribution, label);
            report.label_timeline.push(TimedLabel {
                position,
                time,
                label: label.to_string(),
                confidence,
            });
            if let Some(emotions) = face.get("Emotions").and_then(Value::as_array) {
                if report.emotion_breakdown.len() < MAX_EMOTION_BREAKDOWNS {
                    report.emotion_breakdown.push(EmotionBreakdown {
                        position,
                        scores: emotion_scores(emotions),
                    });
                }
            }
            if let Some(confidence) = confidence {
                report.label_confidence.push(LabelConfidence {
                    position,
                    label: label.to_string(),
                    confidence,
                });
            }
        }

        if let Some(confidence) = confidence.filter(|_| has_timestamp) {
            report.confidence_series.push(TimedConfidence {
                position,
                time,
                confidence,
            });
        }

        if let Some(gender) = face.pointer("/Gender/Value").and_then(Value::as_str) {
            tally(&mut report.gender_distribution, gender);
        }

        if let (Some(low), Some(high)) = (number_at(face, "/AgeRange/Low"), number_at(face, "/AgeRange/High")) {
            let avg = js_round((low + high) / 2.0);
            let decade = avg.div_euclid(10) * 10;
            tally(&mut report.age_distribution, &format!("{}-{}", decade, decade + 9));
            report.ages.push(AgeEntry {
                position,
                low,
                high,
                avg,
            });
        }

        if let (Some(brightness), Some(sharpness)) = (
            number_at(face, "/Quality/Brightness"),
            number_at(face, "/Quality/Sharpness"),
        ) {
            report.quality.push(QualityEntry {
                position,
                brightness: js_round(brightness),
                sharpness: js_round(sharpness),
                overall: js_round((brightness + sharpness) / 2.0),
            });
        }

        let detected = |name: &str| face.get(name).and_then(|f| f.get("Value")).and_then(Value::as_bool);
        if detected("Smile") == Some(true) {
            report.facial_features.smile += 1;
        }
        if detected("Beard") == Some(true) {
            report.facial_features.beard += 1;
        }
        if detected("Mustache") == Some(true) {
            report.facial_features.mustache += 1;
        }
        report.feature_details.push(FeatureDetail {
            position,
            smile: feature_confidence(face, "Smile"),
            beard: feature_confidence(face, "Beard"),
            mustache: feature_confidence(face, "Mustache"),
            eyes_open: feature_confidence(face, "EyesOpen"),
            mouth_open: feature_confidence(face, "MouthOpen"),
        });

        if let (Some(roll), Some(pitch), Some(yaw)) = (
            number_at(face, "/Pose/Roll"),
            number_at(face, "/Pose/Pitch"),
            number_at(face, "/Pose/Yaw"),
        ) {
            let category = PoseCategory::from_yaw(yaw);
            tally(&mut report.pose_distribution, &category.to_string());
            report.poses.push(PoseEntry {
                position,
                roll: js_round(roll),
                pitch: js_round(pitch),
                yaw: js_round(yaw),
                category,
            });
        }

        if let Some(landmarks) = face.get("Landmarks").and_then(Value::as_array) {
            if let Some(entry) = landmark_geometry(position, landmarks) {
                report.landmarks.push(entry);
            }
        }

        if let (Some(yaw), Some(pitch), Some(confidence)) = (
            number_at(face, "/EyeDirection/Yaw"),
            number_at(face, "/EyeDirection/Pitch"),
            number_at(face, "/EyeDirection/Confidence"),
        ) {
            report.eye_directions.push(EyeDirectionEntry {
                position,
                yaw: js_round(yaw),
                pitch: js_round(pitch),
                confidence: js_round(confidence),
            });
        }
    }

    report.labels = report
        .label_distribution
        .iter()
        .map(|c| c.name.clone())
        .collect();
    report
}

// ==================== Field access ====================

fn lookup<'a>(meta: &'a Metadata, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .rev()
        .filter_map(|k| meta.get(*k))
        .find(|v| !v.is_null())
}

/// The analyzer document, parsed if it is still a JSON string.
fn analysis_document(meta: &Metadata) -> Option<Value> {
    match lookup(meta, fields::ANALYSIS)? {
        Value::String(s) => serde_json::from_str(s).ok(),
        other => Some(other.clone()),
    }
}

fn timestamp_of(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(chrono::DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Numbers, or strings holding a number.
fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn number_at(face: &Value, pointer: &str) -> Option<f64> {
    face.pointer(pointer).and_then(Value::as_f64)
}

fn feature_confidence(face: &Value, name: &str) -> Option<f64> {
    let feature = face.get(name)?;
    match feature.get("Value").and_then(Value::as_bool)? {
        true => feature.get("Confidence").and_then(Value::as_f64),
        false => Some(0.0),
    }
}

fn emotion_scores(emotions: &[Value]) -> BTreeMap<String, i64> {
    emotions
        .iter()
        .filter_map(|e| {
            let kind = e.get("Type")?.as_str()?;
            let confidence = e.get("Confidence")?.as_f64()?;
            Some((kind.to_lowercase(), js_round(confidence)))
        })
        .collect()
}

fn landmark_geometry(position: usize, landmarks: &[Value]) -> Option<LandmarkEntry> {
    let point = |kind: &str| {
        landmarks
            .iter()
            .find(|l| l.get("Type").and_then(Value::as_str) == Some(kind))
            .and_then(|l| Some((l.get("X")?.as_f64()?, l.get("Y")?.as_f64()?)))
    };
    let distance = |a: (f64, f64), b: (f64, f64)| (a.0 - b.0).hypot(a.1 - b.1);

    Some(LandmarkEntry {
        position,
        eye_distance: distance(point("eyeLeft")?, point("eyeRight")?),
        mouth_width: distance(point("mouthLeft")?, point("mouthRight")?),
    })
}

fn tally(counts: &mut Vec<Count>, name: &str) {
    match counts.iter_mut().find(|c| c.name == name) {
        Some(count) => count.value += 1,
        None => counts.push(Count {
            name: name.to_string(),
            value: 1,
        }),
    }
}

/// Round half up, the way chart values were rounded for display.
fn js_round(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn face_record(label: &str, face: Value) -> Record {
        let meta = json!({
            "label": label,
            "confidence": "91.5",
            "timestamp": "2024-05-01T10:30:00Z",
            "analysis": {"FaceDetails": [face]},
        });
        Record::with_metadata("img.jpg", meta.as_object().cloned().unwrap_or_default())
    }

    fn full_face() -> Value {
        json!({
            "Gender": {"Value": "Female"},
            "AgeRange": {"Low": 24, "High": 31},
            "Quality": {"Brightness": 80.4, "Sharpness": 60.6},
            "Smile": {"Value": true, "Confidence": 97.0},
            "Beard": {"Value": false, "Confidence": 88.0},
            "Pose": {"Roll": 1.2, "Pitch": -3.7, "Yaw": -25.5},
            "EyeDirection": {"Yaw": 2.4, "Pitch": -1.6, "Confidence": 99.2},
            "Emotions": [{"Type": "HAPPY", "Confidence": 97.4}, {"Type": "CALM", "Confidence": 1.2}],
            "Landmarks": [
                {"Type": "eyeLeft", "X": 0.0, "Y": 0.0},
                {"Type": "eyeRight", "X": 3.0, "Y": 4.0},
                {"Type": "mouthLeft", "X": 1.0, "Y": 1.0},
                {"Type": "mouthRight", "X": 2.0, "Y": 1.0}
            ]
        })
    }

    #[test]
    fn test_full_face_fills_every_aggregate() {
        let report = analyze(&[face_record("HAPPY", full_face())]);

        assert_eq!(report.total_records, 1);
        assert_eq!(report.label_distribution, vec![Count { name: "HAPPY".into(), value: 1 }]);
        assert_eq!(report.gender_distribution[0].name, "Female");
        assert_eq!(report.ages[0].avg, 28);
        assert_eq!(report.age_distribution[0].name, "20-29");
        assert_eq!(report.quality[0].overall, 71);
        assert_eq!(report.facial_features, FeatureCounts { smile: 1, beard: 0, mustache: 0 });
        assert_eq!(report.feature_details[0].smile, Some(97.0));
        assert_eq!(report.feature_details[0].beard, Some(0.0));
        assert_eq!(report.feature_details[0].mustache, None);
        assert_eq!(report.poses[0].category, PoseCategory::Left);
        assert_eq!(report.pose_distribution[0].name, "Left");
        assert_eq!(report.eye_directions[0].confidence, 99);
        assert_eq!(report.landmarks[0].eye_distance, 5.0);
        assert_eq!(report.landmarks[0].mouth_width, 1.0);
        assert_eq!(report.emotion_breakdown[0].scores["happy"], 97);
        assert_eq!(report.label_confidence[0].confidence, 91.5);
        assert!(report.confidence_series[0].time.is_some());
        assert_eq!(report.labels, vec!["HAPPY".to_string()]);
    }

    #[test]
    fn test_missing_fields_are_absent_not_zero() {
        let sparse = face_record("SAD", json!({"Pose": {"Yaw": 4.0}}));
        let report = analyze(&[sparse]);

        assert!(report.ages.is_empty());
        assert!(report.quality.is_empty());
        assert!(report.gender_distribution.is_empty());
        // Roll and Pitch are missing
        assert!(report.poses.is_empty());
        assert!(report.landmarks.is_empty());
        assert_eq!(report.feature_details[0].smile, None);
        assert_eq!(report.label_distribution[0].name, "SAD");
    }

    #[test]
    fn test_records_without_faces_only_count_in_total() {
        let placeholder = Record::with_metadata(
            "x.jpg",
            json!({"label": "Unknown", "confidence": "0", "analysis": {}})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        );
        let bare = Record::new("y.jpg");
        let report = analyze(&[placeholder, bare, face_record("ANGRY", full_face())]);

        assert_eq!(report.total_records, 3);
        assert_eq!(report.faces(), 1);
        assert_eq!(report.labels, vec!["ANGRY".to_string()]);
        assert_eq!(report.poses[0].position, 2);
    }

    #[test]
    fn test_wire_field_names_and_string_analysis() {
        let raw = json!({"FaceDetails": [{"Gender": {"Value": "Male"}}]}).to_string();
        let meta = json!({"Emotion": "CALM", "EmotionConfidence": 70, "RekognitionRaw": raw});
        let record = Record::with_metadata("z.jpg", meta.as_object().cloned().unwrap_or_default());

        let report = analyze(&[record]);
        assert_eq!(report.labels, vec!["CALM".to_string()]);
        assert_eq!(report.gender_distribution[0].name, "Male");
        // confidence without a timestamp
        assert!(report.confidence_series.is_empty());
        assert_eq!(report.label_confidence.len(), 1);
    }

    #[test]
    fn test_breakdowns_are_capped() {
        let records: Vec<_> = (0..12).map(|_| face_record("HAPPY", full_face())).collect();
        let report = analyze(&records);
        assert_eq!(report.emotion_breakdown.len(), MAX_EMOTION_BREAKDOWNS);
        assert_eq!(report.label_distribution[0].value, 12);
    }

    #[test]
    fn test_pose_categories() {
        assert_eq!(PoseCategory::from_yaw(9.9), PoseCategory::Front);
        assert_eq!(PoseCategory::from_yaw(-9.9), PoseCategory::Front);
        assert_eq!(PoseCategory::from_yaw(10.0), PoseCategory::Right);
        assert_eq!(PoseCategory::from_yaw(-10.0), PoseCategory::Left);
    }

    #[test]
    fn test_js_round() {
        assert_eq!(js_round(2.5), 3);
        assert_eq!(js_round(-2.5), -2);
        assert_eq!(js_round(-3.7), -4);
    }
}
