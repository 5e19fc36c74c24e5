//! Annotation records as returned by the retrieval boundary.
//!
//! The labeling service writes rows into a NoSQL table, so a record may
//! arrive either as a plain JSON object or as a typed attribute map
//! (`{"Emotion": {"S": "HAPPY"}, "EmotionConfidence": {"N": "97.1"}}`).
//! [`AnnotationRecord::from_json`] accepts both.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

/// Field names on the wire, with the plain aliases also accepted.
pub mod fields {
    pub const TIMESTAMP: &[&str] = &["Timestamp", "timestamp"];
    pub const LABEL: &[&str] = &["Emotion", "label"];
    pub const CONFIDENCE: &[&str] = &["EmotionConfidence", "confidence"];
    pub const ANALYSIS: &[&str] = &["RekognitionRaw", "analysis"];
    pub const CAPTURE_DATE: &[&str] = &["date", "capture_date"];
    pub const CORRELATION_ID: &[&str] = &["CorrelationId", "correlation_id", "correlationId"];
}

/// One externally produced annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    /// Raw timestamp as stored (string or epoch-millis number).
    pub timestamp: Option<Value>,
    pub label: Option<String>,
    /// Raw confidence as stored (string or number).
    pub confidence: Option<Value>,
    /// Analyzer payload; usually a JSON-encoded string.
    pub analysis: Option<Value>,
    pub capture_date: Option<String>,
    /// Batch correlation id, when the service echoes it.
    pub correlation_id: Option<String>,
}

impl AnnotationRecord {
    /// Build from a plain or attribute-typed JSON object. Non-objects yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        let item = unwrap_attributes(value.as_object()?);
        Some(Self {
            timestamp: first_of(&item, fields::TIMESTAMP).cloned(),
            label: first_of(&item, fields::LABEL).and_then(value_to_string),
            confidence: first_of(&item, fields::CONFIDENCE).cloned(),
            analysis: first_of(&item, fields::ANALYSIS).cloned(),
            capture_date: first_of(&item, fields::CAPTURE_DATE).and_then(value_to_string),
            correlation_id: first_of(&item, fields::CORRELATION_ID).and_then(value_to_string),
        })
    }

    /// Parsed timestamp, or `None` if missing or unparseable.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        match self.timestamp.as_ref()? {
            Value::String(s) => parse_timestamp(s),
            Value::Number(n) => n.as_f64().and_then(from_epoch_millis),
            _ => None,
        }
    }

    /// Analyzer payload as a document. Unparseable or missing payloads
    /// become an empty object.
    pub fn parsed_analysis(&self) -> Value {
        match &self.analysis {
            Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
                Ok(v) => v,
                Err(e) => {
                    tracing::debug!("Unparseable analysis payload: {}", e);
                    Value::Object(Map::new())
                }
            },
            Some(v @ Value::Object(_)) => v.clone(),
            _ => Value::Object(Map::new()),
        }
    }
}

/// Unwrap NoSQL typed attributes (`S`, `N`, `BOOL`). Other values pass through.
pub fn unwrap_attributes(item: &Map<String, Value>) -> Map<String, Value> {
    item.iter()
        .map(|(key, value)| (key.clone(), unwrap_attribute(value)))
        .collect()
}

fn unwrap_attribute(value: &Value) -> Value {
    let Some(map) = value.as_object() else {
        return value.clone();
    };
    if let Some(s) = map.get("S") {
        return s.clone();
    }
    if let Some(n) = map.get("N") {
        return match n {
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            other => other.clone(),
        };
    }
    if let Some(b) = map.get("BOOL") {
        return b.clone();
    }
    value.clone()
}

fn first_of<'a>(item: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| item.get(*k))
        .find(|v| !v.is_null())
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse the timestamp formats the labeling service is known to write:
/// RFC 3339, naive ISO date-times (taken as UTC), plain dates and epoch
/// milliseconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
    }
    raw.parse::<f64>().ok().and_then(from_epoch_millis)
}

fn from_epoch_millis(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(ms as i64)
}
