//! Re-attaching retrieved annotations to the submitted images.
//!
//! Two strategies:
//!
//! - **Correlation id**: when the service echoes the ids sent with the
//!   batch, each image takes the newest annotation carrying its id.
//! - **Position**: otherwise the newest N annotations (by timestamp) are
//!   put back in ascending order and zipped 1:1 with the images. This
//!   assumes nobody else wrote to the table in the meantime.
//!
//! Images without a match get [`placeholder_metadata`].

use crate::annotation::record::AnnotationRecord;
use crate::types::{Metadata, Record, ResourceRef};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// How annotations were matched to images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrategy {
    CorrelationId,
    Position,
}

impl fmt::Display for CorrelationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationStrategy::CorrelationId => write!(f, "correlation id"),
            CorrelationStrategy::Position => write!(f, "position"),
        }
    }
}

/// Output of [`correlate`]: one record per submitted image, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Correlation {
    pub records: Vec<Record>,
    /// Images that received a real annotation.
    pub matched: usize,
    pub strategy: CorrelationStrategy,
}

/// Keep records with a parseable timestamp, take the newest `n`, and return
/// them oldest first.
pub fn select_latest(records: Vec<AnnotationRecord>, n: usize) -> Vec<AnnotationRecord> {
    let mut dated: Vec<_> = records
        .into_iter()
        .filter_map(|r| r.parsed_timestamp().map(|t| (t, r)))
        .collect();
    dated.sort_by(|a, b| b.0.cmp(&a.0));
    dated.truncate(n);
    dated.reverse();
    dated.into_iter().map(|(_, r)| r).collect()
}

/// Metadata attached for a matched annotation.
pub fn annotation_metadata(record: &AnnotationRecord, correlation_id: Option<&str>) -> Metadata {
    let mut meta = Metadata::new();
    meta.insert(
        "label".into(),
        Value::String(record.label.clone().unwrap_or_else(|| "Unknown".into())),
    );
    meta.insert(
        "confidence".into(),
        record.confidence.clone().unwrap_or_else(|| json!("0")),
    );
    meta.insert("analysis".into(), record.parsed_analysis());
    meta.insert(
        "capture_date".into(),
        Value::String(record.capture_date.clone().unwrap_or_else(|| "N/A".into())),
    );
    meta.insert(
        "timestamp".into(),
        record.timestamp.clone().unwrap_or_else(|| json!("N/A")),
    );
    if let Some(id) = correlation_id {
        meta.insert("correlation_id".into(), Value::String(id.to_string()));
    }
    meta
}

/// Metadata attached when an image has no annotation.
pub fn placeholder_metadata() -> Metadata {
    let mut meta = Metadata::new();
    meta.insert("label".into(), json!("Unknown"));
    meta.insert("confidence".into(), json!("0"));
    meta.insert("analysis".into(), json!({}));
    meta.insert("capture_date".into(), json!("N/A"));
    meta.insert("timestamp".into(), json!("N/A"));
    meta
}

/// Match retrieved annotations to `resources` (submitted with
/// `correlation_ids`, same order and length).
pub fn correlate(
    resources: &[ResourceRef],
    correlation_ids: &[String],
    retrieved: Vec<AnnotationRecord>,
) -> Correlation {
    let submitted: HashSet<&str> = correlation_ids.iter().map(String::as_str).collect();
    let echoes = retrieved
        .iter()
        .any(|r| r.correlation_id.as_deref().is_some_and(|id| submitted.contains(id)));

    if echoes {
        by_correlation_id(resources, correlation_ids, retrieved)
    } else {
        by_position(resources, retrieved)
    }
}

fn by_correlation_id(
    resources: &[ResourceRef],
    correlation_ids: &[String],
    retrieved: Vec<AnnotationRecord>,
) -> Correlation {
    // newest annotation per id; undated rows lose against dated ones
    let mut newest: HashMap<String, AnnotationRecord> = HashMap::new();
    for record in retrieved {
        let Some(id) = record.correlation_id.clone() else {
            continue;
        };
        let replace = match newest.get(&id) {
            None => true,
            Some(existing) => record.parsed_timestamp() > existing.parsed_timestamp(),
        };
        if replace {
            newest.insert(id, record);
        }
    }

    let mut matched = 0;
    let records = resources
        .iter()
        .enumerate()
        .map(|(i, resource)| {
            let id = correlation_ids.get(i).map(String::as_str);
            let meta = match id.and_then(|id| newest.get(id)) {
                Some(annotation) => {
                    matched += 1;
                    annotation_metadata(annotation, id)
                }
                None => placeholder_metadata(),
            };
            Record::with_metadata(resource.clone(), meta)
        })
        .collect();

    Correlation {
        records,
        matched,
        strategy: CorrelationStrategy::CorrelationId,
    }
}

fn by_position(resources: &[ResourceRef], retrieved: Vec<AnnotationRecord>) -> Correlation {
    let latest = select_latest(retrieved, resources.len());
    let matched = latest.len().min(resources.len());
    let records = resources
        .iter()
        .enumerate()
        .map(|(i, resource)| {
            let meta = match latest.get(i) {
                Some(annotation) => annotation_metadata(annotation, None),
                None => placeholder_metadata(),
            };
            Record::with_metadata(resource.clone(), meta)
        })
        .collect();

    Correlation {
        records,
        matched,
        strategy: CorrelationStrategy::Position,
    }
}
