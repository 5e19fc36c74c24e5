//! Core data types for visionflow
//!
//! This module contains the fundamental data structures that flow between
//! nodes: image references, records and the inputs accepted by the dataset
//! writer.
//!
//! # Main Types
//!
//! - [`ResourceRef`] - Reference to an image (URI, file path, `data:` URL or blob handle)
//! - [`Record`] - One dataset element: id, resource and a metadata document
//! - [`DatasetInput`] - What a commit accepts: bare references or full records
//! - [`CommitMode`] - Replace (`set`) or concatenate (`append`)
//!
//! # Ownership
//!
//! Datasets are owned by exactly one node. Whenever records cross from one
//! node to another they are re-keyed with [`Record::rekeyed`], which also
//! deep-copies the metadata document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Arbitrary nested key/value metadata attached to a record.
pub type Metadata = Map<String, Value>;

/// Generate a fresh opaque record identifier.
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Reference to an image.
///
/// The reference is kept verbatim; interpretation (data URL, file path,
/// remote URL) happens only when the annotation pipeline materializes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceRef(pub String);

impl ResourceRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for inline `data:` URLs.
    pub fn is_data_url(&self) -> bool {
        self.0.starts_with("data:")
    }

    /// True for opaque in-browser `blob:` handles, which cannot be resolved here.
    pub fn is_blob_handle(&self) -> bool {
        self.0.starts_with("blob:")
    }

    /// True for `http://` and `https://` URLs.
    pub fn is_remote(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // data URLs can be megabytes long
        if self.is_data_url() && self.0.len() > 48 {
            write!(f, "{}...", &self.0[..self.0.char_indices().nth(40).map_or(0, |(i, _)| i)])
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for ResourceRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ResourceRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One dataset element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Opaque identifier, unique within the owning dataset.
    pub id: String,
    /// The image this record describes.
    pub resource: ResourceRef,
    /// Arbitrary metadata document (never absent, possibly empty).
    #[serde(default, deserialize_with = "deserialize_metadata")]
    pub metadata: Metadata,
}

impl Record {
    /// Create a record with a fresh id and empty metadata.
    pub fn new(resource: impl Into<ResourceRef>) -> Self {
        Self {
            id: new_record_id(),
            resource: resource.into(),
            metadata: Metadata::new(),
        }
    }

    /// Create a record with a fresh id and the given metadata.
    pub fn with_metadata(resource: impl Into<ResourceRef>, metadata: Metadata) -> Self {
        Self {
            id: new_record_id(),
            resource: resource.into(),
            metadata,
        }
    }

    /// Copy this record for another dataset: fresh id, same resource,
    /// deep-copied metadata.
    pub fn rekeyed(&self) -> Self {
        Self {
            id: new_record_id(),
            resource: self.resource.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Metadata as a JSON object value (used as the expression binding).
    pub fn metadata_value(&self) -> Value {
        Value::Object(self.metadata.clone())
    }

    /// True when `resource` and `metadata` match, ignoring ids.
    pub fn same_content(&self, other: &Record) -> bool {
        self.resource == other.resource && self.metadata == other.metadata
    }
}

/// `null` or non-object metadata normalizes to an empty document.
fn deserialize_metadata<'de, D>(deserializer: D) -> std::result::Result<Metadata, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Object(map)) => map,
        _ => Metadata::new(),
    })
}

/// Input accepted by the dataset writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "items", rename_all = "snake_case")]
pub enum DatasetInput {
    /// Bare references, normalized into fresh records with empty metadata.
    References(Vec<ResourceRef>),
    /// Pre-built records, committed as given (duplicate ids are re-keyed).
    Records(Vec<Record>),
}

impl DatasetInput {
    pub fn len(&self) -> usize {
        match self {
            DatasetInput::References(refs) => refs.len(),
            DatasetInput::Records(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Normalize into canonical records.
    pub fn into_records(self) -> Vec<Record> {
        match self {
            DatasetInput::References(refs) => refs.into_iter().map(Record::new).collect(),
            DatasetInput::Records(records) => records,
        }
    }
}

impl From<Vec<Record>> for DatasetInput {
    fn from(records: Vec<Record>) -> Self {
        DatasetInput::Records(records)
    }
}

impl From<Vec<ResourceRef>> for DatasetInput {
    fn from(refs: Vec<ResourceRef>) -> Self {
        DatasetInput::References(refs)
    }
}

/// How a commit combines with the existing dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// Replace the dataset entirely
    #[default]
    Set,
    /// Concatenate after the existing records
    Append,
}

impl fmt::Display for CommitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitMode::Set => write!(f, "set"),
            CommitMode::Append => write!(f, "append"),
        }
    }
}

/// Layout coordinate of a node on the canvas. Carries no semantics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
