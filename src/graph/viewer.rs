//! Viewer snapshot: the dataset a Sink last published for display.
//!
//! Independent of the graph. Each Sink run replaces the snapshot wholesale
//! and bumps its version.

use crate::error::Result;
use crate::graph::id::NodeId;
use crate::types::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// What the viewer is currently showing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewerSnapshot {
    pub version: u64,
    /// Sink node that published this snapshot.
    pub published_by: Option<NodeId>,
    /// Node the sink read from, if it had one.
    pub source_node: Option<NodeId>,
    pub published_at: Option<DateTime<Utc>>,
    pub records: Vec<Record>,
}

impl ViewerSnapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Pretty JSON export of the records.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }
}

/// Shared, versioned home of the [`ViewerSnapshot`].
#[derive(Debug, Default)]
pub struct ViewerStore {
    inner: RwLock<Arc<ViewerSnapshot>>,
}

impl ViewerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<ViewerSnapshot> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Replace the snapshot. Returns the new version.
    pub fn publish(
        &self,
        published_by: NodeId,
        source_node: Option<NodeId>,
        records: Vec<Record>,
    ) -> u64 {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let version = guard.version + 1;
        *guard = Arc::new(ViewerSnapshot {
            version,
            published_by: Some(published_by),
            source_node,
            published_at: Some(Utc::now()),
            records,
        });
        version
    }
}
