//! Run reports: what one operator run did.

use crate::analysis::FaceReport;
use crate::annotation::CorrelationStrategy;
use crate::graph::{NodeId, NodeKind, NodeStatus};
use serde::{Deserialize, Serialize};

/// Kind-specific part of a [`RunReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "detail", rename_all = "snake_case")]
pub enum RunDetail {
    #[default]
    None,
    Viewer {
        version: u64,
    },
    PathFilter {
        /// Every discovered path, sorted.
        paths: Vec<String>,
        /// Paths that were projected.
        leaf_paths: Vec<String>,
        selected_keys: usize,
    },
    Conditional {
        /// Records whose evaluation raised an error.
        failed: usize,
        /// The pre-check against the first record failed.
        invalid_condition: bool,
        /// First error message seen, if any.
        error: Option<String>,
    },
    Annotation {
        submitted: usize,
        received: usize,
        matched: usize,
        scans: usize,
        strategy: Option<CorrelationStrategy>,
    },
    Analytics(Box<FaceReport>),
}

/// Outcome of one successful operator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub node_id: NodeId,
    pub kind: NodeKind,
    /// Output size: committed, published or analyzed records.
    pub items: usize,
    /// False when the run left the node's dataset as it was.
    pub committed: bool,
    /// Non-fatal problem worth showing to the user.
    pub warning: Option<String>,
    pub detail: RunDetail,
}

impl RunReport {
    /// A run that committed `items` records.
    pub fn committed(node_id: &NodeId, kind: NodeKind, items: usize) -> Self {
        Self {
            node_id: node_id.clone(),
            kind,
            items,
            committed: true,
            warning: None,
            detail: RunDetail::None,
        }
    }

    /// A run that did not touch the node's dataset.
    pub fn uncommitted(node_id: &NodeId, kind: NodeKind, items: usize) -> Self {
        Self {
            committed: false,
            ..Self::committed(node_id, kind, items)
        }
    }

    pub fn with_detail(mut self, detail: RunDetail) -> Self {
        self.detail = detail;
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    /// Status the node is left in after this run.
    pub fn status(&self) -> NodeStatus {
        match &self.warning {
            Some(message) => NodeStatus::Warning {
                message: message.clone(),
                items: self.items,
            },
            None => NodeStatus::Ready { items: self.items },
        }
    }
}
