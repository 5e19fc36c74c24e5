//! Graph nodes: identity, kind-specific configuration, dataset and status.
//!
//! A node's kind is derived from its [`NodeConfig`] variant, so a Limit node
//! always carries a limit and a Source node always carries its staged
//! references.

use crate::graph::id::NodeId;
use crate::graph::node_kind::NodeKind;
use crate::graph::selection::PathSelection;
use crate::types::{Position, Record, ResourceRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of records kept by a Limit node.
pub const DEFAULT_LIMIT: usize = 5;

/// Kind-specific configuration of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeConfig {
    Source {
        #[serde(default)]
        staged: Vec<ResourceRef>,
    },
    Sink,
    Merge,
    Limit {
        limit: usize,
    },
    PathFilter {
        #[serde(default)]
        selection: PathSelection,
    },
    ConditionalFilter {
        #[serde(default)]
        expression: String,
    },
    Annotate,
    Analytics,
    Splitter,
    QueryItem,
}

impl NodeConfig {
    /// Fresh configuration for a kind, using `default_limit` for Limit nodes.
    pub fn for_kind(kind: NodeKind, default_limit: usize) -> Self {
        match kind {
            NodeKind::Source => NodeConfig::Source { staged: Vec::new() },
            NodeKind::Sink => NodeConfig::Sink,
            NodeKind::Merge => NodeConfig::Merge,
            NodeKind::Limit => NodeConfig::Limit {
                limit: default_limit.max(1),
            },
            NodeKind::PathFilter => NodeConfig::PathFilter {
                selection: PathSelection::new(),
            },
            NodeKind::ConditionalFilter => NodeConfig::ConditionalFilter {
                expression: String::new(),
            },
            NodeKind::Annotate => NodeConfig::Annotate,
            NodeKind::Analytics => NodeConfig::Analytics,
            NodeKind::Splitter => NodeConfig::Splitter,
            NodeKind::QueryItem => NodeConfig::QueryItem,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeConfig::Source { .. } => NodeKind::Source,
            NodeConfig::Sink => NodeKind::Sink,
            NodeConfig::Merge => NodeKind::Merge,
            NodeConfig::Limit { .. } => NodeKind::Limit,
            NodeConfig::PathFilter { .. } => NodeKind::PathFilter,
            NodeConfig::ConditionalFilter { .. } => NodeKind::ConditionalFilter,
            NodeConfig::Annotate => NodeKind::Annotate,
            NodeConfig::Analytics => NodeKind::Analytics,
            NodeConfig::Splitter => NodeKind::Splitter,
            NodeConfig::QueryItem => NodeKind::QueryItem,
        }
    }
}

/// Run status of a node, updated by the engine around each run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NodeStatus {
    /// Never run.
    #[default]
    Idle,
    /// A run is in progress.
    Running,
    /// The last run succeeded.
    Ready { items: usize },
    /// The last run finished with a non-fatal problem.
    Warning { message: String, items: usize },
    /// The last run aborted; the dataset is whatever it was before.
    Failed { message: String },
}

impl NodeStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, NodeStatus::Running)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, NodeStatus::Failed { .. })
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::Idle => write!(f, "idle"),
            NodeStatus::Running => write!(f, "running"),
            NodeStatus::Ready { items } => write!(f, "ready ({} items)", items),
            NodeStatus::Warning { message, items } => {
                write!(f, "warning ({} items): {}", items, message)
            }
            NodeStatus::Failed { message } => write!(f, "failed: {}", message),
        }
    }
}

/// A node in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub position: Position,
    pub config: NodeConfig,
    /// Committed records. Only this node's own operator writes here.
    #[serde(default)]
    pub dataset: Vec<Record>,
    #[serde(default)]
    pub status: NodeStatus,
}

impl Node {
    pub fn new(id: NodeId, config: NodeConfig, position: Position) -> Self {
        Self {
            id,
            position,
            config,
            dataset: Vec::new(),
            status: NodeStatus::Idle,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.config.kind()
    }

    pub fn has_data(&self) -> bool {
        !self.dataset.is_empty()
    }
}
