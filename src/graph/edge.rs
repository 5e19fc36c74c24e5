//! Directed connections between nodes. Edges carry no data.

use crate::graph::id::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};

/// A directed edge `source → target`, optionally landing on a named input
/// handle of the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, rename = "targetHandle", skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default)]
    pub label: String,
}

impl Edge {
    pub fn new(source: NodeId, target: NodeId, target_handle: Option<String>) -> Self {
        Self {
            id: EdgeId::generate(&source, &target),
            source,
            target,
            target_handle,
            label: String::new(),
        }
    }

    /// True if this edge terminates at `(target, handle)`.
    pub fn lands_on(&self, target: &NodeId, handle: Option<&str>) -> bool {
        &self.target == target && self.target_handle.as_deref() == handle
    }

    /// True if either endpoint is `node`.
    pub fn touches(&self, node: &NodeId) -> bool {
        &self.source == node || &self.target == node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lands_on_distinguishes_handles() {
        let edge = Edge::new("a".into(), "b".into(), Some("left".into()));
        assert!(edge.lands_on(&"b".into(), Some("left")));
        assert!(!edge.lands_on(&"b".into(), Some("right")));
        assert!(!edge.lands_on(&"b".into(), None));
    }

    #[test]
    fn test_touches() {
        let edge = Edge::new("a".into(), "b".into(), None);
        assert!(edge.touches(&"a".into()));
        assert!(edge.touches(&"b".into()));
        assert!(!edge.touches(&"c".into()));
    }
}
