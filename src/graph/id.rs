//! Identity types for the graph.
//!
//! Node and edge ids are opaque strings. Fresh ids are generated with a
//! kind prefix so logs stay readable (`limit-3f2a…`), but nothing parses them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node in the graph.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id with the given prefix.
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{}-{}", prefix, short_uuid()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of an edge in the graph.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Edge ids name both endpoints plus a random suffix.
    pub fn generate(source: &NodeId, target: &NodeId) -> Self {
        Self(format!("e-{}-{}-{}", source, target, short_uuid()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

fn short_uuid() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_node_ids_are_unique() {
        let a = NodeId::generate("limit");
        let b = NodeId::generate("limit");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("limit-"));
    }

    #[test]
    fn test_edge_id_names_endpoints() {
        let id = EdgeId::generate(&NodeId::from("a"), &NodeId::from("b"));
        assert!(id.as_str().starts_with("e-a-b-"));
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&NodeId::from("src")).unwrap();
        assert_eq!(json, "\"src\"");
    }
}
