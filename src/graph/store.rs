//! The graph aggregate and its shared, versioned store.
//!
//! # Copy-on-write
//!
//! [`GraphStore`] holds an `Arc<Graph>`. Readers take a cheap snapshot and
//! may keep it across await points; writers clone the current graph, apply
//! one mutation and swap the new version in. A run that read a stale
//! snapshot commits onto the *current* graph, so concurrent runs on
//! different nodes never overwrite each other and the last commit on a given
//! node wins. The lock is only held for the duration of a swap.

use crate::error::{FlowError, Result};
use crate::graph::edge::Edge;
use crate::graph::id::{EdgeId, NodeId};
use crate::graph::node::{Node, NodeConfig, NodeStatus};
use crate::types::{new_record_id, CommitMode, DatasetInput, Position, Record};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

/// Node list plus edge list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    /// Incremented by the store on every successful mutation.
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Lookup ====================

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| &n.id == id)
    }

    /// Like [`Graph::node`] but a miss is [`FlowError::NodeNotFound`].
    pub fn require_node(&self, id: &NodeId) -> Result<&Node> {
        self.node(id)
            .ok_or_else(|| FlowError::NodeNotFound(id.to_string()))
    }

    fn require_node_mut(&mut self, id: &NodeId) -> Result<&mut Node> {
        self.node_mut(id)
            .ok_or_else(|| FlowError::NodeNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| &e.id == id)
    }

    // ==================== Topology ====================

    /// Nodes with an edge into `id`, in edge-declaration order.
    ///
    /// Duplicate edges yield the same node twice. Edge sources that no
    /// longer resolve are skipped.
    pub fn incoming_nodes(&self, id: &NodeId) -> Vec<&Node> {
        self.edges
            .iter()
            .filter(|e| &e.target == id)
            .filter_map(|e| self.node(&e.source))
            .collect()
    }

    /// First incoming node, the only input single-input operators read.
    pub fn first_incoming(&self, id: &NodeId) -> Option<&Node> {
        self.incoming_nodes(id).into_iter().next()
    }

    /// An edge is live while its source node holds data.
    pub fn is_edge_live(&self, edge: &Edge) -> bool {
        self.node(&edge.source).is_some_and(Node::has_data)
    }

    pub fn live_edges(&self) -> Vec<&Edge> {
        self.edges.iter().filter(|e| self.is_edge_live(e)).collect()
    }

    // ==================== Mutation ====================

    /// Insert a node. Ids must be unique.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.contains(&node.id) {
            return Err(FlowError::invalid_config(
                node.id.to_string(),
                "a node with this id already exists",
            ));
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<Node> {
        let index = self
            .nodes
            .iter()
            .position(|n| &n.id == id)
            .ok_or_else(|| FlowError::NodeNotFound(id.to_string()))?;
        let removed = self.nodes.remove(index);
        self.edges.retain(|e| !e.touches(id));
        Ok(removed)
    }

    /// Connect `source → target`. A connection to an occupied
    /// `(target, handle)` replaces the previous edge at the same position.
    pub fn connect(
        &mut self,
        source: &NodeId,
        target: &NodeId,
        target_handle: Option<&str>,
    ) -> Result<EdgeId> {
        self.require_node(source)?;
        self.require_node(target)?;

        let edge = Edge::new(
            source.clone(),
            target.clone(),
            target_handle.map(str::to_string),
        );
        let id = edge.id.clone();

        match self
            .edges
            .iter()
            .position(|e| e.lands_on(target, target_handle))
        {
            Some(index) => {
                tracing::debug!(
                    "Replacing edge {} into {} with {}",
                    self.edges[index].id,
                    target,
                    id
                );
                self.edges[index] = edge;
            }
            None => self.edges.push(edge),
        }
        Ok(id)
    }

    pub fn disconnect(&mut self, id: &EdgeId) -> Result<Edge> {
        let index = self
            .edges
            .iter()
            .position(|e| &e.id == id)
            .ok_or_else(|| FlowError::EdgeNotFound(id.to_string()))?;
        Ok(self.edges.remove(index))
    }

    /// Commit records onto a node's dataset. Returns the new dataset length.
    ///
    /// Later records whose id collides with an earlier one (in the input or,
    /// when appending, in the retained dataset) receive a fresh id.
    pub fn commit(&mut self, id: &NodeId, input: DatasetInput, mode: CommitMode) -> Result<usize> {
        let node = self.require_node_mut(id)?;
        let incoming = input.into_records();

        let mut records: Vec<Record> = match mode {
            CommitMode::Set => Vec::with_capacity(incoming.len()),
            CommitMode::Append => std::mem::take(&mut node.dataset),
        };
        let mut seen: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();

        for mut record in incoming {
            if !seen.insert(record.id.clone()) {
                record.id = new_record_id();
                seen.insert(record.id.clone());
            }
            records.push(record);
        }

        node.dataset = records;
        Ok(node.dataset.len())
    }

    pub fn set_status(&mut self, id: &NodeId, status: NodeStatus) -> Result<()> {
        self.require_node_mut(id)?.status = status;
        Ok(())
    }

    /// Edit a node's configuration in place. The edit may not change the kind.
    pub fn update_config<T, F>(&mut self, id: &NodeId, f: F) -> Result<T>
    where
        F: FnOnce(&mut NodeConfig) -> Result<T>,
    {
        let node = self.require_node_mut(id)?;
        let kind = node.kind();
        let mut config = node.config.clone();
        let out = f(&mut config)?;
        if config.kind() != kind {
            return Err(FlowError::invalid_config(
                id.to_string(),
                format!("configuration must stay {}", kind),
            ));
        }
        node.config = config;
        Ok(out)
    }
}

/// Shared, versioned, copy-on-write home of the [`Graph`].
#[derive(Debug, Default)]
pub struct GraphStore {
    inner: RwLock<Arc<Graph>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_graph(graph: Graph) -> Self {
        Self {
            inner: RwLock::new(Arc::new(graph)),
        }
    }

    /// Current graph. The snapshot never changes after it is taken.
    pub fn snapshot(&self) -> Arc<Graph> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn version(&self) -> u64 {
        self.snapshot().version
    }

    /// Apply one mutation to a copy of the current graph and publish it.
    ///
    /// A failed mutation publishes nothing.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Graph) -> Result<T>,
    {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let mut next = Graph::clone(&guard);
        let out = f(&mut next)?;
        next.version += 1;
        *guard = Arc::new(next);
        Ok(out)
    }

    // ==================== Convenience wrappers ====================

    /// Create a node with a generated id.
    pub fn add_node(&self, config: NodeConfig, position: Position) -> Result<NodeId> {
        let id = NodeId::generate(config.kind().id_prefix());
        self.add_node_with_id(id, config, position)
    }

    pub fn add_node_with_id(
        &self,
        id: NodeId,
        config: NodeConfig,
        position: Position,
    ) -> Result<NodeId> {
        self.update(|g| {
            g.add_node(Node::new(id.clone(), config, position))?;
            Ok(id)
        })
    }

    pub fn remove_node(&self, id: &NodeId) -> Result<Node> {
        self.update(|g| g.remove_node(id))
    }

    pub fn connect(
        &self,
        source: &NodeId,
        target: &NodeId,
        target_handle: Option<&str>,
    ) -> Result<EdgeId> {
        self.update(|g| g.connect(source, target, target_handle))
    }

    pub fn disconnect(&self, id: &EdgeId) -> Result<Edge> {
        self.update(|g| g.disconnect(id))
    }

    pub fn commit(&self, id: &NodeId, input: DatasetInput, mode: CommitMode) -> Result<usize> {
        self.update(|g| g.commit(id, input, mode))
    }

    pub fn set_status(&self, id: &NodeId, status: NodeStatus) -> Result<()> {
        self.update(|g| g.set_status(id, status))
    }

    pub fn update_config<T, F>(&self, id: &NodeId, f: F) -> Result<T>
    where
        F: FnOnce(&mut NodeConfig) -> Result<T>,
    {
        self.update(|g| g.update_config(id, f))
    }

    /// Dataset of a node as it is now.
    pub fn dataset(&self, id: &NodeId) -> Result<Vec<Record>> {
        Ok(self.snapshot().require_node(id)?.dataset.clone())
    }
}
