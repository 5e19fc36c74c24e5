//! Source operator: commits the references a user staged.

use super::{Operator, OperatorContext, RunReport};
use crate::error::{FlowError, Result};
use crate::graph::{GraphStore, NodeConfig, NodeId, NodeKind};
use crate::types::{CommitMode, DatasetInput, ResourceRef};
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceOperator;

#[async_trait]
impl Operator for SourceOperator {
    fn kind(&self) -> NodeKind {
        NodeKind::Source
    }

    async fn run(&self, ctx: &OperatorContext<'_>, node_id: &NodeId) -> Result<RunReport> {
        let items = ctx.graph.update(|g| {
            let staged = match &g.require_node(node_id)?.config {
                NodeConfig::Source { staged } => staged.clone(),
                _ => return Err(not_a_source(node_id)),
            };
            g.commit(node_id, DatasetInput::References(staged), CommitMode::Set)
        })?;
        Ok(RunReport::committed(node_id, self.kind(), items))
    }
}

/// Append references to a Source node's staging list. Returns the new
/// number of staged references.
pub fn stage(
    graph: &GraphStore,
    node_id: &NodeId,
    references: impl IntoIterator<Item = ResourceRef>,
) -> Result<usize> {
    let references: Vec<ResourceRef> = references.into_iter().collect();
    graph.update_config(node_id, |config| match config {
        NodeConfig::Source { staged } => {
            staged.extend(references);
            Ok(staged.len())
        }
        _ => Err(not_a_source(node_id)),
    })
}

/// Drop every staged reference. The committed dataset is unaffected.
pub fn clear_staged(graph: &GraphStore, node_id: &NodeId) -> Result<()> {
    graph.update_config(node_id, |config| match config {
        NodeConfig::Source { staged } => {
            staged.clear();
            Ok(())
        }
        _ => Err(not_a_source(node_id)),
    })
}

fn not_a_source(node_id: &NodeId) -> FlowError {
    FlowError::invalid_config(node_id.to_string(), "not a Source node")
}
