//! Limit operator: keeps the first `limit` records of its input.

use super::{first_incoming_dataset, rekey_all, Operator, OperatorContext, RunReport};
use crate::error::{FlowError, Result};
use crate::graph::{GraphStore, NodeConfig, NodeId, NodeKind};
use crate::types::{CommitMode, DatasetInput};
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitOperator;

#[async_trait]
impl Operator for LimitOperator {
    fn kind(&self) -> NodeKind {
        NodeKind::Limit
    }

    async fn run(&self, ctx: &OperatorContext<'_>, node_id: &NodeId) -> Result<RunReport> {
        let limit = current_limit(ctx.graph, node_id)?;
        let input = first_incoming_dataset(ctx.graph, node_id)?;
        let kept = rekey_all(input.iter().take(limit));

        tracing::debug!("Limit {} kept {} of {} records", node_id, kept.len(), input.len());
        let items = ctx
            .graph
            .commit(node_id, DatasetInput::Records(kept), CommitMode::Set)?;
        Ok(RunReport::committed(node_id, self.kind(), items))
    }
}

/// Change a Limit node's limit. Zero is rejected.
pub fn set_limit(graph: &GraphStore, node_id: &NodeId, limit: usize) -> Result<()> {
    if limit == 0 {
        return Err(FlowError::invalid_config(
            node_id.to_string(),
            "limit must be a positive integer",
        ));
    }
    graph.update_config(node_id, |config| match config {
        NodeConfig::Limit { limit: current } => {
            *current = limit;
            Ok(())
        }
        _ => Err(not_a_limit(node_id)),
    })
}

pub fn current_limit(graph: &GraphStore, node_id: &NodeId) -> Result<usize> {
    match &graph.snapshot().require_node(node_id)?.config {
        NodeConfig::Limit { limit } => Ok(*limit),
        _ => Err(not_a_limit(node_id)),
    }
}

fn not_a_limit(node_id: &NodeId) -> FlowError {
    FlowError::invalid_config(node_id.to_string(), "not a Limit node")
}
