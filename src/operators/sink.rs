//! Sink/Viewer operator: publishes the first incoming dataset to the viewer.

use super::{Operator, OperatorContext, RunDetail, RunReport};
use crate::error::Result;
use crate::graph::{NodeId, NodeKind};
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkOperator;

#[async_trait]
impl Operator for SinkOperator {
    fn kind(&self) -> NodeKind {
        NodeKind::Sink
    }

    async fn run(&self, ctx: &OperatorContext<'_>, node_id: &NodeId) -> Result<RunReport> {
        let snapshot = ctx.graph.snapshot();
        snapshot.require_node(node_id)?;
        let upstream = snapshot.first_incoming(node_id);

        let source_node = upstream.map(|n| n.id.clone());
        let records = upstream.map(|n| n.dataset.clone()).unwrap_or_default();
        let items = records.len();

        // The viewer shows the upstream records as they are, ids included.
        let version = ctx.viewer.publish(node_id.clone(), source_node, records);
        tracing::debug!("Sink {} published {} records (viewer v{})", node_id, items, version);

        Ok(RunReport::uncommitted(node_id, self.kind(), items)
            .with_detail(RunDetail::Viewer { version }))
    }
}
