//! Analytics operator: aggregates the first incoming dataset. Pure sink.

use super::{first_incoming_dataset, Operator, OperatorContext, RunDetail, RunReport};
use crate::analysis::analyze;
use crate::error::Result;
use crate::graph::{NodeId, NodeKind};
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyticsOperator;

#[async_trait]
impl Operator for AnalyticsOperator {
    fn kind(&self) -> NodeKind {
        NodeKind::Analytics
    }

    async fn run(&self, ctx: &OperatorContext<'_>, node_id: &NodeId) -> Result<RunReport> {
        let input = first_incoming_dataset(ctx.graph, node_id)?;
        let report = analyze(&input);
        tracing::debug!(
            "Analytics {}: {} records, {} with faces, {} labels",
            node_id,
            report.total_records,
            report.faces(),
            report.labels.len()
        );

        Ok(RunReport::uncommitted(node_id, self.kind(), report.total_records)
            .with_detail(RunDetail::Analytics(Box::new(report))))
    }
}
