//! Merge operator: concatenates every incoming dataset.

use super::{all_incoming_records, rekey_all, Operator, OperatorContext, RunReport};
use crate::error::Result;
use crate::graph::{NodeId, NodeKind};
use crate::types::{CommitMode, DatasetInput};
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOperator;

#[async_trait]
impl Operator for MergeOperator {
    fn kind(&self) -> NodeKind {
        NodeKind::Merge
    }

    async fn run(&self, ctx: &OperatorContext<'_>, node_id: &NodeId) -> Result<RunReport> {
        let merged = rekey_all(&all_incoming_records(ctx.graph, node_id)?);
        let items = ctx
            .graph
            .commit(node_id, DatasetInput::Records(merged), CommitMode::Set)?;
        Ok(RunReport::committed(node_id, self.kind(), items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::testing::{record, Fixture};
    use serde_json::json;

    #[tokio::test]
    async fn test_concatenates_in_edge_order_with_fresh_ids() {
        let fx = Fixture::new();
        let a = fx.filled("a", vec![record("a1", json!({"n": 1})), record("a2", json!({"n": 2}))]);
        let b = fx.filled("b", vec![record("b1", json!({"n": 3}))]);
        let merge = fx.node("merge", NodeKind::Merge);
        fx.connect(&b, &merge);
        fx.connect(&a, &merge);

        let report = MergeOperator.run(&fx.ctx(), &merge).await.unwrap();
        assert_eq!(report.items, 3);

        let out = fx.dataset(&merge);
        let resources: Vec<_> = out.iter().map(|r| r.resource.as_str()).collect();
        assert_eq!(resources, vec!["b1", "a1", "a2"]);
        assert_eq!(out[1].metadata["n"], json!(1));

        let upstream: Vec<_> = fx.dataset(&a).into_iter().chain(fx.dataset(&b)).collect();
        assert!(out.iter().all(|r| upstream.iter().all(|u| u.id != r.id)));
    }

    #[tokio::test]
    async fn test_no_inputs_commits_empty() {
        let fx = Fixture::new();
        let merge = fx.node("merge", NodeKind::Merge);
        let report = MergeOperator.run(&fx.ctx(), &merge).await.unwrap();
        assert_eq!(report.items, 0);
        assert!(fx.dataset(&merge).is_empty());
    }

    #[tokio::test]
    async fn test_same_source_twice_is_duplicated() {
        let fx = Fixture::new();
        let a = fx.filled("a", vec![record("a1", json!({}))]);
        let merge = fx.node("merge", NodeKind::Merge);
        fx.graph.connect(&a, &merge, Some("left")).unwrap();
        fx.graph.connect(&a, &merge, Some("right")).unwrap();

        MergeOperator.run(&fx.ctx(), &merge).await.unwrap();
        let out = fx.dataset(&merge);
        assert_eq!(out.len(), 2);
        assert_ne!(out[0].id, out[1].id);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let fx = Fixture::new();
        let a = fx.filled("a", vec![record("a1", json!({"x": [1, 2]}))]);
        let merge = fx.node("merge", NodeKind::Merge);
        fx.connect(&a, &merge);

        MergeOperator.run(&fx.ctx(), &merge).await.unwrap();
        let first = fx.dataset(&merge);
        MergeOperator.run(&fx.ctx(), &merge).await.unwrap();
        let second = fx.dataset(&merge);

        assert_eq!(first.len(), second.len());
        assert!(first.iter().zip(&second).all(|(x, y)| x.same_content(y)));
    }
}
