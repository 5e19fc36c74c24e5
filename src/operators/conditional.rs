//! Conditional filter: keeps records whose metadata satisfies an expression.
//!
//! All incoming datasets are concatenated and each record is evaluated with
//! its metadata bound as `metadata` and `item`. A record whose evaluation
//! errors is dropped and counted. When the expression does not compile,
//! every record counts as failed.
//!
//! Separately, the expression is evaluated once against the first record
//! to flag an invalid condition. That check never decides which records
//! are kept.

use super::{all_incoming_records, Operator, OperatorContext, RunDetail, RunReport};
use crate::error::{FlowError, Result};
use crate::expr::{ExprError, Expression};
use crate::graph::{GraphStore, NodeConfig, NodeId, NodeKind};
use crate::types::{CommitMode, DatasetInput, Record};
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConditionalOperator;

/// Result of filtering one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub kept: Vec<Record>,
    pub failed: usize,
    pub invalid_condition: bool,
    pub first_error: Option<ExprError>,
}

#[async_trait]
impl Operator for ConditionalOperator {
    fn kind(&self) -> NodeKind {
        NodeKind::ConditionalFilter
    }

    async fn run(&self, ctx: &OperatorContext<'_>, node_id: &NodeId) -> Result<RunReport> {
        let source = expression(ctx.graph, node_id)?;
        let input = all_incoming_records(ctx.graph, node_id)?;
        let total = input.len();
        let outcome = filter_records(&source, &input);

        let FilterOutcome {
            kept,
            failed,
            invalid_condition,
            first_error,
        } = outcome;
        let items = ctx
            .graph
            .commit(node_id, DatasetInput::Records(kept), CommitMode::Set)?;

        tracing::info!(
            "Conditional {} kept {} of {} records ({} failed)",
            node_id,
            items,
            total,
            failed
        );

        let mut report = RunReport::committed(node_id, self.kind(), items).with_detail(
            RunDetail::Conditional {
                failed,
                invalid_condition,
                error: first_error.as_ref().map(ToString::to_string),
            },
        );
        if invalid_condition {
            report = report.with_warning("Invalid condition syntax");
        } else if failed > 0 {
            report = report.with_warning(format!("{} items failed to process", failed));
        }
        Ok(report)
    }
}

/// Filter `records` by `source`. Kept records get fresh ids.
pub fn filter_records(source: &str, records: &[Record]) -> FilterOutcome {
    let expression = match Expression::compile(source) {
        Ok(expression) => expression,
        Err(e) => {
            tracing::warn!("Condition does not compile: {}", e);
            return FilterOutcome {
                kept: Vec::new(),
                failed: records.len(),
                invalid_condition: true,
                first_error: Some(e),
            };
        }
    };

    let mut kept = Vec::new();
    let mut failed = 0;
    let mut first_error = None;
    for (index, record) in records.iter().enumerate() {
        match expression.matches(&record.metadata_value()) {
            Ok(true) => kept.push(record.rekeyed()),
            Ok(false) => {}
            Err(e) => {
                tracing::debug!("Condition failed on record {}: {}", index, e);
                failed += 1;
                first_error.get_or_insert(e);
            }
        }
    }

    let invalid_condition = !expression.is_match_all()
        && records
            .first()
            .is_some_and(|r| expression.eval_value(&r.metadata_value()).is_err());

    FilterOutcome {
        kept,
        failed,
        invalid_condition,
        first_error,
    }
}

/// Replace a Conditional Filter's expression. It is compiled only when the
/// node runs.
pub fn set_expression(graph: &GraphStore, node_id: &NodeId, source: &str) -> Result<()> {
    graph.update_config(node_id, |config| match config {
        NodeConfig::ConditionalFilter { expression } => {
            *expression = source.to_string();
            Ok(())
        }
        _ => Err(not_a_conditional(node_id)),
    })
}

pub fn expression(graph: &GraphStore, node_id: &NodeId) -> Result<String> {
    match &graph.snapshot().require_node(node_id)?.config {
        NodeConfig::ConditionalFilter { expression } => Ok(expression.clone()),
        _ => Err(not_a_conditional(node_id)),
    }
}

fn not_a_conditional(node_id: &NodeId) -> FlowError {
    FlowError::invalid_config(node_id.to_string(), "not a Conditional Filter node")
}
