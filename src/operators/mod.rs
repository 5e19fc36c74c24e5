//! Per-node transform operators.
//!
//! Every runnable node kind has one operator. A run reads upstream datasets
//! from a graph snapshot, computes its output and commits it onto the
//! acting node through [`GraphStore::commit`] (or an atomic
//! [`GraphStore::update`] when configuration changes with it).
//!
//! # Dispatch
//!
//! - **`Operator` trait**: the async seam every operator implements.
//! - **`BuiltinOperator` enum**: one variant per runnable kind, so the
//!   engine dispatches with a `match` and no boxing.
//!
//! Node configuration edits (staging references, changing a limit,
//! toggling paths, setting an expression) live next to the operator that
//! reads them.

pub mod analytics;
pub mod annotate;
pub mod conditional;
pub mod limit;
pub mod merge;
pub mod path_filter;
pub mod report;
pub mod sink;
pub mod source;

pub use analytics::AnalyticsOperator;
pub use annotate::AnnotateOperator;
pub use conditional::ConditionalOperator;
pub use limit::LimitOperator;
pub use merge::MergeOperator;
pub use path_filter::PathFilterOperator;
pub use report::{RunDetail, RunReport};
pub use sink::SinkOperator;
pub use source::SourceOperator;

use crate::annotation::{AnnotationService, ImageMaterializer};
use crate::config::AppConfig;
use crate::error::Result;
use crate::graph::{GraphStore, NodeId, NodeKind, ViewerStore};
use crate::types::Record;
use async_trait::async_trait;

/// Everything an operator may touch during a run.
#[derive(Clone, Copy)]
pub struct OperatorContext<'a> {
    pub graph: &'a GraphStore,
    pub viewer: &'a ViewerStore,
    pub annotation: &'a dyn AnnotationService,
    pub materializer: &'a ImageMaterializer,
    pub config: &'a AppConfig,
}

/// A runnable node behavior.
#[async_trait]
pub trait Operator: Send + Sync {
    fn kind(&self) -> NodeKind;

    async fn run(&self, ctx: &OperatorContext<'_>, node_id: &NodeId) -> Result<RunReport>;
}

/// Enum dispatch over the built-in operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinOperator {
    Source(SourceOperator),
    Sink(SinkOperator),
    Merge(MergeOperator),
    Limit(LimitOperator),
    PathFilter(PathFilterOperator),
    Conditional(ConditionalOperator),
    Annotate(AnnotateOperator),
    Analytics(AnalyticsOperator),
}

impl BuiltinOperator {
    /// Operator for a kind, or `None` for kinds without one.
    pub fn for_kind(kind: NodeKind) -> Option<Self> {
        match kind {
            NodeKind::Source => Some(BuiltinOperator::Source(SourceOperator)),
            NodeKind::Sink => Some(BuiltinOperator::Sink(SinkOperator)),
            NodeKind::Merge => Some(BuiltinOperator::Merge(MergeOperator)),
            NodeKind::Limit => Some(BuiltinOperator::Limit(LimitOperator)),
            NodeKind::PathFilter => Some(BuiltinOperator::PathFilter(PathFilterOperator)),
            NodeKind::ConditionalFilter => Some(BuiltinOperator::Conditional(ConditionalOperator)),
            NodeKind::Annotate => Some(BuiltinOperator::Annotate(AnnotateOperator)),
            NodeKind::Analytics => Some(BuiltinOperator::Analytics(AnalyticsOperator)),
            NodeKind::Splitter | NodeKind::QueryItem => None,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            BuiltinOperator::Source(op) => op.kind(),
            BuiltinOperator::Sink(op) => op.kind(),
            BuiltinOperator::Merge(op) => op.kind(),
            BuiltinOperator::Limit(op) => op.kind(),
            BuiltinOperator::PathFilter(op) => op.kind(),
            BuiltinOperator::Conditional(op) => op.kind(),
            BuiltinOperator::Annotate(op) => op.kind(),
            BuiltinOperator::Analytics(op) => op.kind(),
        }
    }

    pub async fn run(&self, ctx: &OperatorContext<'_>, node_id: &NodeId) -> Result<RunReport> {
        match self {
            BuiltinOperator::Source(op) => op.run(ctx, node_id).await,
            BuiltinOperator::Sink(op) => op.run(ctx, node_id).await,
            BuiltinOperator::Merge(op) => op.run(ctx, node_id).await,
            BuiltinOperator::Limit(op) => op.run(ctx, node_id).await,
            BuiltinOperator::PathFilter(op) => op.run(ctx, node_id).await,
            BuiltinOperator::Conditional(op) => op.run(ctx, node_id).await,
            BuiltinOperator::Annotate(op) => op.run(ctx, node_id).await,
            BuiltinOperator::Analytics(op) => op.run(ctx, node_id).await,
        }
    }
}

// ==================== Shared helpers ====================

/// Dataset of the first incoming node, or empty when there is none.
pub(crate) fn first_incoming_dataset(graph: &GraphStore, node_id: &NodeId) -> Result<Vec<Record>> {
    let snapshot = graph.snapshot();
    snapshot.require_node(node_id)?;
    Ok(snapshot
        .first_incoming(node_id)
        .map(|n| n.dataset.clone())
        .unwrap_or_default())
}

/// Datasets of every incoming node, concatenated in edge order.
pub(crate) fn all_incoming_records(graph: &GraphStore, node_id: &NodeId) -> Result<Vec<Record>> {
    let snapshot = graph.snapshot();
    snapshot.require_node(node_id)?;
    Ok(snapshot
        .incoming_nodes(node_id)
        .into_iter()
        .flat_map(|n| n.dataset.iter().cloned())
        .collect())
}

/// Re-key records for the acting node's dataset.
pub(crate) fn rekey_all<'a>(records: impl IntoIterator<Item = &'a Record>) -> Vec<Record> {
    records.into_iter().map(Record::rekeyed).collect()
}
