//! Metadata-path filter: projects each record's metadata onto the selected
//! dot paths.
//!
//! Paths are discovered from the first incoming dataset on every run and on
//! [`refresh_paths`]. Only *leaf* selections are projected: a selected path
//! with a selected descendant contributes through that descendant, so
//! selecting `face` and `face.pose` keeps only `face.pose`.

use super::{Operator, OperatorContext, RunDetail, RunReport};
use crate::error::{FlowError, Result};
use crate::graph::{Graph, GraphStore, NodeConfig, NodeId, NodeKind, PathSelection};
use crate::metadata::{discover_paths, project};
use crate::types::{CommitMode, DatasetInput, Record};
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathFilterOperator;

#[async_trait]
impl Operator for PathFilterOperator {
    fn kind(&self) -> NodeKind {
        NodeKind::PathFilter
    }

    async fn run(&self, ctx: &OperatorContext<'_>, node_id: &NodeId) -> Result<RunReport> {
        // Discovery, selection refresh and commit happen in one update so
        // the projection always matches the stored selection.
        let (items, selection) = ctx.graph.update(|g| {
            let selection = refresh_in(g, node_id)?;
            let leaves = selection.leaf_paths();
            let projected: Vec<Record> = first_dataset(g, node_id)
                .iter()
                .map(|r| Record::with_metadata(r.resource.clone(), project(&r.metadata, &leaves)))
                .collect();
            let items = g.commit(node_id, DatasetInput::Records(projected), CommitMode::Set)?;
            Ok((items, selection))
        })?;

        let leaf_paths = selection.leaf_paths();
        tracing::debug!(
            "Path filter {} projected {} records onto {} leaf paths",
            node_id,
            items,
            leaf_paths.len()
        );
        Ok(
            RunReport::committed(node_id, self.kind(), items).with_detail(RunDetail::PathFilter {
                paths: selection.paths().map(str::to_string).collect(),
                leaf_paths,
                selected_keys: selection.selected_count(),
            }),
        )
    }
}

/// Re-discover paths from the first incoming dataset and merge them into
/// the stored selection. Returns the known paths, sorted.
pub fn refresh_paths(graph: &GraphStore, node_id: &NodeId) -> Result<Vec<String>> {
    let selection = graph.update(|g| refresh_in(g, node_id))?;
    Ok(selection.paths().map(str::to_string).collect())
}

/// Toggle one path with cascade. Returns its new state, or `None` when the
/// path is unknown.
pub fn toggle_path(graph: &GraphStore, node_id: &NodeId, path: &str) -> Result<Option<bool>> {
    graph.update_config(node_id, |config| Ok(selection_mut(config, node_id)?.toggle(path)))
}

/// Select everything, or deselect everything when all paths are selected.
pub fn toggle_all(graph: &GraphStore, node_id: &NodeId) -> Result<()> {
    graph.update_config(node_id, |config| {
        selection_mut(config, node_id)?.toggle_all();
        Ok(())
    })
}

/// Current selection of a Path Filter node.
pub fn selection(graph: &GraphStore, node_id: &NodeId) -> Result<PathSelection> {
    match &graph.snapshot().require_node(node_id)?.config {
        NodeConfig::PathFilter { selection } => Ok(selection.clone()),
        _ => Err(not_a_path_filter(node_id)),
    }
}

fn first_dataset(graph: &Graph, node_id: &NodeId) -> Vec<Record> {
    graph
        .first_incoming(node_id)
        .map(|n| n.dataset.clone())
        .unwrap_or_default()
}

fn refresh_in(graph: &mut Graph, node_id: &NodeId) -> Result<PathSelection> {
    let upstream = first_dataset(graph, node_id);
    let discovered = discover_paths(upstream.iter().map(|r| &r.metadata));
    graph.update_config(node_id, |config| {
        let selection = selection_mut(config, node_id)?;
        selection.refresh(discovered);
        Ok(selection.clone())
    })
}

fn selection_mut<'a>(config: &'a mut NodeConfig, node_id: &NodeId) -> Result<&'a mut PathSelection> {
    match config {
        NodeConfig::PathFilter { selection } => Ok(selection),
        _ => Err(not_a_path_filter(node_id)),
    }
}

fn not_a_path_filter(node_id: &NodeId) -> FlowError {
    FlowError::invalid_config(node_id.to_string(), "not a Path Filter node")
}
