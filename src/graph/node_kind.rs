//! Node kind enumeration.
//!
//! This module defines the kinds of nodes a user can place in the graph.
//! Two kinds (Splitter, QueryItem) exist in the palette but have no operator.

use serde::{Deserialize, Serialize};

/// Kinds of nodes that can be created in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    // Source nodes
    /// Holds user-provided image references.
    Source,

    // Transform nodes
    /// Concatenates every incoming dataset.
    Merge,
    /// Keeps the first N records.
    Limit,
    /// Projects metadata onto a selected set of dot paths.
    PathFilter,
    /// Keeps records whose metadata satisfies an expression.
    ConditionalFilter,
    /// Sends images to the annotation service and attaches the results.
    Annotate,

    // Sink nodes
    /// Publishes its input to the viewer snapshot.
    Sink,
    /// Derives aggregate statistics from its input.
    Analytics,

    // Placeholders
    /// Palette entry with no behavior.
    Splitter,
    /// Palette entry with no behavior.
    QueryItem,
}

impl NodeKind {
    /// Get the display name for this node kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeKind::Source => "Source",
            NodeKind::Merge => "Merge",
            NodeKind::Limit => "Limit",
            NodeKind::PathFilter => "Path Filter",
            NodeKind::ConditionalFilter => "Conditional Filter",
            NodeKind::Annotate => "Annotate",
            NodeKind::Sink => "Viewer",
            NodeKind::Analytics => "Analytics",
            NodeKind::Splitter => "Splitter",
            NodeKind::QueryItem => "Query Item",
        }
    }

    /// Short lowercase prefix used when generating node ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            NodeKind::Source => "source",
            NodeKind::Merge => "merge",
            NodeKind::Limit => "limit",
            NodeKind::PathFilter => "filter",
            NodeKind::ConditionalFilter => "conditional",
            NodeKind::Annotate => "annotate",
            NodeKind::Sink => "sink",
            NodeKind::Analytics => "analytics",
            NodeKind::Splitter => "splitter",
            NodeKind::QueryItem => "query",
        }
    }

    /// Get all node kinds.
    pub fn all() -> &'static [NodeKind] {
        &[
            NodeKind::Source,
            NodeKind::Merge,
            NodeKind::Limit,
            NodeKind::PathFilter,
            NodeKind::ConditionalFilter,
            NodeKind::Annotate,
            NodeKind::Sink,
            NodeKind::Analytics,
            NodeKind::Splitter,
            NodeKind::QueryItem,
        ]
    }

    /// Sinks never commit to their own dataset.
    pub fn is_sink(&self) -> bool {
        matches!(self, NodeKind::Sink | NodeKind::Analytics)
    }

    /// Check if running this kind does anything.
    pub fn has_operator(&self) -> bool {
        !matches!(self, NodeKind::Splitter | NodeKind::QueryItem)
    }

    /// Kinds that consume every incoming node rather than only the first.
    pub fn consumes_all_inputs(&self) -> bool {
        matches!(self, NodeKind::Merge | NodeKind::ConditionalFilter)
    }

    /// Get a detailed description of what this node does.
    pub fn description(&self) -> &'static str {
        match self {
            NodeKind::Source =>
                "Holds staged image references.\n\
                 Running commits them as fresh records.",

            NodeKind::Merge =>
                "Concatenates all incoming datasets.\n\
                 Order follows the incoming edges.",

            NodeKind::Limit =>
                "Keeps the first N records of its input.\n\
                 N defaults to 5.",

            NodeKind::PathFilter =>
                "Keeps only the selected metadata paths.\n\
                 Selecting a nested path keeps its parents.",

            NodeKind::ConditionalFilter =>
                "Keeps records matching a boolean expression.\n\
                 Metadata is bound as `metadata` and `item`.",

            NodeKind::Annotate =>
                "Uploads images for external labeling.\n\
                 Polls for results and attaches them as metadata.",

            NodeKind::Sink =>
                "Publishes its input to the viewer.\n\
                 Does not keep a dataset of its own.",

            NodeKind::Analytics =>
                "Summarizes labels, faces, pose and quality.\n\
                 Read-only.",

            NodeKind::Splitter | NodeKind::QueryItem => "Not implemented.",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_kinds_listed_once() {
        let all = NodeKind::all();
        assert_eq!(all.len(), 10);
        let unique: std::collections::HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
    }

    #[test]
    fn test_placeholders_have_no_operator() {
        assert!(!NodeKind::Splitter.has_operator());
        assert!(!NodeKind::QueryItem.has_operator());
        assert!(NodeKind::Annotate.has_operator());
    }

    #[test]
    fn test_sinks() {
        assert!(NodeKind::Sink.is_sink());
        assert!(NodeKind::Analytics.is_sink());
        assert!(!NodeKind::Merge.is_sink());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&NodeKind::ConditionalFilter).unwrap();
        assert_eq!(json, "\"conditional_filter\"");
    }
}
