//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use visionflow::{GraphStore, NodeId, Record};

/// Resources of a node's dataset, in order
pub fn resources(graph: &GraphStore, node: &NodeId) -> Vec<String> {
    graph
        .dataset(node)
        .expect("node exists")
        .iter()
        .map(|r| r.resource.as_str().to_string())
        .collect()
}

/// Assert no record id of `a` appears in `b`
pub fn assert_disjoint_ids(a: &[Record], b: &[Record]) {
    for record in a {
        assert!(
            b.iter().all(|other| other.id != record.id),
            "record id {} appears in both datasets",
            record.id
        );
    }
}
