//! Test data builders for records and small graphs

use serde_json::{json, Value};
use visionflow::graph::NodeConfig;
use visionflow::{
    CommitMode, DatasetInput, FlowEngine, GraphStore, Metadata, NodeId, NodeKind, Position, Record,
};

/// Builder for test Records
pub struct RecordBuilder {
    resource: String,
    metadata: Metadata,
}

impl RecordBuilder {
    pub fn new(resource: &str) -> Self {
        Self {
            resource: resource.to_string(),
            metadata: Metadata::new(),
        }
    }

    pub fn meta(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    /// Typical annotation metadata with a face detail.
    pub fn annotated(self, label: &str, yaw: f64) -> Self {
        self.meta("label", json!(label))
            .meta("confidence", json!("90"))
            .meta("timestamp", json!("2024-05-01T12:00:00Z"))
            .meta(
                "analysis",
                json!({"FaceDetails": [{"Pose": {"Roll": 0.0, "Pitch": 0.0, "Yaw": yaw}}]}),
            )
    }

    pub fn build(self) -> Record {
        Record::with_metadata(self.resource, self.metadata)
    }
}

/// Builder for graphs of named nodes
pub struct GraphBuilder {
    store: GraphStore,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            store: GraphStore::new(),
        }
    }

    pub fn node(self, id: &str, kind: NodeKind) -> Self {
        self.store
            .add_node_with_id(
                NodeId::from(id),
                NodeConfig::for_kind(kind, 5),
                Position::default(),
            )
            .expect("unique node id");
        self
    }

    /// A Source node holding `records` as its committed dataset
    pub fn data(self, id: &str, records: Vec<Record>) -> Self {
        let builder = self.node(id, NodeKind::Source);
        builder
            .store
            .commit(&NodeId::from(id), DatasetInput::Records(records), CommitMode::Set)
            .expect("commit");
        builder
    }

    pub fn edge(self, source: &str, target: &str, handle: Option<&str>) -> Self {
        self.store
            .connect(&NodeId::from(source), &NodeId::from(target), handle)
            .expect("both nodes exist");
        self
    }

    pub fn build(self) -> GraphStore {
        self.store
    }
}

/// Add a node to an engine and connect it after `upstream`, if any
pub fn chain(engine: &FlowEngine, upstream: Option<&NodeId>, kind: NodeKind) -> NodeId {
    let id = engine
        .add_node(kind, Position::default())
        .expect("add node");
    if let Some(upstream) = upstream {
        engine
            .graph()
            .connect(upstream, &id, None)
            .expect("connect");
    }
    id
}
