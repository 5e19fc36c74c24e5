//! # visionflow: Image Dataflow Graphs
//!
//! A directed graph of nodes that each hold a small in-memory dataset of
//! image records with arbitrary metadata. Running a node pulls data from
//! its upstream nodes, transforms it, and commits the result onto the node.
//! Nothing runs on its own; every run is triggered explicitly.
//!
//! ## Architecture
//!
//! - **Graph**: versioned copy-on-write node/edge store and the viewer snapshot
//! - **Operators**: Source, Sink, Merge, Limit, Path Filter, Conditional
//!   Filter, Annotate and Analytics
//! - **Annotation**: materialize, upload, poll and correlate against an
//!   external labeling service behind a trait seam
//! - **Expressions**: a small scoped language for conditional filters
//! - **Engine**: runs operators, tracks node status and emits events over
//!   a crossbeam channel
//!
//! ## Configuration
//!
//! Settings are read from `config.toml` in the platform config directory
//! under `dev.visionflow`:
//!
//! - **Linux**: `~/.config/dev.visionflow/`
//! - **macOS**: `~/Library/Application Support/dev.visionflow/`
//! - **Windows**: `%APPDATA%\dev.visionflow\`
//!
//! ## Example
//!
//! ```ignore
//! use visionflow::{AppConfig, FlowEngine, NodeKind, Position};
//!
//! let engine = FlowEngine::offline(AppConfig::load_or_default(AppConfig::default_path()))?;
//! let source = engine.add_node(NodeKind::Source, Position::default())?;
//! let limit = engine.add_node(NodeKind::Limit, Position::new(200.0, 0.0))?;
//! let sink = engine.add_node(NodeKind::Sink, Position::new(400.0, 0.0))?;
//! engine.graph().connect(&source, &limit, None)?;
//! engine.graph().connect(&limit, &sink, None)?;
//!
//! engine.stage(&source, ["faces/1.png".into(), "faces/2.png".into()])?;
//! engine.run_sequence(&[source, limit, sink]).await?;
//! println!("{}", engine.viewer().snapshot().to_json_pretty()?);
//! ```

pub mod analysis;
pub mod annotation;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod expr;
pub mod graph;
pub mod metadata;
pub mod operators;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use engine::FlowEngine;
pub use error::{FlowError, Result, ResultExt};
pub use events::{EventBridge, FlowEvent};
pub use graph::{GraphStore, NodeConfig, NodeId, NodeKind, NodeStatus, ViewerStore};
pub use operators::{RunDetail, RunReport};
pub use types::{CommitMode, DatasetInput, Metadata, Position, Record, ResourceRef};
