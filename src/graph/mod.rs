//! Dataflow graph model.
//!
//! Nodes hold small in-memory datasets of image records; edges say which
//! node reads from which. Nothing here runs operators; see
//! [`crate::engine`] for that.
//!
//! # Architecture
//!
//! ```text
//! [Source] ──► [Annotate] ──► [PathFilter] ──► [Sink]
//! [Source] ──► [Merge] ──► [ConditionalFilter] ──► [Analytics]
//! ```
//!
//! # Design
//!
//! - **Copy-on-write store**: [`GraphStore`] publishes immutable `Arc<Graph>`
//!   versions; every mutation swaps in a new one.
//! - **Kind from config**: a node's [`NodeKind`] is derived from its
//!   [`NodeConfig`] variant.
//! - **Single write path**: datasets change only through [`Graph::commit`].

pub mod edge;
pub mod id;
pub mod node;
pub mod node_kind;
pub mod selection;
pub mod store;
pub mod viewer;

pub use edge::Edge;
pub use id::{EdgeId, NodeId};
pub use node::{Node, NodeConfig, NodeStatus, DEFAULT_LIMIT};
pub use node_kind::NodeKind;
pub use selection::PathSelection;
pub use store::{Graph, GraphStore};
pub use viewer::{ViewerSnapshot, ViewerStore};
