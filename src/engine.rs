//! Flow engine: the entry point for running nodes.
//!
//! [`FlowEngine::run`] looks up a node's operator, marks the node
//! `Running`, applies the configured processing delay, runs the operator
//! and records the outcome as the node's status. Each step is reported on
//! the [`EventBridge`].
//!
//! The engine is cheap to clone and every clone shares the same graph,
//! viewer and service, so several runs can be in flight at once. Commits
//! are last-write-wins per node.
//!
//! # Example
//!
//! ```ignore
//! use visionflow::{AppConfig, FlowEngine, NodeKind, Position};
//!
//! let engine = FlowEngine::offline(AppConfig::default())?;
//! let source = engine.add_node(NodeKind::Source, Position::default())?;
//! let sink = engine.add_node(NodeKind::Sink, Position::default())?;
//! engine.graph().connect(&source, &sink, None)?;
//!
//! engine.stage(&source, ["a.png".into()])?;
//! engine.run(&source).await?;
//! engine.run(&sink).await?;
//! assert_eq!(engine.viewer().snapshot().len(), 1);
//! ```

use crate::annotation::{
    AnnotationService, HttpAnnotationService, ImageMaterializer, MockAnnotationService,
};
use crate::config::AppConfig;
use crate::error::{FlowError, Result};
use crate::events::{EventBridge, FlowEvent};
use crate::graph::{GraphStore, NodeConfig, NodeId, NodeKind, NodeStatus, ViewerStore};
use crate::operators::{source, BuiltinOperator, OperatorContext, RunDetail, RunReport};
use crate::types::{Position, ResourceRef};
use std::sync::Arc;

/// Runs operators against a shared graph.
#[derive(Clone)]
pub struct FlowEngine {
    graph: Arc<GraphStore>,
    viewer: Arc<ViewerStore>,
    annotation: Arc<dyn AnnotationService>,
    materializer: ImageMaterializer,
    config: Arc<AppConfig>,
    events: EventBridge,
}

impl FlowEngine {
    /// Engine with an empty graph and the given annotation service.
    pub fn new(config: AppConfig, annotation: Arc<dyn AnnotationService>) -> Result<Self> {
        let materializer = ImageMaterializer::new(
            config.annotation.quality(),
            config.annotation.request_timeout(),
        )?;
        tracing::debug!("Flow engine using {} annotation service", annotation.name());
        Ok(Self {
            graph: Arc::new(GraphStore::new()),
            viewer: Arc::new(ViewerStore::new()),
            annotation,
            materializer,
            config: Arc::new(config),
            events: EventBridge::default(),
        })
    }

    /// Engine talking to the configured HTTP annotation endpoint.
    pub fn with_http(config: AppConfig) -> Result<Self> {
        let service = HttpAnnotationService::new(&config.annotation)?;
        Self::new(config, Arc::new(service))
    }

    /// Engine backed by the in-memory annotation service.
    pub fn offline(config: AppConfig) -> Result<Self> {
        Self::new(config, Arc::new(MockAnnotationService::new()))
    }

    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    pub fn viewer(&self) -> &ViewerStore {
        &self.viewer
    }

    pub fn events(&self) -> &EventBridge {
        &self.events
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn annotation(&self) -> &dyn AnnotationService {
        self.annotation.as_ref()
    }

    // ==================== Graph editing ====================

    /// Add a node of `kind` with the configured defaults.
    pub fn add_node(&self, kind: NodeKind, position: Position) -> Result<NodeId> {
        let config = NodeConfig::for_kind(kind, self.config.operators.default_limit);
        self.graph.add_node(config, position)
    }

    /// Stage references on a Source node.
    pub fn stage(
        &self,
        node_id: &NodeId,
        references: impl IntoIterator<Item = ResourceRef>,
    ) -> Result<usize> {
        source::stage(&self.graph, node_id, references)
    }

    // ==================== Running ====================

    /// Run one node's operator.
    ///
    /// Kinds without an operator return [`FlowError::NoOperator`] and the
    /// node's status is left alone. Any other error marks the node
    /// `Failed` and leaves its dataset as it was.
    pub async fn run(&self, node_id: &NodeId) -> Result<RunReport> {
        let kind = self.graph.snapshot().require_node(node_id)?.kind();
        let operator = BuiltinOperator::for_kind(kind).ok_or_else(|| FlowError::NoOperator {
            node_id: node_id.to_string(),
            kind: kind.to_string(),
        })?;

        self.set_status(node_id, NodeStatus::Running);
        self.events.emit(FlowEvent::NodeStarted {
            node_id: node_id.clone(),
            kind,
        });

        if let Some(delay) = self.config.operators.processing_delay() {
            tokio::time::sleep(delay).await;
        }

        let ctx = OperatorContext {
            graph: &self.graph,
            viewer: &self.viewer,
            annotation: self.annotation.as_ref(),
            materializer: &self.materializer,
            config: &self.config,
        };

        match operator.run(&ctx, node_id).await {
            Ok(report) => {
                self.set_status(node_id, report.status());
                if let RunDetail::Viewer { version } = report.detail {
                    self.events.emit(FlowEvent::ViewerUpdated {
                        version,
                        published_by: node_id.clone(),
                        items: report.items,
                    });
                }
                match &report.warning {
                    Some(warning) => tracing::warn!("{} {} finished: {}", kind, node_id, warning),
                    None => tracing::info!("{} {} finished with {} items", kind, node_id, report.items),
                }
                self.events.emit(FlowEvent::NodeFinished(report.clone()));
                Ok(report)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!("{} {} failed: {}", kind, node_id, message);
                self.set_status(node_id, NodeStatus::Failed { message: message.clone() });
                self.events.emit(FlowEvent::NodeFailed {
                    node_id: node_id.clone(),
                    kind,
                    message,
                });
                Err(e)
            }
        }
    }

    /// Run nodes one after another, stopping at the first error.
    pub async fn run_sequence(&self, node_ids: &[NodeId]) -> Result<Vec<RunReport>> {
        let mut reports = Vec::with_capacity(node_ids.len());
        for node_id in node_ids {
            reports.push(self.run(node_id).await?);
        }
        Ok(reports)
    }

    /// Status updates race with node removal; a vanished node is ignored.
    fn set_status(&self, node_id: &NodeId, status: NodeStatus) {
        if let Err(e) = self.graph.set_status(node_id, status) {
            tracing::debug!("Status of {} not updated: {}", node_id, e);
        }
    }
}

impl std::fmt::Debug for FlowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowEngine")
            .field("graph_version", &self.graph.version())
            .field("viewer_version", &self.viewer.snapshot().version)
            .field("annotation", &self.annotation.name())
            .finish()
    }
}
