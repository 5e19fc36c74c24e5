//! Error handling for visionflow
//!
//! This module defines the crate error type and a Result alias for use
//! throughout the graph, the operators and the annotation boundary.
//!
//! Soft conditions are not errors: a node with no incoming connection or an
//! empty upstream dataset resolves to empty output, and a per-record
//! expression failure is counted in the run report instead of aborting.

use thiserror::Error;

/// Main error type for visionflow operations
#[derive(Error, Debug)]
pub enum FlowError {
    /// A node id did not resolve in the graph
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// An edge id did not resolve in the graph
    #[error("Edge not found: {0}")]
    EdgeNotFound(String),

    /// The node kind has no runnable operator
    #[error("Node {node_id} of kind {kind} has no operator")]
    NoOperator { node_id: String, kind: String },

    /// A node configuration value was rejected
    #[error("Invalid configuration for node {node_id}: {message}")]
    InvalidConfig { node_id: String, message: String },

    /// Errors raised while parsing or evaluating a condition expression
    #[error("Expression error: {0}")]
    Expression(#[from] crate::expr::ExprError),

    /// A resource could not be turned into an encoded image payload
    #[error("Failed to materialize resource {resource}: {message}")]
    Materialize { resource: String, message: String },

    /// The annotation service rejected or failed a call
    #[error("Annotation service error: {0}")]
    Service(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Image decode/encode errors
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FlowError>,
    },
}

impl FlowError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        FlowError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for an [`FlowError::InvalidConfig`]
    pub fn invalid_config(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        FlowError::InvalidConfig {
            node_id: node_id.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for visionflow operations
pub type Result<T> = std::result::Result<T, FlowError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<FlowError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
