//! Workflow-level error types.

use super::NodeError;
use thiserror::Error;

/// Workflow-level errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Workflow must have at least one node")]
    EmptyWorkflow,
    #[error("All workflow nodes must have a non-empty name")]
    UnnamedNode,
    #[error("Duplicate node name: '{0}'")]
    DuplicateNodeName(String),
    #[error("Input validation failed: {0}")]
    InputValidation(String),
    #[error("Workflow timed out after {0:.1}s")]
    Timeout(f64),
    #[error("Node '{node_name}' failed: {error}")]
    NodeFailed { node_name: String, error: String },
    #[error("Node error: {0}")]
    NodeError(Box<NodeError>),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<NodeError> for WorkflowError {
    fn from(value: NodeError) -> Self {
        WorkflowError::NodeError(Box::new(value))
    }
}
