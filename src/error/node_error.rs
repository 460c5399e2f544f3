use thiserror::Error;

/// Node-level errors
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Missing template variable: '{0}'")]
    MissingTemplateVariable(String),
    #[error("Transform failed: {0}")]
    TransformError(String),
    #[error("Execution error: {0}")]
    ExecutionError(String),
    #[error("Condition evaluation failed: {0}")]
    ConditionError(#[from] crate::evaluator::ExpressionError),
    #[error("Provider error: {0}")]
    ProviderError(#[from] crate::llm::LlmError),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for NodeError {
    fn from(e: serde_json::Error) -> Self {
        NodeError::SerializationError(e.to_string())
    }
}
