//! Pure data-transformation node.

use std::time::Instant;

use async_trait::async_trait;

use crate::error::NodeError;
use crate::workflow::{DataMap, NodeContext, NodeResult};

use super::WorkflowNode;

type TransformFn = dyn Fn(&DataMap) -> Result<DataMap, String> + Send + Sync;

/// Applies a caller-supplied function to the node's merged variables
/// (workflow input plus accumulated outputs) and emits the returned map
/// as its output. No LLM involvement.
///
/// ```rust,ignore
/// let upper = TransformNode::new("upper", |vars| {
///     let text = vars.get("text").and_then(|v| v.as_str()).unwrap_or("");
///     Ok([("text".to_string(), json!(text.to_uppercase()))].into())
/// })?;
/// ```
pub struct TransformNode {
    name: String,
    critical: bool,
    transform: Box<TransformFn>,
}

impl TransformNode {
    pub fn new<F>(name: impl Into<String>, transform: F) -> Result<Self, NodeError>
    where
        F: Fn(&DataMap) -> Result<DataMap, String> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(NodeError::ConfigError("node name cannot be empty".into()));
        }
        Ok(Self {
            name,
            critical: true,
            transform: Box::new(transform),
        })
    }

    /// Mark this node non-critical: its failure is recorded and skipped
    /// instead of aborting the workflow.
    pub fn non_critical(mut self) -> Self {
        self.critical = false;
        self
    }
}

#[async_trait]
impl WorkflowNode for TransformNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_critical(&self) -> bool {
        self.critical
    }

    async fn execute(&self, context: &NodeContext) -> NodeResult {
        let start = Instant::now();
        let vars = context.merged_vars();
        match (self.transform)(&vars) {
            Ok(output) => NodeResult::completed(
                &context.step_id,
                output,
                start.elapsed().as_secs_f64() * 1000.0,
            ),
            Err(message) => NodeResult::failed(
                &context.step_id,
                NodeError::TransformError(message).to_string(),
                start.elapsed().as_secs_f64() * 1000.0,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FrameworkConfig;
    use crate::llm::{ProviderRegistry, RetryPolicy};
    use crate::middleware::MiddlewareChain;
    use crate::workflow::{NodeStatus, RuntimeEnv, WorkflowConfig};
    use serde_json::json;
    use std::sync::Arc;

    fn context(input: DataMap, outputs: DataMap) -> NodeContext {
        NodeContext {
            workflow_id: "wf".into(),
            workflow_name: "test".into(),
            step_id: "step".into(),
            correlation_id: "cid".into(),
            input_data: input,
            previous_outputs: outputs,
            config: WorkflowConfig::default(),
            env: RuntimeEnv {
                providers: Arc::new(ProviderRegistry::new()),
                middleware: Arc::new(MiddlewareChain::new(vec![])),
                retry: RetryPolicy::default(),
                framework: FrameworkConfig::default(),
            },
        }
    }

    #[test]
    fn test_rejects_empty_name() {
        assert!(TransformNode::new("", |_| Ok(DataMap::new())).is_err());
    }

    #[tokio::test]
    async fn test_transform_sees_merged_vars() {
        let node = TransformNode::new("double", |vars| {
            let n = vars.get("n").and_then(|v| v.as_i64()).unwrap_or(0);
            Ok([("doubled".to_string(), json!(n * 2))].into())
        })
        .unwrap();
        let ctx = context(
            [("n".to_string(), json!(1))].into(),
            [("n".to_string(), json!(21))].into(),
        );
        let result = node.execute(&ctx).await;
        assert_eq!(result.status, NodeStatus::Completed);
        assert_eq!(result.output.unwrap()["doubled"], json!(42));
    }

    #[tokio::test]
    async fn test_transform_failure_message() {
        let node = TransformNode::new("bad", |_| Err("missing field".into())).unwrap();
        let result = node.execute(&context(DataMap::new(), DataMap::new())).await;
        assert_eq!(result.status, NodeStatus::Failed);
        assert_eq!(
            result.error.as_deref(),
            Some("Transform failed: missing field")
        );
        assert!(result.output.is_none());
    }

    #[test]
    fn test_non_critical_builder() {
        let node = TransformNode::new("opt", |_| Ok(DataMap::new()))
            .unwrap()
            .non_critical();
        assert!(!node.is_critical());
    }
}
