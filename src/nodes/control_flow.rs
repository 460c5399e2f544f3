//! Conditional branching node.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::FutureExt;
use uuid::Uuid;

use crate::error::NodeError;
use crate::evaluator::{self, EvalLimits, Expression};
use crate::llm::TokenUsage;
use crate::workflow::{DataMap, NodeContext, NodeResult, NodeStatus};

use super::WorkflowNode;

/// Evaluates a sandboxed condition against the merged variables and runs
/// one of two child-node branches sequentially, threading outputs between
/// the children like the top-level engine does.
///
/// The condition is parsed at construction time, so malformed expressions
/// fail at workflow-definition time rather than mid-run. An empty false
/// branch is allowed and completes with no output when taken.
pub struct ConditionalNode {
    name: String,
    condition: Expression,
    true_nodes: Vec<Arc<dyn WorkflowNode>>,
    false_nodes: Vec<Arc<dyn WorkflowNode>>,
    critical: bool,
}

impl ConditionalNode {
    pub fn new(
        name: impl Into<String>,
        condition: &str,
        true_nodes: Vec<Arc<dyn WorkflowNode>>,
        false_nodes: Vec<Arc<dyn WorkflowNode>>,
    ) -> Result<Self, NodeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(NodeError::ConfigError("node name cannot be empty".into()));
        }
        if true_nodes.is_empty() {
            return Err(NodeError::ConfigError(
                "true branch must contain at least one node".into(),
            ));
        }
        let condition = Expression::parse(condition)?;
        Ok(Self {
            name,
            condition,
            true_nodes,
            false_nodes,
            critical: true,
        })
    }

    /// Mark this node non-critical. Note: condition evaluation failure
    /// still fails the node; criticality only decides whether the engine
    /// aborts on that failure.
    pub fn non_critical(mut self) -> Self {
        self.critical = false;
        self
    }

    /// The condition source text.
    pub fn condition(&self) -> &str {
        self.condition.source()
    }
}

#[async_trait]
impl WorkflowNode for ConditionalNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_critical(&self) -> bool {
        self.critical
    }

    async fn execute(&self, context: &NodeContext) -> NodeResult {
        let start = Instant::now();
        let fail = |error: String| {
            NodeResult::failed(&context.step_id, error, start.elapsed().as_secs_f64() * 1000.0)
        };

        let vars = context.merged_vars();
        let branch_taken = match self.condition.evaluate(&vars, &EvalLimits::default()) {
            Ok(value) => evaluator::is_truthy(&value),
            Err(err) => return fail(NodeError::ConditionError(err).to_string()),
        };
        tracing::debug!(
            node = %self.name,
            condition = %self.condition.source(),
            branch = if branch_taken { "true" } else { "false" },
            "conditional branch selected"
        );

        let branch = if branch_taken {
            &self.true_nodes
        } else {
            &self.false_nodes
        };

        let mut branch_output = DataMap::new();
        let mut usage: Option<TokenUsage> = None;
        for child in branch {
            let mut child_ctx = context.clone();
            child_ctx.step_id = Uuid::new_v4().to_string();
            child_ctx
                .previous_outputs
                .extend(branch_output.iter().map(|(k, v)| (k.clone(), v.clone())));

            let result = match AssertUnwindSafe(child.execute(&child_ctx))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(_) => NodeResult::failed(
                    &child_ctx.step_id,
                    format!("Node '{}' panicked", child.name()),
                    0.0,
                ),
            };

            if let Some(child_usage) = &result.token_usage {
                usage = Some(match &usage {
                    Some(total) => total.combine(child_usage),
                    None => child_usage.clone(),
                });
            }

            if result.status == NodeStatus::Failed {
                let error = result.error.unwrap_or_else(|| "unknown error".into());
                if child.is_critical() {
                    return fail(format!(
                        "Critical child node '{}' failed: {}",
                        child.name(),
                        error
                    ));
                }
                tracing::warn!(
                    node = %self.name,
                    child = %child.name(),
                    error = %error,
                    "non-critical child node failed; continuing branch"
                );
                continue;
            }
            if let Some(output) = result.output {
                branch_output.extend(output);
            }
        }

        NodeResult::completed_with_usage(
            &context.step_id,
            branch_output,
            start.elapsed().as_secs_f64() * 1000.0,
            usage,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FrameworkConfig;
    use crate::llm::{ProviderRegistry, RetryPolicy};
    use crate::middleware::MiddlewareChain;
    use crate::nodes::TransformNode;
    use crate::workflow::{RuntimeEnv, WorkflowConfig};
    use serde_json::json;

    fn context(input: DataMap) -> NodeContext {
        NodeContext {
            workflow_id: "wf".into(),
            workflow_name: "test".into(),
            step_id: "step".into(),
            correlation_id: "cid".into(),
            input_data: input,
            previous_outputs: DataMap::new(),
            config: WorkflowConfig::default(),
            env: RuntimeEnv {
                providers: Arc::new(ProviderRegistry::new()),
                middleware: Arc::new(MiddlewareChain::new(vec![])),
                retry: RetryPolicy::default(),
                framework: FrameworkConfig::default(),
            },
        }
    }

    fn emit(name: &str, key: &str, value: serde_json::Value) -> Arc<dyn WorkflowNode> {
        let key = key.to_string();
        Arc::new(
            TransformNode::new(name, move |_| {
                Ok([(key.clone(), value.clone())].into())
            })
            .unwrap(),
        )
    }

    fn failing(name: &str, critical: bool) -> Arc<dyn WorkflowNode> {
        let node = TransformNode::new(name, |_| Err("boom".into())).unwrap();
        Arc::new(if critical { node } else { node.non_critical() })
    }

    #[test]
    fn test_construction_validation() {
        assert!(ConditionalNode::new("", "x > 1", vec![emit("a", "k", json!(1))], vec![]).is_err());
        assert!(ConditionalNode::new("c", "x > 1", vec![], vec![]).is_err());
        // malformed condition rejected at definition time
        assert!(ConditionalNode::new(
            "c",
            "import os",
            vec![emit("a", "k", json!(1))],
            vec![]
        )
        .is_err());
    }

    #[tokio::test]
    async fn test_true_branch_taken() {
        let node = ConditionalNode::new(
            "gate",
            "score > 10",
            vec![emit("yes", "took", json!("true"))],
            vec![emit("no", "took", json!("false"))],
        )
        .unwrap();
        let result = node
            .execute(&context([("score".to_string(), json!(42))].into()))
            .await;
        assert_eq!(result.status, NodeStatus::Completed);
        assert_eq!(result.output.unwrap()["took"], json!("true"));
    }

    #[tokio::test]
    async fn test_false_branch_taken() {
        let node = ConditionalNode::new(
            "gate",
            "score > 10",
            vec![emit("yes", "took", json!("true"))],
            vec![emit("no", "took", json!("false"))],
        )
        .unwrap();
        let result = node
            .execute(&context([("score".to_string(), json!(5))].into()))
            .await;
        assert_eq!(result.output.unwrap()["took"], json!("false"));
    }

    #[tokio::test]
    async fn test_empty_false_branch_completes_with_no_output() {
        let node = ConditionalNode::new(
            "gate",
            "flag",
            vec![emit("yes", "k", json!(1))],
            vec![],
        )
        .unwrap();
        let result = node
            .execute(&context([("flag".to_string(), json!(false))].into()))
            .await;
        assert_eq!(result.status, NodeStatus::Completed);
        assert!(result.output.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_condition_error_fails_node() {
        let node = ConditionalNode::new(
            "gate",
            "missing_var > 1",
            vec![emit("yes", "k", json!(1))],
            vec![],
        )
        .unwrap();
        let result = node.execute(&context(DataMap::new())).await;
        assert_eq!(result.status, NodeStatus::Failed);
        let error = result.error.unwrap();
        assert!(error.starts_with("Condition evaluation failed:"));
        assert!(error.contains("missing_var"));
    }

    #[tokio::test]
    async fn test_critical_child_failure_aborts_branch() {
        let node = ConditionalNode::new(
            "gate",
            "true",
            vec![
                emit("first", "a", json!(1)),
                failing("bad", true),
                emit("last", "b", json!(2)),
            ],
            vec![],
        )
        .unwrap();
        let result = node.execute(&context(DataMap::new())).await;
        assert_eq!(result.status, NodeStatus::Failed);
        assert!(result
            .error
            .unwrap()
            .contains("Critical child node 'bad' failed:"));
    }

    #[tokio::test]
    async fn test_non_critical_child_failure_skipped() {
        let node = ConditionalNode::new(
            "gate",
            "true",
            vec![
                failing("bad", false),
                emit("last", "b", json!(2)),
            ],
            vec![],
        )
        .unwrap();
        let result = node.execute(&context(DataMap::new())).await;
        assert_eq!(result.status, NodeStatus::Completed);
        assert_eq!(result.output.unwrap()["b"], json!(2));
    }

    #[tokio::test]
    async fn test_children_see_earlier_sibling_outputs() {
        let reader = Arc::new(
            TransformNode::new("reader", |vars| {
                let a = vars.get("a").and_then(|v| v.as_i64()).unwrap_or(-1);
                Ok([("a_seen".to_string(), json!(a))].into())
            })
            .unwrap(),
        ) as Arc<dyn WorkflowNode>;
        let node = ConditionalNode::new(
            "gate",
            "true",
            vec![emit("writer", "a", json!(7)), reader],
            vec![],
        )
        .unwrap();
        let result = node.execute(&context(DataMap::new())).await;
        assert_eq!(result.output.unwrap()["a_seen"], json!(7));
    }

    #[tokio::test]
    async fn test_nested_conditionals() {
        let inner = Arc::new(
            ConditionalNode::new(
                "inner",
                "x > 5",
                vec![emit("deep", "level", json!("inner-true"))],
                vec![],
            )
            .unwrap(),
        ) as Arc<dyn WorkflowNode>;
        let outer = ConditionalNode::new("outer", "x > 0", vec![inner], vec![]).unwrap();
        let result = outer
            .execute(&context([("x".to_string(), json!(9))].into()))
            .await;
        assert_eq!(result.status, NodeStatus::Completed);
        assert_eq!(result.output.unwrap()["level"], json!("inner-true"));
    }
}
