//! Workflow state models: statuses, execution context, results, metrics.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::FrameworkConfig;
use crate::llm::{ProviderRegistry, RetryPolicy, TokenUsage};
use crate::middleware::MiddlewareChain;

/// Node input/output maps are plain JSON objects.
pub type DataMap = HashMap<String, Value>;

/// Lifecycle states of a workflow execution.
///
/// State transitions:
///
/// ```text
/// PENDING → RUNNING → COMPLETED
///                   → FAILED
///                   → CANCELLED
///                   → TIMEOUT
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    Timeout,
}

impl WorkflowStatus {
    /// True if this is a terminal (final) state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkflowStatus::Pending | WorkflowStatus::Running)
    }
}

/// Lifecycle states of a single workflow node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl NodeStatus {
    /// True if this is a terminal (final) state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NodeStatus::Completed | NodeStatus::Failed | NodeStatus::Skipped
        )
    }
}

/// Per-workflow configuration overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Provider name to use for LLM nodes without a local override.
    pub provider: String,
    /// Model override.
    pub model: Option<String>,
    /// Sampling temperature override.
    pub temperature: Option<f64>,
    /// Max response tokens override.
    pub max_tokens: Option<u32>,
    /// Maximum loop iterations. Advisory: this crate has no loop construct,
    /// the bound is carried for embedders that add one.
    pub max_iterations: u32,
    /// Maximum control-flow nesting depth. Advisory only: documented but not
    /// enforced at runtime, matching the reference behavior.
    pub max_nesting_depth: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            model: None,
            temperature: None,
            max_tokens: None,
            max_iterations: 100,
            max_nesting_depth: 5,
        }
    }
}

/// Engine facilities threaded into every node invocation: the provider
/// registry, the middleware chain, the retry policy, and framework
/// defaults. Read-only and cheap to share.
#[derive(Clone)]
pub struct RuntimeEnv {
    pub providers: Arc<ProviderRegistry>,
    pub middleware: Arc<MiddlewareChain>,
    pub retry: RetryPolicy,
    pub framework: FrameworkConfig,
}

/// Execution context passed to each workflow node.
///
/// Built fresh by the engine for every node invocation. Nodes never mutate
/// it; their only channel back to the engine is the returned [`NodeResult`].
#[derive(Clone)]
pub struct NodeContext {
    /// Parent workflow id.
    pub workflow_id: String,
    /// Parent workflow name (may be empty).
    pub workflow_name: String,
    /// Per-invocation execution-slot id.
    pub step_id: String,
    /// Tracing correlation id for the whole run.
    pub correlation_id: String,
    /// The original workflow input, unchanged across nodes.
    pub input_data: DataMap,
    /// Accumulated outputs from all prior nodes.
    pub previous_outputs: DataMap,
    /// Resolved per-workflow configuration.
    pub config: WorkflowConfig,
    /// Engine facilities (registry, hooks, retry, defaults).
    pub env: RuntimeEnv,
}

impl NodeContext {
    /// Variables visible to templates and condition expressions:
    /// the original input merged with accumulated outputs (outputs win).
    pub fn merged_vars(&self) -> DataMap {
        let mut merged = self.input_data.clone();
        merged.extend(
            self.previous_outputs
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        merged
    }

    /// Identification handed to middleware hooks fired from this context.
    pub fn hook_context(&self) -> crate::middleware::HookContext {
        crate::middleware::HookContext {
            workflow_id: self.workflow_id.clone(),
            correlation_id: self.correlation_id.clone(),
            workflow_name: self.workflow_name.clone(),
        }
    }
}

/// Output from a single workflow node execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResult {
    /// Execution-slot id this result belongs to.
    pub step_id: String,
    /// Terminal execution status.
    pub status: NodeStatus,
    /// Node output data (`None` if the node failed).
    pub output: Option<DataMap>,
    /// Error message if the node failed (`None` on success).
    pub error: Option<String>,
    /// Node execution wall-clock time.
    pub duration_ms: f64,
    /// Token consumption if this node involved an LLM call.
    pub token_usage: Option<TokenUsage>,
}

impl NodeResult {
    pub fn completed(step_id: &str, output: DataMap, duration_ms: f64) -> Self {
        Self {
            step_id: step_id.to_string(),
            status: NodeStatus::Completed,
            output: Some(output),
            error: None,
            duration_ms,
            token_usage: None,
        }
    }

    pub fn completed_with_usage(
        step_id: &str,
        output: DataMap,
        duration_ms: f64,
        token_usage: Option<TokenUsage>,
    ) -> Self {
        Self {
            token_usage,
            ..Self::completed(step_id, output, duration_ms)
        }
    }

    pub fn failed(step_id: &str, error: impl Into<String>, duration_ms: f64) -> Self {
        Self {
            step_id: step_id.to_string(),
            status: NodeStatus::Failed,
            output: None,
            error: Some(error.into()),
            duration_ms,
            token_usage: None,
        }
    }
}

/// Aggregated performance and observability data for one workflow run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    /// Wall-clock time from first node to completion (or abort).
    pub total_duration_ms: f64,
    /// node name → duration in milliseconds.
    pub node_durations: HashMap<String, f64>,
    /// Aggregated token usage across all LLM nodes.
    pub token_usage_total: Option<TokenUsage>,
    /// node name → token usage.
    pub node_token_usage: HashMap<String, TokenUsage>,
    pub nodes_completed: u32,
    pub nodes_failed: u32,
    pub nodes_skipped: u32,
}

/// Final result returned to the caller after workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub workflow_id: String,
    pub correlation_id: String,
    pub status: WorkflowStatus,
    /// Accumulated output map (`None` on failure or when nothing was produced).
    pub output: Option<DataMap>,
    /// Human-readable error naming the responsible node/condition/provider.
    pub error: Option<String>,
    pub metrics: ExecutionMetrics,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowResult {
    pub(crate) fn failure(
        workflow_id: &str,
        correlation_id: &str,
        error: String,
        metrics: ExecutionMetrics,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.to_string(),
            correlation_id: correlation_id.to_string(),
            status: WorkflowStatus::Failed,
            output: None,
            error: Some(error),
            metrics,
            created_at,
            completed_at: Some(Utc::now()),
        }
    }

    pub(crate) fn timed_out(workflow_id: &str, correlation_id: &str, timeout_secs: f64) -> Self {
        Self {
            workflow_id: workflow_id.to_string(),
            correlation_id: correlation_id.to_string(),
            status: WorkflowStatus::Timeout,
            output: None,
            error: Some(crate::error::WorkflowError::Timeout(timeout_secs).to_string()),
            metrics: ExecutionMetrics::default(),
            created_at: Utc::now(),
            completed_at: Some(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_terminality() {
        assert!(!WorkflowStatus::Pending.is_terminal());
        assert!(!WorkflowStatus::Running.is_terminal());
        assert!(WorkflowStatus::Completed.is_terminal());
        assert!(WorkflowStatus::Failed.is_terminal());
        assert!(WorkflowStatus::Cancelled.is_terminal());
        assert!(WorkflowStatus::Timeout.is_terminal());

        assert!(!NodeStatus::Pending.is_terminal());
        assert!(!NodeStatus::Running.is_terminal());
        assert!(NodeStatus::Completed.is_terminal());
        assert!(NodeStatus::Failed.is_terminal());
        assert!(NodeStatus::Skipped.is_terminal());
    }

    #[test]
    fn test_status_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&WorkflowStatus::Timeout).unwrap(),
            "\"timeout\""
        );
        assert_eq!(
            serde_json::to_string(&NodeStatus::Skipped).unwrap(),
            "\"skipped\""
        );
    }

    #[test]
    fn test_node_result_constructors() {
        let ok = NodeResult::completed("s1", DataMap::new(), 1.5);
        assert_eq!(ok.status, NodeStatus::Completed);
        assert!(ok.output.is_some());
        assert!(ok.error.is_none());

        let failed = NodeResult::failed("s2", "boom", 0.5);
        assert_eq!(failed.status, NodeStatus::Failed);
        assert!(failed.output.is_none());
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_workflow_config_defaults() {
        let cfg = WorkflowConfig::default();
        assert_eq!(cfg.provider, "openai");
        assert_eq!(cfg.max_iterations, 100);
        assert_eq!(cfg.max_nesting_depth, 5);
        assert!(cfg.model.is_none());
    }

    #[test]
    fn test_timed_out_result() {
        let result = WorkflowResult::timed_out("wf", "cid", 0.5);
        assert_eq!(result.status, WorkflowStatus::Timeout);
        assert!(result.error.as_deref().unwrap().contains("0.5"));
        assert!(result.output.is_none());
    }

    #[test]
    fn test_merged_vars_outputs_win() {
        let env = RuntimeEnv {
            providers: Arc::new(ProviderRegistry::new()),
            middleware: Arc::new(MiddlewareChain::new(vec![])),
            retry: RetryPolicy::default(),
            framework: FrameworkConfig::default(),
        };
        let ctx = NodeContext {
            workflow_id: "wf".into(),
            workflow_name: "test".into(),
            step_id: "s".into(),
            correlation_id: "c".into(),
            input_data: [("a".to_string(), json!(1)), ("b".to_string(), json!(2))].into(),
            previous_outputs: [("b".to_string(), json!(20))].into(),
            config: WorkflowConfig::default(),
            env,
        };
        let merged = ctx.merged_vars();
        assert_eq!(merged["a"], json!(1));
        assert_eq!(merged["b"], json!(20));
    }
}
