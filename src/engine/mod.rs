//! Sequential workflow execution engine.

mod sync_bridge;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::FutureExt;
use uuid::Uuid;

use crate::config::FrameworkConfig;
use crate::error::WorkflowError;
use crate::llm::ProviderRegistry;
use crate::middleware::{HookContext, Middleware, MiddlewareChain};
use crate::observability::TokenUsageTracker;
use crate::workflow::{
    safety, DataMap, ExecutionMetrics, NodeContext, NodeResult, NodeStatus, RuntimeEnv, Workflow,
    WorkflowResult, WorkflowStatus,
};

/// Executes workflows node by node, in declaration order.
///
/// The engine owns the framework configuration, the provider registry the
/// nodes resolve providers from, and the middleware stack. It is cheap to
/// clone and safe to share; each [`WorkflowEngine::run`] call is
/// independent.
///
/// Execution contract:
/// - Input is validated against the injection patterns before any node runs.
/// - Each node sees the original input plus all prior outputs.
/// - A critical node failure aborts the run with a FAILED result naming the
///   node; a non-critical failure is recorded and skipped.
/// - Node panics are contained and treated as node failures.
/// - `on_workflow_end` middleware fires exactly once on every terminal path.
#[derive(Clone)]
pub struct WorkflowEngine {
    config: FrameworkConfig,
    providers: Arc<ProviderRegistry>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Default for WorkflowEngine {
    /// An engine with default configuration backed by the process-wide
    /// provider registry.
    fn default() -> Self {
        Self::new(FrameworkConfig::default())
    }
}

impl WorkflowEngine {
    pub fn new(config: FrameworkConfig) -> Self {
        Self {
            config,
            providers: ProviderRegistry::global(),
            middleware: Vec::new(),
        }
    }

    /// An engine backed by a dedicated provider registry instead of the
    /// global one. Useful for tests and multi-tenant embedding.
    pub fn with_registry(config: FrameworkConfig, providers: Arc<ProviderRegistry>) -> Self {
        Self {
            config,
            providers,
            middleware: Vec::new(),
        }
    }

    /// Append a middleware. Hooks run in registration order.
    pub fn use_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    pub fn providers(&self) -> &Arc<ProviderRegistry> {
        &self.providers
    }

    /// Execute `workflow` to completion and return its result. This method
    /// does not fail: every outcome, including input rejection and node
    /// failures, is reported through the [`WorkflowResult`].
    pub async fn run(
        &self,
        workflow: &Workflow,
        input_data: DataMap,
        correlation_id: Option<String>,
    ) -> WorkflowResult {
        let correlation_id = correlation_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let created_at = Utc::now();
        let chain = Arc::new(MiddlewareChain::new(self.middleware.clone()));
        let hook_ctx = HookContext {
            workflow_id: workflow.workflow_id().to_string(),
            correlation_id: correlation_id.clone(),
            workflow_name: workflow.name().to_string(),
        };

        if let Err(err) = safety::validate_input_data(&input_data) {
            tracing::warn!(
                workflow_id = %workflow.workflow_id(),
                correlation_id = %correlation_id,
                error = %err,
                "workflow input rejected"
            );
            let result = WorkflowResult::failure(
                workflow.workflow_id(),
                &correlation_id,
                err.to_string(),
                ExecutionMetrics::default(),
                created_at,
            );
            chain.on_workflow_end(&result, &hook_ctx).await;
            return result;
        }

        chain.on_workflow_start(&hook_ctx).await;
        tracing::info!(
            workflow_id = %workflow.workflow_id(),
            correlation_id = %correlation_id,
            workflow_name = %workflow.name(),
            nodes = workflow.nodes().len(),
            "workflow started"
        );

        let env = RuntimeEnv {
            providers: self.providers.clone(),
            middleware: chain.clone(),
            retry: self.config.retry_policy(),
            framework: self.config.clone(),
        };

        let start = Instant::now();
        let mut metrics = ExecutionMetrics::default();
        let mut tracker = TokenUsageTracker::new();
        let mut accumulated = DataMap::new();

        for node in workflow.nodes() {
            let context = NodeContext {
                workflow_id: workflow.workflow_id().to_string(),
                workflow_name: workflow.name().to_string(),
                step_id: Uuid::new_v4().to_string(),
                correlation_id: correlation_id.clone(),
                input_data: input_data.clone(),
                previous_outputs: accumulated.clone(),
                config: workflow.config().clone(),
                env: env.clone(),
            };

            tracing::debug!(node = %node.name(), step_id = %context.step_id, "node started");
            let node_start = Instant::now();
            let result = match AssertUnwindSafe(node.execute(&context)).catch_unwind().await {
                Ok(result) => result,
                Err(_) => NodeResult::failed(
                    &context.step_id,
                    format!("Node '{}' panicked", node.name()),
                    node_start.elapsed().as_secs_f64() * 1000.0,
                ),
            };

            metrics
                .node_durations
                .insert(node.name().to_string(), result.duration_ms);
            if let Some(usage) = &result.token_usage {
                tracker.record(node.name(), usage);
            }

            if result.status == NodeStatus::Failed {
                let error = result.error.unwrap_or_else(|| "unknown error".into());
                metrics.nodes_failed += 1;
                chain.on_node_error(node.name(), &error, &hook_ctx).await;

                if node.is_critical() {
                    tracing::error!(
                        workflow_id = %workflow.workflow_id(),
                        node = %node.name(),
                        error = %error,
                        "critical node failed; aborting workflow"
                    );
                    metrics.total_duration_ms = start.elapsed().as_secs_f64() * 1000.0;
                    finalize_token_metrics(&mut metrics, &tracker);
                    let message = WorkflowError::NodeFailed {
                        node_name: node.name().to_string(),
                        error,
                    }
                    .to_string();
                    let result = WorkflowResult::failure(
                        workflow.workflow_id(),
                        &correlation_id,
                        message,
                        metrics,
                        created_at,
                    );
                    chain.on_workflow_end(&result, &hook_ctx).await;
                    return result;
                }

                // Non-critical failures count as both failed and skipped:
                // the node failed, and its slot in the pipeline was skipped.
                metrics.nodes_skipped += 1;
                tracing::warn!(
                    workflow_id = %workflow.workflow_id(),
                    node = %node.name(),
                    error = %error,
                    "non-critical node failed; continuing"
                );
                continue;
            }

            metrics.nodes_completed += 1;
            if let Some(output) = result.output {
                accumulated.extend(output);
            }
        }

        metrics.total_duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        finalize_token_metrics(&mut metrics, &tracker);
        tracing::info!(
            workflow_id = %workflow.workflow_id(),
            correlation_id = %correlation_id,
            duration_ms = metrics.total_duration_ms,
            total_tokens = metrics
                .token_usage_total
                .as_ref()
                .map(|u| u.total_tokens)
                .unwrap_or(0),
            "workflow completed"
        );

        let result = WorkflowResult {
            workflow_id: workflow.workflow_id().to_string(),
            correlation_id,
            status: WorkflowStatus::Completed,
            output: if accumulated.is_empty() {
                None
            } else {
                Some(accumulated)
            },
            error: None,
            metrics,
            created_at,
            completed_at: Some(Utc::now()),
        };
        chain.on_workflow_end(&result, &hook_ctx).await;
        result
    }
}

fn finalize_token_metrics(metrics: &mut ExecutionMetrics, tracker: &TokenUsageTracker) {
    metrics.token_usage_total = tracker.total().cloned();
    metrics.node_token_usage = tracker.all_node_usage().clone();
}
