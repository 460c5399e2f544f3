//! Workflow definition and public execution surface.

mod model;
pub(crate) mod safety;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

pub use model::{
    DataMap, ExecutionMetrics, NodeContext, NodeResult, NodeStatus, RuntimeEnv, WorkflowConfig,
    WorkflowResult, WorkflowStatus,
};
pub use safety::detect_pii;

use crate::engine::WorkflowEngine;
use crate::error::WorkflowError;
use crate::nodes::WorkflowNode;

/// An ordered multi-node LLM pipeline.
///
/// A workflow is a sequence of nodes executed strictly in declaration
/// order, each receiving the original input plus the accumulated outputs
/// of all prior nodes. The definition is immutable after construction and
/// cheap to clone (nodes are shared), so a run can be handed to a worker
/// thread by the blocking entry point.
///
/// ```rust,ignore
/// let workflow = Workflow::new(vec![prep, summarize, parse])?;
/// let result = workflow.run(input, None).await;
/// ```
#[derive(Clone)]
pub struct Workflow {
    nodes: Arc<[Arc<dyn WorkflowNode>]>,
    name: String,
    config: WorkflowConfig,
    workflow_id: String,
}

impl Workflow {
    /// Create a workflow from an ordered, non-empty node list.
    ///
    /// Fails if the list is empty, any node name is empty, or two nodes
    /// share a name.
    pub fn new(nodes: Vec<Arc<dyn WorkflowNode>>) -> Result<Self, WorkflowError> {
        if nodes.is_empty() {
            return Err(WorkflowError::EmptyWorkflow);
        }
        let mut seen = HashSet::new();
        for node in &nodes {
            if node.name().is_empty() {
                return Err(WorkflowError::UnnamedNode);
            }
            if !seen.insert(node.name().to_string()) {
                return Err(WorkflowError::DuplicateNodeName(node.name().to_string()));
            }
        }
        Ok(Self {
            nodes: nodes.into(),
            name: String::new(),
            config: WorkflowConfig::default(),
            workflow_id: Uuid::new_v4().to_string(),
        })
    }

    /// Human-readable name used in logs and metrics.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Per-workflow configuration overrides.
    pub fn with_config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn nodes(&self) -> &[Arc<dyn WorkflowNode>] {
        &self.nodes
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// Execute the workflow asynchronously (non-blocking) with a default
    /// engine backed by the global provider registry. Use a
    /// [`WorkflowEngine`] directly for custom configuration or middleware.
    pub async fn run(&self, input_data: DataMap, correlation_id: Option<String>) -> WorkflowResult {
        WorkflowEngine::default().run(self, input_data, correlation_id).await
    }

    /// Execute the workflow synchronously (blocking) with an optional
    /// deadline. If the deadline elapses first the caller receives a
    /// TIMEOUT result immediately; the in-flight run keeps going on a
    /// worker thread and its outcome is discarded.
    pub fn run_blocking(
        &self,
        input_data: DataMap,
        timeout: Option<Duration>,
        correlation_id: Option<String>,
    ) -> WorkflowResult {
        WorkflowEngine::default().run_blocking(self, input_data, timeout, correlation_id)
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.name)
            .field("workflow_id", &self.workflow_id)
            .field(
                "nodes",
                &self.nodes.iter().map(|n| n.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
