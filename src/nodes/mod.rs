//! Workflow node types: the [`WorkflowNode`] trait and the built-in
//! transform, LLM, and conditional nodes.

mod control_flow;
mod llm;
mod transform;

pub use control_flow::ConditionalNode;
pub use llm::LlmNode;
pub use transform::TransformNode;

use async_trait::async_trait;

use crate::workflow::{NodeContext, NodeResult};

/// A single step in a workflow pipeline.
///
/// Nodes are stateless with respect to the run: all inputs arrive through
/// the [`NodeContext`] and all effects leave through the returned
/// [`NodeResult`]. Failures are reported as FAILED results, never as
/// panics; the engine additionally contains panics from buggy
/// implementations.
#[async_trait]
pub trait WorkflowNode: Send + Sync {
    /// Node name, unique within a workflow. Used in logs, metrics, and
    /// output keys.
    fn name(&self) -> &str;

    /// Whether a failure of this node aborts the workflow. Non-critical
    /// node failures are recorded and skipped.
    fn is_critical(&self) -> bool {
        true
    }

    async fn execute(&self, context: &NodeContext) -> NodeResult;
}
