//! Error types shared across the crate.
//!
//! Each subsystem keeps its own enum: [`crate::evaluator::ExpressionError`]
//! for the expression language and [`crate::llm::LlmError`] for provider
//! calls live next to their modules; the node/workflow/plugin errors that
//! cross module boundaries live here.

mod node_error;
mod plugin_error;
mod workflow_error;

pub use node_error::NodeError;
pub use plugin_error::PluginError;
pub use workflow_error::WorkflowError;
