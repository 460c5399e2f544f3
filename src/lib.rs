//! # genai-workflow — a multi-node generative-AI pipeline engine
//!
//! `genai_workflow` is a library for defining and running multi-node LLM
//! pipelines. A workflow is an ordered sequence of nodes executed strictly
//! in declaration order, with outputs accumulating from one node to the
//! next. It provides:
//!
//! - **Node execution**: transform nodes (pure data mapping), LLM nodes
//!   (prompt template + provider call), and conditional nodes that branch
//!   on a sandboxed expression and run nested node lists.
//! - **Failure policy**: critical node failures abort the run; non-critical
//!   failures are recorded in metrics and execution continues.
//! - **Retry**: transient provider errors (timeouts, rate limits, 5xx) are
//!   retried with exponential backoff; auth and bad-request errors surface
//!   immediately.
//! - **Middleware**: FIFO lifecycle hooks around LLM calls and workflow
//!   start/end/error, with explicit `Proceed`/`Replace`/`Abort` outcomes.
//! - **Observability**: per-node durations and token usage folded into
//!   [`ExecutionMetrics`], structured `tracing` events throughout.
//! - **Sync/async bridging**: a non-blocking entry point for async callers
//!   and a blocking one that detects an active runtime and delegates to an
//!   isolated worker thread, with optional deadline.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use genai_workflow::{LlmNode, MockProvider, ProviderRegistry, Workflow, WorkflowConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     ProviderRegistry::global()
//!         .register("mock", Arc::new(MockProvider::default()))
//!         .unwrap();
//!
//!     let workflow = Workflow::new(vec![Arc::new(
//!         LlmNode::new("summarize", "Summarize in one sentence: {text}").unwrap(),
//!     )])
//!     .unwrap()
//!     .with_config(WorkflowConfig {
//!         provider: "mock".into(),
//!         ..WorkflowConfig::default()
//!     });
//!
//!     let result = workflow
//!         .run(
//!             [("text".to_string(), serde_json::json!("hello world"))].into(),
//!             None,
//!         )
//!         .await;
//!     println!("{:?}", result.status);
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod llm;
pub mod middleware;
pub mod nodes;
pub mod observability;
pub mod workflow;

pub use config::FrameworkConfig;
pub use engine::WorkflowEngine;
pub use error::{NodeError, PluginError, WorkflowError};
pub use evaluator::{EvalLimits, Expression, ExpressionError};
pub use llm::{
    LlmError, LlmProvider, LlmRequest, LlmResponse, MockProvider, ProviderRegistry, RetryPolicy,
    TokenUsage,
};
pub use middleware::{HookAction, HookContext, Middleware, MiddlewareChain};
pub use nodes::{ConditionalNode, LlmNode, TransformNode, WorkflowNode};
pub use observability::TokenUsageTracker;
pub use workflow::{
    detect_pii, DataMap, ExecutionMetrics, NodeContext, NodeResult, NodeStatus, Workflow,
    WorkflowConfig, WorkflowResult, WorkflowStatus,
};
