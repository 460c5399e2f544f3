//! Middleware hooks around workflow and LLM-call lifecycles.
//!
//! Hooks observe or steer execution at fixed points: workflow start/end,
//! node errors, and before/after each LLM call. A [`MiddlewareChain`]
//! drives every registered hook in registration order and isolates hook
//! panics so a misbehaving observer cannot take down a run.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;

use crate::llm::{LlmRequest, LlmResponse};
use crate::workflow::WorkflowResult;

/// Read-only identification passed to every hook invocation.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub workflow_id: String,
    pub correlation_id: String,
    pub workflow_name: String,
}

/// Outcome of a `before_llm_call` hook.
#[derive(Debug, Clone)]
pub enum HookAction {
    /// Let the call proceed with the request as seen.
    Proceed,
    /// Substitute a modified request for the remainder of the chain and
    /// the provider call.
    Replace(LlmRequest),
    /// Cancel the call before it reaches the provider. The node fails
    /// with the given reason.
    Abort(String),
}

/// Observer/interceptor for workflow execution. All methods have no-op
/// defaults; implement only the hooks you need.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Inspect or rewrite an LLM request before the provider call, or
    /// abort it entirely.
    async fn before_llm_call(&self, _request: &LlmRequest, _ctx: &HookContext) -> HookAction {
        HookAction::Proceed
    }

    /// Inspect or replace an LLM response after the provider call.
    /// Return `None` to leave the response unchanged.
    async fn after_llm_call(
        &self,
        _response: &LlmResponse,
        _ctx: &HookContext,
    ) -> Option<LlmResponse> {
        None
    }

    /// Called once when a workflow run begins, after input validation.
    async fn on_workflow_start(&self, _ctx: &HookContext) {}

    /// Called exactly once when a run reaches a terminal state.
    async fn on_workflow_end(&self, _result: &WorkflowResult, _ctx: &HookContext) {}

    /// Called when a node fails, before the engine decides whether to
    /// abort or continue.
    async fn on_node_error(&self, _node_name: &str, _error: &str, _ctx: &HookContext) {}
}

/// Ordered collection of middleware driven by the engine. Hooks run in
/// registration order; a panicking hook is logged and skipped.
#[derive(Default)]
pub struct MiddlewareChain {
    hooks: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new(hooks: Vec<Arc<dyn Middleware>>) -> Self {
        Self { hooks }
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run all `before_llm_call` hooks in order. Replacements thread
    /// through to later hooks; the first abort wins and short-circuits.
    pub async fn before_llm_call(
        &self,
        mut request: LlmRequest,
        ctx: &HookContext,
    ) -> Result<LlmRequest, String> {
        for hook in &self.hooks {
            let action = AssertUnwindSafe(hook.before_llm_call(&request, ctx))
                .catch_unwind()
                .await;
            match action {
                Ok(HookAction::Proceed) => {}
                Ok(HookAction::Replace(replacement)) => request = replacement,
                Ok(HookAction::Abort(reason)) => return Err(reason),
                Err(_) => {
                    tracing::warn!(
                        workflow_id = %ctx.workflow_id,
                        "before_llm_call hook panicked; skipping"
                    );
                }
            }
        }
        Ok(request)
    }

    /// Run all `after_llm_call` hooks in order, threading replacements.
    pub async fn after_llm_call(&self, mut response: LlmResponse, ctx: &HookContext) -> LlmResponse {
        for hook in &self.hooks {
            let outcome = AssertUnwindSafe(hook.after_llm_call(&response, ctx))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Some(replacement)) => response = replacement,
                Ok(None) => {}
                Err(_) => {
                    tracing::warn!(
                        workflow_id = %ctx.workflow_id,
                        "after_llm_call hook panicked; skipping"
                    );
                }
            }
        }
        response
    }

    pub async fn on_workflow_start(&self, ctx: &HookContext) {
        for hook in &self.hooks {
            if AssertUnwindSafe(hook.on_workflow_start(ctx))
                .catch_unwind()
                .await
                .is_err()
            {
                tracing::warn!(
                    workflow_id = %ctx.workflow_id,
                    "on_workflow_start hook panicked; skipping"
                );
            }
        }
    }

    pub async fn on_workflow_end(&self, result: &WorkflowResult, ctx: &HookContext) {
        for hook in &self.hooks {
            if AssertUnwindSafe(hook.on_workflow_end(result, ctx))
                .catch_unwind()
                .await
                .is_err()
            {
                tracing::warn!(
                    workflow_id = %ctx.workflow_id,
                    "on_workflow_end hook panicked; skipping"
                );
            }
        }
    }

    pub async fn on_node_error(&self, node_name: &str, error: &str, ctx: &HookContext) {
        for hook in &self.hooks {
            if AssertUnwindSafe(hook.on_node_error(node_name, error, ctx))
                .catch_unwind()
                .await
                .is_err()
            {
                tracing::warn!(
                    workflow_id = %ctx.workflow_id,
                    node = node_name,
                    "on_node_error hook panicked; skipping"
                );
            }
        }
    }
}
