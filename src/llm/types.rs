//! Data types for LLM provider calls.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token consumption record for a single LLM operation.
///
/// Invariant: `total_tokens == prompt_tokens + completion_tokens`. The
/// constructors derive the total, and [`TokenUsage::combine`] re-derives it
/// after summation, so the invariant survives aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    /// Model name used for this operation.
    pub model: String,
    /// Provider name (e.g. "openai", "mock").
    pub provider: String,
}

impl TokenUsage {
    pub fn new(
        prompt_tokens: u64,
        completion_tokens: u64,
        model: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            model: model.into(),
            provider: provider.into(),
        }
    }

    /// Pairwise sum of prompt/completion counts with the total re-derived;
    /// model and provider are taken from the most recent record (`other`).
    pub fn combine(&self, other: &TokenUsage) -> TokenUsage {
        TokenUsage::new(
            self.prompt_tokens + other.prompt_tokens,
            self.completion_tokens + other.completion_tokens,
            other.model.clone(),
            other.provider.clone(),
        )
    }
}

/// Input specification for an LLM completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// Rendered prompt text.
    pub prompt: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Optional system message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Provider-specific passthrough parameters.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra_params: HashMap<String, Value>,
}

/// Output from an LLM completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Generated text content.
    pub content: String,
    /// Actual model used (may differ from the request if aliased).
    pub model: String,
    pub usage: TokenUsage,
    /// Provider round-trip time in milliseconds.
    pub latency_ms: f64,
    /// Completion reason (e.g. "stop", "length").
    pub finish_reason: String,
}
