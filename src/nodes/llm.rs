//! LLM completion node.

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Instant;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::error::NodeError;
use crate::llm::{LlmError, LlmRequest};
use crate::workflow::{DataMap, NodeContext, NodeResult};

use super::WorkflowNode;

/// Renders a prompt template against the merged variables, calls the
/// configured provider (with retries and middleware hooks), and emits the
/// completion under two keys: `"<name>_output"` and `"llm_response"`.
///
/// Templates reference variables as `{variable}`. A placeholder with no
/// matching variable fails the node before any provider call is made.
pub struct LlmNode {
    name: String,
    prompt_template: String,
    provider_override: Option<String>,
    critical: bool,
}

impl LlmNode {
    pub fn new(name: impl Into<String>, prompt_template: impl Into<String>) -> Result<Self, NodeError> {
        let name = name.into();
        let prompt_template = prompt_template.into();
        if name.is_empty() {
            return Err(NodeError::ConfigError("node name cannot be empty".into()));
        }
        if prompt_template.is_empty() {
            return Err(NodeError::ConfigError(
                "prompt template cannot be empty".into(),
            ));
        }
        Ok(Self {
            name,
            prompt_template,
            provider_override: None,
            critical: true,
        })
    }

    /// Use a specific provider for this node instead of the workflow's
    /// configured one.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider_override = Some(provider.into());
        self
    }

    /// Mark this node non-critical: its failure is recorded and skipped
    /// instead of aborting the workflow.
    pub fn non_critical(mut self) -> Self {
        self.critical = false;
        self
    }

    fn render_prompt(&self, vars: &DataMap) -> Result<String, NodeError> {
        static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
        let placeholder = PLACEHOLDER
            .get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

        let mut rendered = String::with_capacity(self.prompt_template.len());
        let mut last = 0;
        for captures in placeholder.captures_iter(&self.prompt_template) {
            let whole = captures.get(0).unwrap();
            let key = &captures[1];
            let value = vars
                .get(key)
                .ok_or_else(|| NodeError::MissingTemplateVariable(key.to_string()))?;
            rendered.push_str(&self.prompt_template[last..whole.start()]);
            rendered.push_str(&render_value(value));
            last = whole.end();
        }
        rendered.push_str(&self.prompt_template[last..]);
        Ok(rendered)
    }
}

/// Strings interpolate raw; everything else as compact JSON.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl WorkflowNode for LlmNode {
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

        let prompt = match self.render_prompt(&context.merged_vars()) {
            Ok(prompt) => prompt,
            Err(err) => return fail(err.to_string()),
        };
        if context.env.framework.log_prompts {
            tracing::debug!(node = %self.name, prompt = %prompt, "rendered prompt");
        }

        let provider_name = self
            .provider_override
            .as_deref()
            .unwrap_or(&context.config.provider);
        let provider = match context.env.providers.get(provider_name) {
            Ok(provider) => provider,
            Err(err) => return fail(err.to_string()),
        };

        let defaults = &context.env.framework;
        let request = LlmRequest {
            prompt,
            model: context
                .config
                .model
                .clone()
                .unwrap_or_else(|| defaults.default_model.clone()),
            temperature: context
                .config
                .temperature
                .unwrap_or(defaults.default_temperature),
            max_tokens: context.config.max_tokens.unwrap_or(defaults.default_max_tokens),
            system_prompt: None,
            extra_params: HashMap::new(),
        };

        let hook_ctx = context.hook_context();
        let request = match context
            .env
            .middleware
            .before_llm_call(request, &hook_ctx)
            .await
        {
            Ok(request) => request,
            Err(reason) => {
                return fail(NodeError::ProviderError(LlmError::Aborted(reason)).to_string())
            }
        };

        let response = match context.env.retry.run(|| provider.complete(&request)).await {
            Ok(response) => response,
            Err(err) => return fail(NodeError::ProviderError(err).to_string()),
        };
        let response = context
            .env
            .middleware
            .after_llm_call(response, &hook_ctx)
            .await;

        let output: DataMap = [
            (
                format!("{}_output", self.name),
                Value::String(response.content.clone()),
            ),
            ("llm_response".to_string(), Value::String(response.content)),
        ]
        .into();
        NodeResult::completed_with_usage(
            &context.step_id,
            output,
            start.elapsed().as_secs_f64() * 1000.0,
            Some(response.usage),
        )
    }
}
