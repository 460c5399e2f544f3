//! Mock LLM provider for zero-cost testing.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{LlmError, LlmProvider, LlmRequest, LlmResponse, TokenUsage};

/// Canned-response provider. Looks responses up by exact prompt text,
/// falling back to the `"default"` key. Token counts are simulated from
/// text length. Optionally fails every call with a configured error, or
/// sleeps to simulate latency (useful for timeout tests).
///
/// ```rust,ignore
/// let mock = MockProvider::new([("default".into(), "Mock response.".into())].into());
/// ProviderRegistry::global().register("mock", Arc::new(mock))?;
/// ```
pub struct MockProvider {
    responses: HashMap<String, String>,
    fail_with: Option<LlmError>,
    delay: Option<Duration>,
    call_log: Mutex<Vec<LlmRequest>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(HashMap::from([(
            "default".to_string(),
            "Mock LLM response.".to_string(),
        )]))
    }
}

impl MockProvider {
    pub fn new(responses: HashMap<String, String>) -> Self {
        Self {
            responses,
            fail_with: None,
            delay: None,
            call_log: Mutex::new(Vec::new()),
        }
    }

    /// Fail every call with `error` instead of responding.
    pub fn failing_with(error: LlmError) -> Self {
        Self {
            fail_with: Some(error),
            ..Self::default()
        }
    }

    /// Sleep for `delay` before responding.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of calls received.
    pub fn call_count(&self) -> usize {
        self.call_log.lock().len()
    }

    /// All requests received, in order.
    pub fn call_log(&self) -> Vec<LlmRequest> {
        self.call_log.lock().clone()
    }

    /// Clear the call log.
    pub fn reset(&self) {
        self.call_log.lock().clear();
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.call_log.lock().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }

        let content = self
            .responses
            .get(&request.prompt)
            .or_else(|| self.responses.get("default"))
            .cloned()
            .unwrap_or_default();

        // Rough token approximation: one token per four characters.
        let prompt_tokens = (request.prompt.len() as u64 / 4).max(1);
        let completion_tokens = (content.len() as u64 / 4).max(1);

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: TokenUsage::new(prompt_tokens, completion_tokens, &request.model, "mock"),
            latency_ms: 0.1,
            finish_reason: "stop".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> LlmRequest {
        LlmRequest {
            prompt: prompt.into(),
            model: "gpt-4o-mini".into(),
            temperature: 0.7,
            max_tokens: 1024,
            system_prompt: None,
            extra_params: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_default_response_and_usage() {
        let mock = MockProvider::default();
        let resp = mock.complete(&request("anything")).await.unwrap();
        assert_eq!(resp.content, "Mock LLM response.");
        assert_eq!(resp.usage.provider, "mock");
        assert_eq!(
            resp.usage.total_tokens,
            resp.usage.prompt_tokens + resp.usage.completion_tokens
        );
    }

    #[tokio::test]
    async fn test_prompt_keyed_response() {
        let mock = MockProvider::new(HashMap::from([
            ("hello".to_string(), "hi there".to_string()),
            ("default".to_string(), "fallback".to_string()),
        ]));
        assert_eq!(
            mock.complete(&request("hello")).await.unwrap().content,
            "hi there"
        );
        assert_eq!(
            mock.complete(&request("other")).await.unwrap().content,
            "fallback"
        );
    }

    #[tokio::test]
    async fn test_call_log_and_reset() {
        let mock = MockProvider::default();
        mock.complete(&request("a")).await.unwrap();
        mock.complete(&request("b")).await.unwrap();
        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.call_log()[1].prompt, "b");
        mock.reset();
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failing_provider() {
        let mock = MockProvider::failing_with(LlmError::Authentication("nope".into()));
        let err = mock.complete(&request("x")).await.unwrap_err();
        assert!(matches!(err, LlmError::Authentication(_)));
        // Failed calls are still logged.
        assert_eq!(mock.call_count(), 1);
    }
}
