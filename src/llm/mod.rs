//! LLM provider abstraction: the [`LlmProvider`] trait, provider
//! registry, retry policy, request/response types, and a mock provider
//! for tests.

mod error;
mod mock;
mod registry;
mod retry;
mod types;

pub use error::LlmError;
pub use mock::MockProvider;
pub use registry::ProviderRegistry;
pub use retry::RetryPolicy;
pub use types::{LlmRequest, LlmResponse, TokenUsage};

use async_trait::async_trait;

/// A backend capable of LLM completions. Implementations are registered
/// with a [`ProviderRegistry`] and looked up by name at node execution
/// time.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Stable provider name, used as the registry key.
    fn name(&self) -> &str;

    /// Perform a single completion call. Transient failures should map to
    /// retryable [`LlmError`] variants so the retry policy can act on them.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;
}

impl std::fmt::Debug for dyn LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmProvider")
            .field("name", &self.name())
            .finish()
    }
}
