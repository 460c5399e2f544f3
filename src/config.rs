//! Framework-level configuration.
//!
//! [`FrameworkConfig`] holds the defaults applied when a workflow does not
//! override them: model parameters for LLM nodes, retry bounds, and an
//! optional wall-clock deadline for blocking runs. Values can also be
//! sourced from `GENAI_WORKFLOW_*` environment variables.

use std::env;
use std::time::Duration;

use crate::llm::RetryPolicy;

#[derive(Debug, Clone)]
pub struct FrameworkConfig {
    /// Model used by LLM nodes when the workflow config does not name one.
    pub default_model: String,
    pub default_temperature: f64,
    pub default_max_tokens: u32,
    /// Deadline applied by blocking runs when the caller passes none.
    pub default_timeout: Option<Duration>,
    pub max_retry_attempts: u32,
    pub retry_backoff_factor: f64,
    /// Log rendered prompts at debug level. Off by default: prompts may
    /// contain user data.
    pub log_prompts: bool,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            default_model: "gpt-4o-mini".to_string(),
            default_temperature: 0.7,
            default_max_tokens: 1024,
            default_timeout: None,
            max_retry_attempts: 3,
            retry_backoff_factor: 2.0,
            log_prompts: false,
        }
    }
}

impl FrameworkConfig {
    /// Build a config from `GENAI_WORKFLOW_*` environment variables,
    /// falling back to the defaults for anything unset or unparseable.
    ///
    /// Recognized variables: `GENAI_WORKFLOW_DEFAULT_MODEL`,
    /// `GENAI_WORKFLOW_DEFAULT_TEMPERATURE`,
    /// `GENAI_WORKFLOW_DEFAULT_MAX_TOKENS`,
    /// `GENAI_WORKFLOW_DEFAULT_TIMEOUT_SECS`,
    /// `GENAI_WORKFLOW_MAX_RETRY_ATTEMPTS`,
    /// `GENAI_WORKFLOW_RETRY_BACKOFF_FACTOR`,
    /// `GENAI_WORKFLOW_LOG_PROMPTS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(model) = env_var("GENAI_WORKFLOW_DEFAULT_MODEL") {
            config.default_model = model;
        }
        if let Some(temp) = env_parse::<f64>("GENAI_WORKFLOW_DEFAULT_TEMPERATURE") {
            config.default_temperature = temp;
        }
        if let Some(tokens) = env_parse::<u32>("GENAI_WORKFLOW_DEFAULT_MAX_TOKENS") {
            config.default_max_tokens = tokens;
        }
        if let Some(secs) = env_parse::<f64>("GENAI_WORKFLOW_DEFAULT_TIMEOUT_SECS") {
            if secs > 0.0 {
                config.default_timeout = Some(Duration::from_secs_f64(secs));
            }
        }
        if let Some(attempts) = env_parse::<u32>("GENAI_WORKFLOW_MAX_RETRY_ATTEMPTS") {
            config.max_retry_attempts = attempts;
        }
        if let Some(factor) = env_parse::<f64>("GENAI_WORKFLOW_RETRY_BACKOFF_FACTOR") {
            config.retry_backoff_factor = factor;
        }
        if let Some(flag) = env_var("GENAI_WORKFLOW_LOG_PROMPTS") {
            config.log_prompts = matches!(flag.as_str(), "1" | "true" | "yes");
        }
        config
    }

    /// Retry policy derived from this config's attempt/backoff settings.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retry_attempts, self.retry_backoff_factor)
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_var(name)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FrameworkConfig::default();
        assert_eq!(config.default_model, "gpt-4o-mini");
        assert_eq!(config.default_temperature, 0.7);
        assert_eq!(config.default_max_tokens, 1024);
        assert!(config.default_timeout.is_none());
        assert_eq!(config.max_retry_attempts, 3);
        assert!(!config.log_prompts);
    }

    #[test]
    fn test_retry_policy_derived_from_config() {
        let config = FrameworkConfig {
            max_retry_attempts: 5,
            retry_backoff_factor: 3.0,
            ..FrameworkConfig::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff_factor, 3.0);
    }

    // Environment-variable reads are process-global, so from_env is
    // covered with variables unlikely to collide between test binaries.
    #[test]
    fn test_from_env_overrides() {
        std::env::set_var("GENAI_WORKFLOW_DEFAULT_MODEL", "test-model");
        std::env::set_var("GENAI_WORKFLOW_DEFAULT_MAX_TOKENS", "256");
        std::env::set_var("GENAI_WORKFLOW_LOG_PROMPTS", "true");
        std::env::set_var("GENAI_WORKFLOW_DEFAULT_TEMPERATURE", "not-a-number");

        let config = FrameworkConfig::from_env();
        assert_eq!(config.default_model, "test-model");
        assert_eq!(config.default_max_tokens, 256);
        assert!(config.log_prompts);
        // unparseable values fall back to the default
        assert_eq!(config.default_temperature, 0.7);

        std::env::remove_var("GENAI_WORKFLOW_DEFAULT_MODEL");
        std::env::remove_var("GENAI_WORKFLOW_DEFAULT_MAX_TOKENS");
        std::env::remove_var("GENAI_WORKFLOW_LOG_PROMPTS");
        std::env::remove_var("GENAI_WORKFLOW_DEFAULT_TEMPERATURE");
    }
}
