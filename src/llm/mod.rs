//! LLM integration for the brain dump bot.
//!
//! Supports:
//! - **Anthropic**: Messages API via rig-core
//! - **OpenAI**: Responses API via rig-core
//!
//! Uses the rig-core crate for HTTP transport and the `RigAdapter` to bridge
//! rig's `CompletionModel` trait to our `LlmProvider` trait, so the
//! classifier never knows which backend it has.

pub mod provider;
mod rig_adapter;

pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;
use std::time::Duration;

use rig::client::CompletionClient;
use secrecy::ExposeSecret;

use crate::error::LlmError;

/// Default model when none is configured, per backend.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-haiku-20240307";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Default request timeout for classification calls.
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(30);

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

impl LlmBackend {
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Anthropic => DEFAULT_ANTHROPIC_MODEL,
            Self::OpenAi => DEFAULT_OPENAI_MODEL,
        }
    }

    /// Environment variable holding this backend's API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
    /// Endpoint override (proxies, compatible servers, tests).
    pub base_url: Option<String>,
    pub timeout: Duration,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.backend {
        LlmBackend::Anthropic => create_anthropic_provider(config),
        LlmBackend::OpenAi => create_openai_provider(config),
    }
}

fn create_anthropic_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::anthropic;

    let mut builder = anthropic::Client::builder().api_key(config.api_key.expose_secret());
    if let Some(base_url) = &config.base_url {
        builder = builder.base_url(base_url.as_str());
    }
    let client: rig::client::Client<anthropic::client::AnthropicExt> =
        builder.build().map_err(|e| LlmError::RequestFailed {
            provider: "anthropic".to_string(),
            reason: format!("Failed to create Anthropic client: {}", e),
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!("Using Anthropic (model: {})", config.model);
    Ok(Arc::new(RigAdapter::new(
        "anthropic",
        model,
        &config.model,
        config.timeout,
    )))
}

fn create_openai_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::openai;

    let mut builder = openai::Client::builder().api_key(config.api_key.expose_secret());
    if let Some(base_url) = &config.base_url {
        builder = builder.base_url(base_url.as_str());
    }
    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        builder.build().map_err(|e| LlmError::RequestFailed {
            provider: "openai".to_string(),
            reason: format!("Failed to create OpenAI client: {}", e),
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!("Using OpenAI (model: {})", config.model);
    Ok(Arc::new(RigAdapter::new(
        "openai",
        model,
        &config.model,
        config.timeout,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(backend: LlmBackend, model: &str) -> LlmConfig {
        LlmConfig {
            backend,
            api_key: secrecy::SecretString::from("test-key"),
            model: model.to_string(),
            base_url: None,
            timeout: DEFAULT_LLM_TIMEOUT,
        }
    }

    #[test]
    fn test_create_anthropic_provider() {
        // rig-core clients accept any string as API key at construction time.
        let provider = create_provider(&config(LlmBackend::Anthropic, DEFAULT_ANTHROPIC_MODEL));
        assert!(provider.is_ok());
        let provider = provider.unwrap();
        assert_eq!(provider.model_name(), "claude-3-haiku-20240307");
        assert_eq!(provider.provider_name(), "anthropic");
    }

    #[test]
    fn test_create_openai_provider() {
        let provider = create_provider(&config(LlmBackend::OpenAi, "gpt-4o")).unwrap();
        assert_eq!(provider.model_name(), "gpt-4o");
        assert_eq!(provider.provider_name(), "openai");
    }

    #[test]
    fn backend_defaults() {
        assert_eq!(LlmBackend::OpenAi.default_model(), "gpt-4o-mini");
        assert_eq!(LlmBackend::Anthropic.api_key_var(), "ANTHROPIC_API_KEY");
    }
}
