//! Error types for the brain dump bot.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
///
/// None of these reach the sender: the classifier turns every one of them
/// into a fallback result.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Document store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Document store {store} is not configured")]
    NotConfigured { store: String },

    #[error("Write to {destination} failed: {reason}")]
    WriteFailed { destination: String, reason: String },

    #[error("Document store {store} rejected the write with HTTP {status}: {body}")]
    Rejected {
        store: String,
        status: u16,
        body: String,
    },
}

/// Chat channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} is not configured")]
    NotConfigured { name: String },

    #[error("Failed to send message on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Channel health check failed for {name}: {reason}")]
    HealthCheckFailed { name: String, reason: String },

    #[error("Webhook registration failed for {name}: {reason}")]
    WebhookFailed { name: String, reason: String },
}
