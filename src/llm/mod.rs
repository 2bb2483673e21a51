//! LLM integration for the inbox agent.
//!
//! Supports:
//! - **OpenAI**: Direct API access via rig-core
//! - **Gemini**: Direct API access via rig-core
//!
//! Uses the rig-core crate for HTTP transport and the `RigAdapter` to bridge
//! rig's `CompletionModel` trait to our `LlmProvider` trait. Exactly one
//! backend is selected at startup. Without a credential for it,
//! [`Generator`] runs in mock mode and never touches the network.

pub mod extract;
pub mod provider;
mod rig_adapter;
pub mod service;
#[cfg(test)]
pub(crate) mod testing;

pub use extract::extract_json;
pub use provider::*;
pub use rig_adapter::RigAdapter;
pub use service::{Generation, Generator, MOCK_RESPONSE};

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rig::client::CompletionClient;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{ConfigError, LlmError};

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAi,
    Gemini,
}

impl LlmBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }
}

impl FromStr for LlmBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            other => Err(ConfigError::InvalidValue {
                key: "LLM_PROVIDER".into(),
                message: format!("unsupported provider '{other}' (expected openai or gemini)"),
            }),
        }
    }
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    /// Credential for `backend`. `None` selects mock mode.
    pub api_key: Option<SecretString>,
    pub model: String,
    /// API root override.
    pub base_url: Option<String>,
    /// Upper bound on each backend call.
    pub timeout: Duration,
}

/// Create the provider for the configured backend.
///
/// Returns `Ok(None)` when no credential is configured.
pub fn create_provider(config: &LlmConfig) -> Result<Option<Arc<dyn LlmProvider>>, LlmError> {
    let Some(api_key) = config.api_key.as_ref() else {
        tracing::warn!(
            backend = config.backend.as_str(),
            "No API key configured, LLM calls will return mock responses"
        );
        return Ok(None);
    };

    let provider = match config.backend {
        LlmBackend::OpenAi => create_openai_provider(config, api_key)?,
        LlmBackend::Gemini => create_gemini_provider(config, api_key)?,
    };

    tracing::info!(
        "Using {} (model: {})",
        config.backend.as_str(),
        provider.model_name()
    );
    Ok(Some(provider))
}

fn client_error(provider: &str, e: impl Display) -> LlmError {
    LlmError::RequestFailed {
        provider: provider.to_string(),
        reason: format!("Failed to create client: {e}"),
    }
}

fn create_openai_provider(
    config: &LlmConfig,
    api_key: &SecretString,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::openai;

    let client: rig::client::Client<openai::client::OpenAIResponsesExt> = match &config.base_url {
        Some(url) => openai::Client::builder()
            .api_key(api_key.expose_secret())
            .base_url(url.as_str())
            .build()
            .map_err(|e| client_error("openai", e))?,
        None => openai::Client::new(api_key.expose_secret())
            .map_err(|e| client_error("openai", e))?,
    };

    let model = client.completion_model(&config.model);
    Ok(Arc::new(RigAdapter::new(
        model,
        "openai",
        &config.model,
        config.timeout,
    )))
}

fn create_gemini_provider(
    config: &LlmConfig,
    api_key: &SecretString,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::gemini;

    // rig builds the `models/{id}` resource path itself.
    let model_id = config
        .model
        .strip_prefix("models/")
        .unwrap_or(&config.model);

    let client: gemini::Client = match &config.base_url {
        Some(url) => gemini::Client::builder()
            .api_key(api_key.expose_secret())
            .base_url(url.as_str())
            .build()
            .map_err(|e| client_error("gemini", e))?,
        None => gemini::Client::new(api_key.expose_secret())
            .map_err(|e| client_error("gemini", e))?,
    };

    let model = client.completion_model(model_id);
    Ok(Arc::new(RigAdapter::new(
        model,
        "gemini",
        model_id,
        config.timeout,
    )))
}

/// Build the adapter for the configured backend.
pub fn create_generator(config: &LlmConfig) -> Result<Generator, LlmError> {
    Ok(Generator::from_provider(create_provider(config)?))
}
