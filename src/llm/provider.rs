//! Provider abstraction shared by every concrete text-generation backend.

use async_trait::async_trait;

use crate::error::LlmError;

/// A single-turn completion request: one system instruction, one user prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
        }
    }
}

/// Response from a completion call.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A text-generation backend.
///
/// Implementations issue exactly one request per call and never retry.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name used in logs and error messages.
    fn provider_name(&self) -> &str;

    /// Model identifier requests are sent to.
    fn model_name(&self) -> &str;

    /// Run a single completion.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
