//! Bridges rig's `CompletionModel` to our `LlmProvider` trait.

use std::time::Duration;

use async_trait::async_trait;
use rig::completion::{CompletionError, CompletionModel};
use rig::message::{AssistantContent, Message};

use crate::error::LlmError;
use crate::llm::provider::{CompletionRequest, CompletionResponse, LlmProvider};

/// Wraps a rig completion model. One request per call, bounded by `timeout`.
pub struct RigAdapter<M> {
    model: M,
    provider: &'static str,
    model_name: String,
    timeout: Duration,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, provider: &'static str, model_name: &str, timeout: Duration) -> Self {
        Self {
            model,
            provider,
            model_name: model_name.to_string(),
            timeout,
        }
    }
}

/// Concatenated text parts of a choice. `None` when no text came back,
/// e.g. a candidate blocked by a safety filter.
fn collect_text<'a>(parts: impl IntoIterator<Item = &'a AssistantContent>) -> Option<String> {
    let text: String = parts
        .into_iter()
        .filter_map(|part| match part {
            AssistantContent::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

fn map_completion_error(provider: &str, e: CompletionError) -> LlmError {
    match e {
        CompletionError::ResponseError(reason) => LlmError::InvalidResponse {
            provider: provider.to_string(),
            reason,
        },
        other => LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: other.to_string(),
        },
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    fn provider_name(&self) -> &str {
        self.provider
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let call = self
            .model
            .completion_request(Message::user(request.prompt))
            .preamble(request.system)
            .send();

        let response = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| LlmError::RequestFailed {
                provider: self.provider.to_string(),
                reason: format!("timed out after {}s", self.timeout.as_secs()),
            })?
            .map_err(|e| map_completion_error(self.provider, e))?;

        let content =
            collect_text(response.choice.iter()).ok_or_else(|| LlmError::InvalidResponse {
                provider: self.provider.to_string(),
                reason: "response contained no text".to_string(),
            })?;

        Ok(CompletionResponse {
            content,
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_parts_are_concatenated() {
        let parts = vec![AssistantContent::text("Impor"), AssistantContent::text("tant")];
        assert_eq!(collect_text(&parts).as_deref(), Some("Important"));
    }

    #[test]
    fn no_text_parts_is_none() {
        let parts: Vec<AssistantContent> = Vec::new();
        assert!(collect_text(&parts).is_none());

        let blank = vec![AssistantContent::text("  \n")];
        assert!(collect_text(&blank).is_none());
    }

    #[test]
    fn response_error_maps_to_invalid_response() {
        let err = map_completion_error(
            "gemini",
            CompletionError::ResponseError("no candidates".into()),
        );
        assert!(matches!(err, LlmError::InvalidResponse { .. }));

        let err = map_completion_error("openai", CompletionError::ProviderError("boom".into()));
        assert!(matches!(err, LlmError::RequestFailed { .. }));
        assert!(err.to_string().contains("boom"));
    }
}
