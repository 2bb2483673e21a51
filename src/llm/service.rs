//! Generative backend adapter.
//!
//! Wraps the configured [`LlmProvider`] (or its absence) and turns every
//! call into text. Backend faults are captured as values and rendered into
//! an error string; they never propagate to callers.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::llm::extract::extract_json;
use crate::llm::provider::{CompletionRequest, LlmProvider};

/// Returned for every call when no credential is configured.
pub const MOCK_RESPONSE: &str = "Mock LLM Response: Please configure API Key.";

/// Prefix of the text returned when the backend call fails.
pub const ERROR_PREFIX: &str = "Error generating response: ";

pub const CATEGORIZATION_SYSTEM_PROMPT: &str = "You are an email categorization assistant.";
pub const EXTRACTION_SYSTEM_PROMPT: &str =
    "You are a task extraction assistant. Output valid JSON.";
pub const SUMMARIZATION_SYSTEM_PROMPT: &str = "You are an email summarization assistant.";
pub const DRAFTING_SYSTEM_PROMPT: &str = "You are an email drafting assistant.";
pub const CHAT_SYSTEM_PROMPT: &str = "You are a helpful email assistant.";

/// Outcome of a single generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    /// No credential configured; nothing was sent.
    Mock,
    /// Trimmed text returned by the backend.
    Text(String),
    /// The backend call failed; carries the fault description.
    BackendFault(String),
}

impl Generation {
    /// Render the outcome as the text callers store.
    pub fn into_text(self) -> String {
        match self {
            Self::Mock => MOCK_RESPONSE.to_string(),
            Self::Text(text) => text,
            Self::BackendFault(detail) => format!("{ERROR_PREFIX}{detail}"),
        }
    }
}

/// Uniform front for the one backend selected at startup.
#[derive(Clone)]
pub struct Generator {
    provider: Option<Arc<dyn LlmProvider>>,
}

impl Generator {
    /// Adapter backed by a real provider.
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// Adapter with no credential: every call returns [`MOCK_RESPONSE`].
    pub fn mock() -> Self {
        Self { provider: None }
    }

    /// Wrap an optional provider (`None` means mock mode).
    pub fn from_provider(provider: Option<Arc<dyn LlmProvider>>) -> Self {
        Self { provider }
    }

    pub fn is_mock(&self) -> bool {
        self.provider.is_none()
    }

    /// Model name of the configured backend, if any.
    pub fn model_name(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.model_name())
    }

    /// Run one request and report the outcome as a value.
    pub async fn generate_outcome(&self, prompt: &str, system_instruction: &str) -> Generation {
        let Some(provider) = self.provider.as_ref() else {
            warn!("No API key configured, returning mock response");
            return Generation::Mock;
        };

        let request = CompletionRequest::new(system_instruction, prompt);

        match provider.complete(request).await {
            Ok(response) => {
                debug!(
                    model = provider.model_name(),
                    input_tokens = response.input_tokens,
                    output_tokens = response.output_tokens,
                    "LLM call complete"
                );
                Generation::Text(response.content.trim().to_string())
            }
            Err(e) => {
                error!(
                    provider = provider.provider_name(),
                    model = provider.model_name(),
                    error = %e,
                    "LLM call failed"
                );
                Generation::BackendFault(e.to_string())
            }
        }
    }

    /// Generate text. Never fails: faults come back as error text.
    pub async fn generate(&self, prompt: &str, system_instruction: &str) -> String {
        self.generate_outcome(prompt, system_instruction)
            .await
            .into_text()
    }

    /// Generate and parse the JSON payload; `{}` when nothing parses.
    pub async fn generate_structured(&self, prompt: &str, system_instruction: &str) -> Value {
        let text = self.generate(prompt, system_instruction).await;
        extract_json(&text)
    }

    // ── Task helpers ────────────────────────────────────────────────

    pub async fn categorize_email(&self, content: &str, template: &str, instructions: &str) -> String {
        let prompt = task_prompt("Email Content", content, "Instructions", instructions, template);
        self.generate(&prompt, CATEGORIZATION_SYSTEM_PROMPT).await
    }

    pub async fn extract_action_items(&self, content: &str, template: &str, instructions: &str) -> Value {
        let prompt = task_prompt("Email Content", content, "Instructions", instructions, template);
        self.generate_structured(&prompt, EXTRACTION_SYSTEM_PROMPT)
            .await
    }

    pub async fn summarize_email(&self, content: &str, template: &str, instructions: &str) -> String {
        let prompt = task_prompt("Email Content", content, "Instructions", instructions, template);
        self.generate(&prompt, SUMMARIZATION_SYSTEM_PROMPT).await
    }

    pub async fn generate_draft(&self, content: &str, template: &str, instructions: &str) -> String {
        let prompt = task_prompt(
            "Original Email",
            content,
            "User Instructions",
            instructions,
            template,
        );
        self.generate(&prompt, DRAFTING_SYSTEM_PROMPT).await
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("model", &self.model_name())
            .finish()
    }
}

/// Lay out content, operator instructions and the template body.
///
/// The template is appended verbatim.
pub fn task_prompt(
    content_heading: &str,
    content: &str,
    instructions_heading: &str,
    instructions: &str,
    template: &str,
) -> String {
    format!(
        "{content_heading}:\n{content}\n\n{instructions_heading}:\n{instructions}\n\n{template}"
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::error::LlmError;
    use crate::llm::provider::CompletionResponse;

    /// Returns a fixed reply and records every request it sees.
    struct FixedLlm {
        reply: String,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl FixedLlm {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for FixedLlm {
        fn provider_name(&self) -> &str {
            "fixed"
        }

        fn model_name(&self) -> &str {
            "fixed-model"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.seen.lock().unwrap().push(request);
            Ok(CompletionResponse {
                content: self.reply.clone(),
                input_tokens: 0,
                output_tokens: 0,
            })
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmProvider for FailingLlm {
        fn provider_name(&self) -> &str {
            "failing"
        }

        fn model_name(&self) -> &str {
            "failing-model"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            Err(LlmError::RequestFailed {
                provider: "failing".into(),
                reason: "connection refused".into(),
            })
        }
    }

    #[tokio::test]
    async fn mock_mode_returns_sentinel_for_any_prompt() {
        let generator = Generator::mock();
        assert!(generator.is_mock());
        for prompt in ["", "Categorize this", "```json\n{}\n```"] {
            assert_eq!(generator.generate(prompt, "sys").await, MOCK_RESPONSE);
        }
        assert_eq!(
            generator.generate_outcome("x", "y").await,
            Generation::Mock
        );
    }

    #[tokio::test]
    async fn success_is_trimmed() {
        let llm = FixedLlm::new("  Important \n");
        let generator = Generator::new(llm.clone());
        assert_eq!(generator.generate("p", "s").await, "Important");
    }

    #[tokio::test]
    async fn sends_system_and_prompt_once() {
        let llm = FixedLlm::new("ok");
        let generator = Generator::new(llm.clone());
        generator.generate("the prompt", "the system").await;

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], CompletionRequest::new("the system", "the prompt"));
    }

    #[tokio::test]
    async fn backend_fault_becomes_error_text() {
        let generator = Generator::new(Arc::new(FailingLlm));
        let outcome = generator.generate_outcome("p", "s").await;
        assert!(matches!(outcome, Generation::BackendFault(_)));

        let text = generator.generate("p", "s").await;
        assert!(text.starts_with(ERROR_PREFIX));
        assert!(text.contains("connection refused"));
    }

    #[tokio::test]
    async fn structured_parses_fenced_json() {
        let llm = FixedLlm::new("```json\n{\"tasks\": []}\n```");
        let generator = Generator::new(llm);
        assert_eq!(
            generator.generate_structured("p", "s").await,
            json!({"tasks": []})
        );
    }

    #[tokio::test]
    async fn structured_in_mock_mode_is_empty_object() {
        let value = Generator::mock().generate_structured("p", "s").await;
        assert_eq!(value, json!({}));
    }

    #[tokio::test]
    async fn structured_on_fault_is_empty_object() {
        let value = Generator::new(Arc::new(FailingLlm))
            .generate_structured("p", "s")
            .await;
        assert_eq!(value, json!({}));
    }

    #[tokio::test]
    async fn categorize_uses_task_layout_and_system_prompt() {
        let llm = FixedLlm::new("Newsletter");
        let generator = Generator::new(llm.clone());
        let category = generator
            .categorize_email("Subject: Hi\nBody: Hello", "Return one word.", "Be strict.")
            .await;
        assert_eq!(category, "Newsletter");

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen[0].system, CATEGORIZATION_SYSTEM_PROMPT);
        assert_eq!(
            seen[0].prompt,
            "Email Content:\nSubject: Hi\nBody: Hello\n\nInstructions:\nBe strict.\n\nReturn one word."
        );
    }

    #[tokio::test]
    async fn draft_uses_reply_headings() {
        let llm = FixedLlm::new("Thanks!");
        let generator = Generator::new(llm.clone());
        generator.generate_draft("Body", "Be polite.", "").await;

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen[0].system, DRAFTING_SYSTEM_PROMPT);
        assert!(seen[0].prompt.starts_with("Original Email:\nBody"));
        assert!(seen[0].prompt.contains("User Instructions:\n"));
    }
}
