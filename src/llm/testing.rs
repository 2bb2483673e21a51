//! Deterministic providers for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::llm::provider::{CompletionRequest, CompletionResponse, LlmProvider};

/// Replies keyed by system instruction, with a fallback reply.
/// Records the user prompt of every call.
pub struct ScriptedLlm {
    by_system: HashMap<String, String>,
    fallback: String,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(fallback: &str) -> Self {
        Self {
            by_system: HashMap::new(),
            fallback: fallback.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn on_system(mut self, system: &str, reply: &str) -> Self {
        self.by_system.insert(system.to_string(), reply.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.prompts.lock().unwrap().push(request.prompt);

        let content = self
            .by_system
            .get(&request.system)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone());
        Ok(CompletionResponse {
            content,
            input_tokens: 0,
            output_tokens: 0,
        })
    }
}

/// Fails every call, like an unreachable backend.
pub struct UnreachableLlm;

#[async_trait]
impl LlmProvider for UnreachableLlm {
    fn provider_name(&self) -> &str {
        "unreachable"
    }

    fn model_name(&self) -> &str {
        "unreachable-model"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Err(LlmError::RequestFailed {
            provider: "unreachable".into(),
            reason: "connection refused".into(),
        })
    }
}
