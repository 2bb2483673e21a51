//! Chat and reply drafting on top of the generator.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::agent::model::Draft;
use crate::emails::model::EmailRecord;
use crate::error::DatabaseError;
use crate::llm::Generator;
use crate::llm::service::CHAT_SYSTEM_PROMPT;
use crate::prompts::model::TaskType;
use crate::prompts::resolver::PromptResolver;
use crate::store::Database;

/// The parts of an email the agent talks about. Missing fields get
/// placeholders.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailContext {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl EmailContext {
    pub fn subject(&self) -> &str {
        self.subject.as_deref().unwrap_or("No Subject")
    }

    pub fn sender(&self) -> &str {
        self.sender.as_deref().unwrap_or("Unknown")
    }

    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }

    fn render(&self) -> String {
        format!(
            "Subject: {}\nFrom: {}\nBody:\n{}\n",
            self.subject(),
            self.sender(),
            self.body()
        )
    }
}

impl From<&EmailRecord> for EmailContext {
    fn from(email: &EmailRecord) -> Self {
        Self {
            id: Some(email.id),
            subject: Some(email.subject.clone()),
            sender: Some(email.sender.clone()),
            body: Some(email.body.clone()),
        }
    }
}

/// Conversational helper and reply drafter.
#[derive(Clone)]
pub struct EmailAgent {
    db: Arc<dyn Database>,
    resolver: PromptResolver,
    generator: Generator,
}

impl EmailAgent {
    pub fn new(
        db: Arc<dyn Database>,
        resolver: PromptResolver,
        generator: Generator,
    ) -> Self {
        Self {
            db,
            resolver,
            generator,
        }
    }

    /// Answer a user message, optionally about a specific email.
    ///
    /// An active `chat` template replaces the default system instruction.
    pub async fn chat(
        &self,
        message: &str,
        email: Option<&EmailContext>,
        context: &str,
    ) -> Result<String, DatabaseError> {
        let system = self
            .resolver
            .active_template(&TaskType::Chat)
            .await?
            .unwrap_or_else(|| CHAT_SYSTEM_PROMPT.to_string());

        let email_content = email.map(EmailContext::render).unwrap_or_default();
        let prompt = format!(
            "You are an AI email assistant.\n\nHere is the email the user is asking about:\n\n{email_content}\n\nUser message: {message}\nContext: {context}\n"
        );

        Ok(self.generator.generate(&prompt, &system).await)
    }

    /// Generate and store a reply draft.
    pub async fn draft_reply(
        &self,
        email: &EmailContext,
        instructions: &str,
    ) -> Result<Draft, DatabaseError> {
        let template = self
            .resolver
            .resolve(&TaskType::Reply)
            .await?
            .unwrap_or_default();

        let content = format!(
            "Subject: {}\nFrom: {}\nBody: {}",
            email.subject(),
            email.sender(),
            email.body()
        );
        let body = self
            .generator
            .generate_draft(&content, &template, instructions)
            .await;

        let draft = Draft::reply(email.id, email.subject(), body);
        self.db.insert_draft(&draft).await?;
        info!(draft_id = %draft.id, email_id = ?draft.email_id, "Draft generated");
        Ok(draft)
    }
}
