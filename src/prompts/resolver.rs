//! Prompt resolution: the active stored template, or a compiled-in default.

use std::sync::Arc;

use crate::error::DatabaseError;
use crate::prompts::model::TaskType;
use crate::store::Database;

pub const DEFAULT_CATEGORIZATION_TEMPLATE: &str =
    "Categorize this email into: Important, Newsletter, Spam, To-Do. Return only the category name.";

pub const DEFAULT_EXTRACTION_TEMPLATE: &str = "Extract tasks from the email. Respond in JSON: { \"tasks\": [ { \"task\": \"...\", \"deadline\": \"...\" } ] }.";

pub const DEFAULT_REPLY_TEMPLATE: &str = "Draft a polite reply to this email.";

/// Compiled-in fallback for a task type. Only categorization, extraction
/// and reply have one.
pub fn builtin_default(task_type: &TaskType) -> Option<&'static str> {
    match task_type {
        TaskType::Categorization => Some(DEFAULT_CATEGORIZATION_TEMPLATE),
        TaskType::Extraction => Some(DEFAULT_EXTRACTION_TEMPLATE),
        TaskType::Reply => Some(DEFAULT_REPLY_TEMPLATE),
        _ => None,
    }
}

/// Looks up the template body to use for a task.
///
/// A missing template is not an error; only store faults are.
#[derive(Clone)]
pub struct PromptResolver {
    db: Arc<dyn Database>,
}

impl PromptResolver {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Body of the first active template for `task_type`, else the built-in
    /// default. `None` only for task types without a default.
    pub async fn resolve(&self, task_type: &TaskType) -> Result<Option<String>, DatabaseError> {
        if let Some(stored) = self.active_template(task_type).await? {
            return Ok(Some(stored));
        }
        Ok(builtin_default(task_type).map(str::to_string))
    }

    /// Body of the first active stored template, ignoring built-in defaults.
    pub async fn active_template(
        &self,
        task_type: &TaskType,
    ) -> Result<Option<String>, DatabaseError> {
        let found = self.db.find_active_template(task_type).await?;
        if found.is_none() {
            tracing::debug!(task_type = %task_type, "No active template stored");
        }
        Ok(found.map(|p| p.template))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::model::PromptInput;
    use crate::store::LibSqlBackend;

    async fn resolver() -> (PromptResolver, Arc<dyn Database>) {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        (PromptResolver::new(Arc::clone(&db)), db)
    }

    #[tokio::test]
    async fn defaults_when_nothing_stored() {
        let (resolver, _db) = resolver().await;

        for (task, expected) in [
            (TaskType::Categorization, DEFAULT_CATEGORIZATION_TEMPLATE),
            (TaskType::Extraction, DEFAULT_EXTRACTION_TEMPLATE),
            (TaskType::Reply, DEFAULT_REPLY_TEMPLATE),
        ] {
            assert_eq!(resolver.resolve(&task).await.unwrap().as_deref(), Some(expected));
        }
    }

    #[tokio::test]
    async fn no_default_for_other_types() {
        let (resolver, _db) = resolver().await;
        assert!(resolver.resolve(&TaskType::Summarization).await.unwrap().is_none());
        assert!(resolver.resolve(&TaskType::Chat).await.unwrap().is_none());
        assert!(
            resolver
                .resolve(&TaskType::Custom("tone".into()))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn stored_active_template_is_returned_verbatim() {
        let (resolver, db) = resolver().await;
        let body = "  Label it: {weird} ```json``` \n";
        db.create_prompt(&PromptInput::new("mine", TaskType::Categorization, body, true))
            .await
            .unwrap();

        assert_eq!(
            resolver.resolve(&TaskType::Categorization).await.unwrap().as_deref(),
            Some(body)
        );
    }

    #[tokio::test]
    async fn inactive_template_falls_back_to_default() {
        let (resolver, db) = resolver().await;
        db.create_prompt(&PromptInput::new("off", TaskType::Reply, "Be rude.", false))
            .await
            .unwrap();

        assert_eq!(
            resolver.resolve(&TaskType::Reply).await.unwrap().as_deref(),
            Some(DEFAULT_REPLY_TEMPLATE)
        );
        assert!(resolver.active_template(&TaskType::Reply).await.unwrap().is_none());
    }
}
