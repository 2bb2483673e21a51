//! Enrichment orchestrator: turns one email into its metadata.
//!
//! Each step runs regardless of how the others went. Backend faults come
//! back from the generator as text and land in the affected field; only
//! store faults (template lookups) fail the enrichment.

use tracing::debug;

use crate::config::EnrichmentConfig;
use crate::emails::model::{ActionItem, EmailMetadata, EmailRecord};
use crate::error::DatabaseError;
use crate::llm::Generator;
use crate::prompts::model::TaskType;
use crate::prompts::resolver::PromptResolver;

/// Summary stored when no summarization step runs.
pub const SUMMARY_PLACEHOLDER: &str = "Processed by AI";

/// Builds `EmailMetadata` from prompts and the generative backend.
#[derive(Clone)]
pub struct Enricher {
    resolver: PromptResolver,
    generator: Generator,
    config: EnrichmentConfig,
}

impl Enricher {
    pub fn new(resolver: PromptResolver, generator: Generator, config: EnrichmentConfig) -> Self {
        Self {
            resolver,
            generator,
            config,
        }
    }

    /// Produce a complete metadata value for `email`.
    pub async fn enrich(&self, email: &EmailRecord) -> Result<EmailMetadata, DatabaseError> {
        let category = self.categorize(email).await?;
        let action_items = self.extract(email).await?;
        let summary = self.summarize(email).await?;

        debug!(
            id = %email.id,
            category = %category,
            action_items = action_items.len(),
            "Email enriched"
        );

        Ok(EmailMetadata {
            category: Some(category),
            action_items,
            summary: Some(summary),
        })
    }

    async fn categorize(&self, email: &EmailRecord) -> Result<String, DatabaseError> {
        let template = self
            .resolver
            .resolve(&TaskType::Categorization)
            .await?
            .unwrap_or_default();

        Ok(self
            .generator
            .categorize_email(
                &email.categorization_content(),
                &template,
                &self.config.instructions,
            )
            .await)
    }

    async fn extract(&self, email: &EmailRecord) -> Result<Vec<ActionItem>, DatabaseError> {
        let template = self
            .resolver
            .resolve(&TaskType::Extraction)
            .await?
            .unwrap_or_default();

        let value = self
            .generator
            .extract_action_items(&email.body, &template, &self.config.instructions)
            .await;
        Ok(ActionItem::list_from_generated(&value))
    }

    async fn summarize(&self, email: &EmailRecord) -> Result<String, DatabaseError> {
        if !self.config.summarize {
            return Ok(SUMMARY_PLACEHOLDER.to_string());
        }
        // Summarization has no built-in default template.
        let Some(template) = self
            .resolver
            .active_template(&TaskType::Summarization)
            .await?
        else {
            return Ok(SUMMARY_PLACEHOLDER.to_string());
        };

        Ok(self
            .generator
            .summarize_email(&email.body, &template, &self.config.instructions)
            .await)
    }
}
