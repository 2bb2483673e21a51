//! `Database` trait: the single async interface for all persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::agent::model::Draft;
use crate::emails::model::{EmailMetadata, EmailRecord, NewEmail};
use crate::error::DatabaseError;
use crate::prompts::model::{PromptInput, PromptTemplate, TaskType};

/// Backend-agnostic store covering the email corpus, prompt templates and drafts.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    // ── Emails ──────────────────────────────────────────────────────

    /// Insert a new email with `processed = false`, `is_read = false` and
    /// empty metadata.
    async fn insert_email(&self, email: &NewEmail) -> Result<EmailRecord, DatabaseError>;

    /// Look up an email by exact subject and timestamp (ingestion dedup key).
    async fn find_email_by_subject_and_timestamp(
        &self,
        subject: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<EmailRecord>, DatabaseError>;

    /// Get an email by ID.
    async fn get_email(&self, id: Uuid) -> Result<Option<EmailRecord>, DatabaseError>;

    /// Emails, newest first, up to `limit`.
    async fn list_emails(&self, limit: usize) -> Result<Vec<EmailRecord>, DatabaseError>;

    /// All emails with `processed = false`, oldest first.
    async fn find_unprocessed(&self) -> Result<Vec<EmailRecord>, DatabaseError>;

    /// Set `processed` and replace `metadata` in one update.
    ///
    /// Returns `DatabaseError::NotFound` when no email has this ID.
    async fn update_metadata(
        &self,
        id: Uuid,
        processed: bool,
        metadata: &EmailMetadata,
    ) -> Result<(), DatabaseError>;

    /// Delete every email. Returns the number removed.
    async fn clear_emails(&self) -> Result<usize, DatabaseError>;

    // ── Prompts ─────────────────────────────────────────────────────

    async fn create_prompt(&self, input: &PromptInput) -> Result<PromptTemplate, DatabaseError>;

    /// All templates in creation order.
    async fn list_prompts(&self) -> Result<Vec<PromptTemplate>, DatabaseError>;

    async fn get_prompt(&self, id: Uuid) -> Result<Option<PromptTemplate>, DatabaseError>;

    /// Replace a template's fields. `NotFound` when absent.
    async fn update_prompt(
        &self,
        id: Uuid,
        input: &PromptInput,
    ) -> Result<PromptTemplate, DatabaseError>;

    /// Delete a template. `NotFound` when absent.
    async fn delete_prompt(&self, id: Uuid) -> Result<(), DatabaseError>;

    /// First active template of this type, in creation order.
    async fn find_active_template(
        &self,
        task_type: &TaskType,
    ) -> Result<Option<PromptTemplate>, DatabaseError>;

    /// First template of this type, active or not.
    async fn find_prompt_by_type(
        &self,
        task_type: &TaskType,
    ) -> Result<Option<PromptTemplate>, DatabaseError>;

    // ── Drafts ──────────────────────────────────────────────────────

    async fn insert_draft(&self, draft: &Draft) -> Result<(), DatabaseError>;

    /// Drafts, newest first, up to `limit`.
    async fn list_drafts(&self, limit: usize) -> Result<Vec<Draft>, DatabaseError>;

    /// Delete a draft. `NotFound` when absent.
    async fn delete_draft(&self, id: Uuid) -> Result<(), DatabaseError>;
}
