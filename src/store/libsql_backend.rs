//! libSQL backend: async `Database` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agent::model::{Draft, DraftStatus};
use crate::emails::model::{EmailMetadata, EmailRecord, NewEmail};
use crate::error::DatabaseError;
use crate::prompts::model::{PromptInput, PromptTemplate, TaskType};
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn query_emails(
        &self,
        op: &str,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<EmailRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?;

        let mut emails = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?
        {
            match row_to_email(&row) {
                Ok(email) => emails.push(email),
                Err(e) => warn!("Skipping email row: {e}"),
            }
        }
        Ok(emails)
    }

    async fn query_prompts(
        &self,
        op: &str,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<PromptTemplate>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?;

        let mut prompts = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?
        {
            match row_to_prompt(&row) {
                Ok(prompt) => prompts.push(prompt),
                Err(e) => warn!("Skipping prompt row: {e}"),
            }
        }
        Ok(prompts)
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Canonical timestamp text. Fixed width so string order is time order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::Serialization(format!("bad id '{s}': {e}")))
}

/// Convert `Option<String>` to libsql Value.
fn opt_text(s: Option<String>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s),
        None => libsql::Value::Null,
    }
}

fn serialize_metadata(metadata: &EmailMetadata) -> Result<String, DatabaseError> {
    serde_json::to_string(metadata)
        .map_err(|e| DatabaseError::Serialization(format!("metadata: {e}")))
}

/// Map a libsql Row to an EmailRecord.
fn row_to_email(row: &libsql::Row) -> Result<EmailRecord, DatabaseError> {
    let get_err = |e: libsql::Error| DatabaseError::Query(format!("email row parse: {e}"));

    let id: String = row.get(0).map_err(get_err)?;
    let timestamp: String = row.get(4).map_err(get_err)?;
    let is_read: i64 = row.get(5).map_err(get_err)?;
    let processed: i64 = row.get(6).map_err(get_err)?;
    let metadata_str: String = row.get(7).unwrap_or_default();

    // Metadata is replaced wholesale on the next pass, so a damaged value
    // must not hide the record.
    let metadata = serde_json::from_str(&metadata_str).unwrap_or_else(|e| {
        warn!(id = %id, "Unreadable email metadata, using empty: {e}");
        EmailMetadata::default()
    });

    Ok(EmailRecord {
        id: parse_uuid(&id)?,
        sender: row.get(1).map_err(get_err)?,
        subject: row.get(2).map_err(get_err)?,
        body: row.get(3).map_err(get_err)?,
        timestamp: parse_datetime(&timestamp),
        is_read: is_read != 0,
        processed: processed != 0,
        metadata,
    })
}

fn row_to_prompt(row: &libsql::Row) -> Result<PromptTemplate, DatabaseError> {
    let get_err = |e: libsql::Error| DatabaseError::Query(format!("prompt row parse: {e}"));

    let id: String = row.get(0).map_err(get_err)?;
    let task_type: String = row.get(2).map_err(get_err)?;
    let is_active: i64 = row.get(4).map_err(get_err)?;

    Ok(PromptTemplate {
        id: parse_uuid(&id)?,
        name: row.get(1).map_err(get_err)?,
        task_type: TaskType::from(task_type),
        template: row.get(3).map_err(get_err)?,
        is_active: is_active != 0,
    })
}

fn row_to_draft(row: &libsql::Row) -> Result<Draft, DatabaseError> {
    let get_err = |e: libsql::Error| DatabaseError::Query(format!("draft row parse: {e}"));

    let id: String = row.get(0).map_err(get_err)?;
    let email_id: Option<String> = row.get(1).ok();
    let status: String = row.get(4).map_err(get_err)?;
    let created_at: String = row.get(5).map_err(get_err)?;

    Ok(Draft {
        id: parse_uuid(&id)?,
        email_id: email_id.as_deref().map(parse_uuid).transpose()?,
        subject: row.get(2).map_err(get_err)?,
        body: row.get(3).map_err(get_err)?,
        status: DraftStatus::from_db(&status),
        created_at: parse_datetime(&created_at),
    })
}

// ── Trait implementation ────────────────────────────────────────────

const EMAIL_COLUMNS: &str = "id, sender, subject, body, timestamp, is_read, processed, metadata";

const PROMPT_COLUMNS: &str = "id, name, task_type, template, is_active";

const DRAFT_COLUMNS: &str = "id, email_id, subject, body, status, created_at";

#[async_trait]
impl Database for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Emails ──────────────────────────────────────────────────────

    async fn insert_email(&self, email: &NewEmail) -> Result<EmailRecord, DatabaseError> {
        let record = EmailRecord {
            id: Uuid::new_v4(),
            sender: email.sender.clone(),
            subject: email.subject.clone(),
            body: email.body.clone(),
            timestamp: email.timestamp,
            is_read: false,
            processed: false,
            metadata: EmailMetadata::default(),
        };

        self.conn()
            .execute(
                "INSERT INTO emails (id, sender, subject, body, timestamp, is_read, processed, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6)",
                params![
                    record.id.to_string(),
                    record.sender.as_str(),
                    record.subject.as_str(),
                    record.body.as_str(),
                    format_timestamp(&record.timestamp),
                    serialize_metadata(&record.metadata)?,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_email: {e}")))?;

        debug!(id = %record.id, subject = %record.subject, "Email inserted into DB");
        Ok(record)
    }

    async fn find_email_by_subject_and_timestamp(
        &self,
        subject: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<EmailRecord>, DatabaseError> {
        let emails = self
            .query_emails(
                "find_email_by_subject_and_timestamp",
                &format!(
                    "SELECT {EMAIL_COLUMNS} FROM emails WHERE subject = ?1 AND timestamp = ?2 LIMIT 1"
                ),
                params![subject, format_timestamp(&timestamp)],
            )
            .await?;
        Ok(emails.into_iter().next())
    }

    async fn get_email(&self, id: Uuid) -> Result<Option<EmailRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {EMAIL_COLUMNS} FROM emails WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_email: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_email(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_email: {e}"))),
        }
    }

    async fn list_emails(&self, limit: usize) -> Result<Vec<EmailRecord>, DatabaseError> {
        self.query_emails(
            "list_emails",
            &format!("SELECT {EMAIL_COLUMNS} FROM emails ORDER BY timestamp DESC, id ASC LIMIT ?1"),
            params![limit as i64],
        )
        .await
    }

    async fn find_unprocessed(&self) -> Result<Vec<EmailRecord>, DatabaseError> {
        self.query_emails(
            "find_unprocessed",
            &format!(
                "SELECT {EMAIL_COLUMNS} FROM emails WHERE processed = 0 ORDER BY timestamp ASC, id ASC"
            ),
            (),
        )
        .await
    }

    async fn update_metadata(
        &self,
        id: Uuid,
        processed: bool,
        metadata: &EmailMetadata,
    ) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE emails SET processed = ?1, metadata = ?2 WHERE id = ?3",
                params![processed as i64, serialize_metadata(metadata)?, id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_metadata: {e}")))?;

        if affected == 0 {
            return Err(DatabaseError::not_found("email", id));
        }
        debug!(id = %id, processed, "Email metadata updated in DB");
        Ok(())
    }

    async fn clear_emails(&self) -> Result<usize, DatabaseError> {
        let count = self
            .conn()
            .execute("DELETE FROM emails", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("clear_emails: {e}")))?;

        info!(count, "Cleared emails from DB");
        Ok(count as usize)
    }

    // ── Prompts ─────────────────────────────────────────────────────

    async fn create_prompt(&self, input: &PromptInput) -> Result<PromptTemplate, DatabaseError> {
        let prompt = PromptTemplate {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            task_type: input.task_type.clone(),
            template: input.template.clone(),
            is_active: input.is_active,
        };

        self.conn()
            .execute(
                "INSERT INTO prompts (id, name, task_type, template, is_active) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    prompt.id.to_string(),
                    prompt.name.as_str(),
                    prompt.task_type.as_str(),
                    prompt.template.as_str(),
                    prompt.is_active as i64,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("create_prompt: {e}")))?;

        debug!(id = %prompt.id, task_type = %prompt.task_type, "Prompt inserted into DB");
        Ok(prompt)
    }

    async fn list_prompts(&self) -> Result<Vec<PromptTemplate>, DatabaseError> {
        self.query_prompts(
            "list_prompts",
            &format!("SELECT {PROMPT_COLUMNS} FROM prompts ORDER BY rowid ASC"),
            (),
        )
        .await
    }

    async fn get_prompt(&self, id: Uuid) -> Result<Option<PromptTemplate>, DatabaseError> {
        let prompts = self
            .query_prompts(
                "get_prompt",
                &format!("SELECT {PROMPT_COLUMNS} FROM prompts WHERE id = ?1"),
                params![id.to_string()],
            )
            .await?;
        Ok(prompts.into_iter().next())
    }

    async fn update_prompt(
        &self,
        id: Uuid,
        input: &PromptInput,
    ) -> Result<PromptTemplate, DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE prompts SET name = ?1, task_type = ?2, template = ?3, is_active = ?4 WHERE id = ?5",
                params![
                    input.name.as_str(),
                    input.task_type.as_str(),
                    input.template.as_str(),
                    input.is_active as i64,
                    id.to_string(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_prompt: {e}")))?;

        if affected == 0 {
            return Err(DatabaseError::not_found("prompt", id));
        }
        Ok(PromptTemplate {
            id,
            name: input.name.clone(),
            task_type: input.task_type.clone(),
            template: input.template.clone(),
            is_active: input.is_active,
        })
    }

    async fn delete_prompt(&self, id: Uuid) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute("DELETE FROM prompts WHERE id = ?1", params![id.to_string()])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_prompt: {e}")))?;

        if affected == 0 {
            return Err(DatabaseError::not_found("prompt", id));
        }
        Ok(())
    }

    async fn find_active_template(
        &self,
        task_type: &TaskType,
    ) -> Result<Option<PromptTemplate>, DatabaseError> {
        let prompts = self
            .query_prompts(
                "find_active_template",
                &format!(
                    "SELECT {PROMPT_COLUMNS} FROM prompts WHERE task_type = ?1 AND is_active = 1 ORDER BY rowid ASC LIMIT 1"
                ),
                params![task_type.as_str()],
            )
            .await?;
        Ok(prompts.into_iter().next())
    }

    async fn find_prompt_by_type(
        &self,
        task_type: &TaskType,
    ) -> Result<Option<PromptTemplate>, DatabaseError> {
        let prompts = self
            .query_prompts(
                "find_prompt_by_type",
                &format!(
                    "SELECT {PROMPT_COLUMNS} FROM prompts WHERE task_type = ?1 ORDER BY rowid ASC LIMIT 1"
                ),
                params![task_type.as_str()],
            )
            .await?;
        Ok(prompts.into_iter().next())
    }

    // ── Drafts ──────────────────────────────────────────────────────

    async fn insert_draft(&self, draft: &Draft) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO drafts (id, email_id, subject, body, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    draft.id.to_string(),
                    opt_text(draft.email_id.map(|id| id.to_string())),
                    draft.subject.as_str(),
                    draft.body.as_str(),
                    draft.status.as_str(),
                    format_timestamp(&draft.created_at),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_draft: {e}")))?;

        debug!(id = %draft.id, "Draft inserted into DB");
        Ok(())
    }

    async fn list_drafts(&self, limit: usize) -> Result<Vec<Draft>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {DRAFT_COLUMNS} FROM drafts ORDER BY created_at DESC, rowid DESC LIMIT ?1"
                ),
                params![limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_drafts: {e}")))?;

        let mut drafts = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_drafts: {e}")))?
        {
            match row_to_draft(&row) {
                Ok(draft) => drafts.push(draft),
                Err(e) => warn!("Skipping draft row: {e}"),
            }
        }
        Ok(drafts)
    }

    async fn delete_draft(&self, id: Uuid) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute("DELETE FROM drafts WHERE id = ?1", params![id.to_string()])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_draft: {e}")))?;

        if affected == 0 {
            return Err(DatabaseError::not_found("draft", id));
        }
        Ok(())
    }
}
