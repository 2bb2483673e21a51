//! Ingestion boundary: loads the mock inbox into the corpus.
//!
//! Deduplicates on subject + timestamp before insertion, then triggers a
//! processing run.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::emails::model::NewEmail;
use crate::error::{DatabaseError, IngestError};
use crate::pipeline::Pipeline;
use crate::store::Database;

/// Result of one ingestion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// New emails inserted.
    pub ingested: usize,
    /// Emails attempted by the processing run that followed.
    pub processed: usize,
}

impl IngestReport {
    pub fn message(&self) -> String {
        format!(
            "Ingested {} new emails and processed {} emails",
            self.ingested, self.processed
        )
    }
}

/// One entry of the mock inbox file.
#[derive(Debug, Deserialize)]
struct MockEmail {
    sender: String,
    subject: String,
    body: String,
    timestamp: String,
}

/// Parse an inbox timestamp. RFC 3339 (`Z` or offset); a bare local
/// datetime is read as UTC.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, IngestError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|ndt| ndt.and_utc())
        .map_err(|e| IngestError::Parse(format!("invalid timestamp '{raw}': {e}")))
}

/// Read and parse the mock inbox file.
pub async fn load_mock_inbox(path: &Path) -> Result<Vec<NewEmail>, IngestError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(IngestError::NotFound(path.display().to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let items: Vec<MockEmail> =
        serde_json::from_str(&raw).map_err(|e| IngestError::Parse(e.to_string()))?;

    items
        .into_iter()
        .map(|item| {
            Ok(NewEmail {
                timestamp: parse_timestamp(&item.timestamp)?,
                sender: item.sender,
                subject: item.subject,
                body: item.body,
            })
        })
        .collect()
}

/// Insert the emails that are not already stored. Returns the number inserted.
pub async fn store_new_emails(
    db: &dyn Database,
    emails: &[NewEmail],
) -> Result<usize, DatabaseError> {
    let mut inserted = 0;
    for email in emails {
        if db
            .find_email_by_subject_and_timestamp(&email.subject, email.timestamp)
            .await?
            .is_some()
        {
            debug!(subject = %email.subject, "Email already ingested, skipping");
            continue;
        }
        db.insert_email(email).await?;
        inserted += 1;
    }
    Ok(inserted)
}

/// Load the mock inbox, store new emails, then process everything pending.
pub async fn ingest_mock_inbox(
    db: &dyn Database,
    pipeline: &Pipeline,
    path: &Path,
) -> Result<IngestReport, IngestError> {
    let emails = load_mock_inbox(path).await?;
    let ingested = store_new_emails(db, &emails).await?;
    let run = pipeline.run_pending().await?;

    let report = IngestReport {
        ingested,
        processed: run.attempted,
    };
    info!(
        ingested = report.ingested,
        processed = report.processed,
        "Mock inbox ingested"
    );
    Ok(report)
}

/// Remove every email from the corpus. Maintenance only.
pub async fn clear_emails(db: &dyn Database) -> Result<usize, DatabaseError> {
    let removed = db.clear_emails().await?;
    info!(removed, "Emails cleared");
    Ok(removed)
}
