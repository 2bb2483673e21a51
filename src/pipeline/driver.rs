//! Pipeline driver: enriches every unprocessed email and commits the result.
//!
//! Records are handled one at a time. A store fault on one record is logged
//! and that record is skipped (it stays unprocessed); the run continues.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::emails::model::EmailRecord;
use crate::error::PipelineError;
use crate::pipeline::enricher::Enricher;
use crate::store::Database;

/// Outcome of one `run_pending` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Unprocessed records found by the scan.
    pub attempted: usize,
    /// Records enriched and marked processed.
    pub committed: usize,
    /// Records left unprocessed because of a store fault.
    pub skipped: usize,
}

/// Runs enrichment over the unprocessed part of the corpus.
pub struct Pipeline {
    db: Arc<dyn Database>,
    enricher: Enricher,
    run_lock: Mutex<()>,
}

impl Pipeline {
    pub fn new(db: Arc<dyn Database>, enricher: Enricher) -> Self {
        Self {
            db,
            enricher,
            run_lock: Mutex::new(()),
        }
    }

    /// Process every email with `processed = false`.
    ///
    /// Runs within one `Pipeline` are serialized. Only a failed initial
    /// scan is returned as an error.
    pub async fn run_pending(&self) -> Result<RunReport, PipelineError> {
        let _guard = self.run_lock.lock().await;

        let pending = self
            .db
            .find_unprocessed()
            .await
            .map_err(PipelineError::Scan)?;

        let mut report = RunReport {
            attempted: pending.len(),
            ..RunReport::default()
        };
        if pending.is_empty() {
            return Ok(report);
        }

        info!(count = pending.len(), "Processing unprocessed emails");
        for email in &pending {
            match self.process_one(email).await {
                Ok(()) => report.committed += 1,
                Err(e) => {
                    error!(id = %email.id, error = %e, "Failed to process email, skipping");
                    report.skipped += 1;
                }
            }
        }

        info!(
            attempted = report.attempted,
            committed = report.committed,
            skipped = report.skipped,
            "Processing run complete"
        );
        Ok(report)
    }

    async fn process_one(&self, email: &EmailRecord) -> Result<(), PipelineError> {
        let metadata = self.enricher.enrich(email).await?;
        self.db.update_metadata(email.id, true, &metadata).await?;
        Ok(())
    }
}

/// Spawn a background task that calls `run_pending` every `interval`.
///
/// The first run happens immediately. Returns a `JoinHandle` and shutdown flag.
pub fn spawn_pipeline_ticker(
    pipeline: Arc<Pipeline>,
    interval: Duration,
) -> (JoinHandle<()>, Arc<AtomicBool>) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);

    let handle = tokio::spawn(async move {
        info!("Pipeline ticker started, running every {}s", interval.as_secs());

        let mut tick = tokio::time::interval(interval);
        loop {
            tick.tick().await;

            if shutdown.load(Ordering::Relaxed) {
                info!("Pipeline ticker shutting down");
                return;
            }

            if let Err(e) = pipeline.run_pending().await {
                error!("Scheduled processing run failed: {e}");
            }
        }
    });

    (handle, shutdown_flag)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::agent::model::Draft;
    use crate::config::EnrichmentConfig;
    use crate::emails::model::{EmailMetadata, NewEmail};
    use crate::error::DatabaseError;
    use crate::llm::service::ERROR_PREFIX;
    use crate::llm::testing::UnreachableLlm;
    use crate::llm::{Generator, MOCK_RESPONSE};
    use crate::pipeline::enricher::SUMMARY_PLACEHOLDER;
    use crate::prompts::model::{PromptInput, PromptTemplate, TaskType};
    use crate::prompts::resolver::PromptResolver;
    use crate::store::LibSqlBackend;

    fn pipeline_over(db: Arc<dyn Database>) -> Pipeline {
        pipeline_with(db, Generator::mock())
    }

    fn pipeline_with(db: Arc<dyn Database>, generator: Generator) -> Pipeline {
        let enricher = Enricher::new(
            PromptResolver::new(Arc::clone(&db)),
            generator,
            EnrichmentConfig::default(),
        );
        Pipeline::new(db, enricher)
    }

    fn new_email(subject: &str, body: &str, hour: u32) -> NewEmail {
        NewEmail {
            sender: "someone@example.com".into(),
            subject: subject.into(),
            body: body.into(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 6, hour, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn invoice_scenario_in_mock_mode() {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let email = db
            .insert_email(&new_email("Invoice Due", "Please pay by Friday", 9))
            .await
            .unwrap();
        let pipeline = pipeline_over(Arc::clone(&db));

        let report = pipeline.run_pending().await.unwrap();
        assert_eq!(
            report,
            RunReport {
                attempted: 1,
                committed: 1,
                skipped: 0
            }
        );

        let stored = db.get_email(email.id).await.unwrap().unwrap();
        assert!(stored.processed);
        assert_eq!(stored.metadata.category.as_deref(), Some(MOCK_RESPONSE));
        assert!(stored.metadata.action_items.is_empty());
        assert_eq!(stored.metadata.summary.as_deref(), Some(SUMMARY_PLACEHOLDER));
    }

    #[tokio::test]
    async fn backend_fault_still_commits_record() {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let email = db
            .insert_email(&new_email("Invoice Due", "Please pay by Friday", 9))
            .await
            .unwrap();
        let pipeline = pipeline_with(Arc::clone(&db), Generator::new(Arc::new(UnreachableLlm)));

        let report = pipeline.run_pending().await.unwrap();
        assert_eq!(report.committed, 1);
        assert_eq!(report.skipped, 0);

        let stored = db.get_email(email.id).await.unwrap().unwrap();
        assert!(stored.processed);
        let category = stored.metadata.category.unwrap();
        assert!(category.starts_with(ERROR_PREFIX));
        assert!(stored.metadata.action_items.is_empty());
        assert_eq!(stored.metadata.summary.as_deref(), Some(SUMMARY_PLACEHOLDER));
        assert!(db.find_unprocessed().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn processes_exactly_the_unprocessed() {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());

        let done_metadata = EmailMetadata {
            category: Some("Spam".into()),
            action_items: Vec::new(),
            summary: Some("old".into()),
        };
        let mut done_ids = Vec::new();
        for i in 0..2 {
            let email = db
                .insert_email(&new_email(&format!("done {i}"), "x", i))
                .await
                .unwrap();
            db.update_metadata(email.id, true, &done_metadata).await.unwrap();
            done_ids.push(email.id);
        }
        for i in 0..3 {
            db.insert_email(&new_email(&format!("new {i}"), "y", 10 + i))
                .await
                .unwrap();
        }

        let pipeline = pipeline_over(Arc::clone(&db));
        let report = pipeline.run_pending().await.unwrap();
        assert_eq!(report.attempted, 3);
        assert_eq!(report.committed, 3);

        for id in done_ids {
            let email = db.get_email(id).await.unwrap().unwrap();
            assert!(email.processed);
            assert_eq!(email.metadata, done_metadata);
        }
        assert!(db.find_unprocessed().await.unwrap().is_empty());

        // Nothing left on a second run.
        assert_eq!(pipeline.run_pending().await.unwrap(), RunReport::default());
    }

    /// Wraps a real store and fails `update_metadata` for one id, or the scan.
    struct FlakyStore {
        inner: LibSqlBackend,
        fail_update_for: Option<Uuid>,
        fail_scan: bool,
    }

    #[async_trait]
    impl Database for FlakyStore {
        async fn init_schema(&self) -> Result<(), DatabaseError> {
            self.inner.init_schema().await
        }
        async fn insert_email(&self, email: &NewEmail) -> Result<EmailRecord, DatabaseError> {
            self.inner.insert_email(email).await
        }
        async fn find_email_by_subject_and_timestamp(
            &self,
            subject: &str,
            timestamp: DateTime<Utc>,
        ) -> Result<Option<EmailRecord>, DatabaseError> {
            self.inner
                .find_email_by_subject_and_timestamp(subject, timestamp)
                .await
        }
        async fn get_email(&self, id: Uuid) -> Result<Option<EmailRecord>, DatabaseError> {
            self.inner.get_email(id).await
        }
        async fn list_emails(&self, limit: usize) -> Result<Vec<EmailRecord>, DatabaseError> {
            self.inner.list_emails(limit).await
        }
        async fn find_unprocessed(&self) -> Result<Vec<EmailRecord>, DatabaseError> {
            if self.fail_scan {
                return Err(DatabaseError::Query("find_unprocessed: connection lost".into()));
            }
            self.inner.find_unprocessed().await
        }
        async fn update_metadata(
            &self,
            id: Uuid,
            processed: bool,
            metadata: &EmailMetadata,
        ) -> Result<(), DatabaseError> {
            if self.fail_update_for == Some(id) {
                return Err(DatabaseError::Query("update_metadata: disk full".into()));
            }
            self.inner.update_metadata(id, processed, metadata).await
        }
        async fn clear_emails(&self) -> Result<usize, DatabaseError> {
            self.inner.clear_emails().await
        }
        async fn create_prompt(&self, input: &PromptInput) -> Result<PromptTemplate, DatabaseError> {
            self.inner.create_prompt(input).await
        }
        async fn list_prompts(&self) -> Result<Vec<PromptTemplate>, DatabaseError> {
            self.inner.list_prompts().await
        }
        async fn get_prompt(&self, id: Uuid) -> Result<Option<PromptTemplate>, DatabaseError> {
            self.inner.get_prompt(id).await
        }
        async fn update_prompt(
            &self,
            id: Uuid,
            input: &PromptInput,
        ) -> Result<PromptTemplate, DatabaseError> {
            self.inner.update_prompt(id, input).await
        }
        async fn delete_prompt(&self, id: Uuid) -> Result<(), DatabaseError> {
            self.inner.delete_prompt(id).await
        }
        async fn find_active_template(
            &self,
            task_type: &TaskType,
        ) -> Result<Option<PromptTemplate>, DatabaseError> {
            self.inner.find_active_template(task_type).await
        }
        async fn find_prompt_by_type(
            &self,
            task_type: &TaskType,
        ) -> Result<Option<PromptTemplate>, DatabaseError> {
            self.inner.find_prompt_by_type(task_type).await
        }
        async fn insert_draft(&self, draft: &Draft) -> Result<(), DatabaseError> {
            self.inner.insert_draft(draft).await
        }
        async fn list_drafts(&self, limit: usize) -> Result<Vec<Draft>, DatabaseError> {
            self.inner.list_drafts(limit).await
        }
        async fn delete_draft(&self, id: Uuid) -> Result<(), DatabaseError> {
            self.inner.delete_draft(id).await
        }
    }

    #[tokio::test]
    async fn store_fault_skips_record_and_continues() {
        let inner = LibSqlBackend::new_memory().await.unwrap();
        let bad = inner.insert_email(&new_email("bad", "b", 8)).await.unwrap();
        let good = inner.insert_email(&new_email("good", "g", 9)).await.unwrap();

        let db: Arc<dyn Database> = Arc::new(FlakyStore {
            inner,
            fail_update_for: Some(bad.id),
            fail_scan: false,
        });
        let pipeline = pipeline_over(Arc::clone(&db));

        let report = pipeline.run_pending().await.unwrap();
        assert_eq!(
            report,
            RunReport {
                attempted: 2,
                committed: 1,
                skipped: 1
            }
        );
        assert!(db.get_email(good.id).await.unwrap().unwrap().processed);
        assert!(!db.get_email(bad.id).await.unwrap().unwrap().processed);
    }

    #[tokio::test]
    async fn scan_failure_is_returned() {
        let db: Arc<dyn Database> = Arc::new(FlakyStore {
            inner: LibSqlBackend::new_memory().await.unwrap(),
            fail_update_for: None,
            fail_scan: true,
        });
        let pipeline = pipeline_over(db);

        let err = pipeline.run_pending().await.unwrap_err();
        assert!(matches!(err, PipelineError::Scan(_)));
    }

    #[tokio::test]
    async fn concurrent_runs_do_not_double_process() {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        for i in 0..4 {
            db.insert_email(&new_email(&format!("e{i}"), "body", i))
                .await
                .unwrap();
        }
        let pipeline = Arc::new(pipeline_over(Arc::clone(&db)));

        let (a, b) = tokio::join!(pipeline.run_pending(), pipeline.run_pending());
        let total = a.unwrap().committed + b.unwrap().committed;
        assert_eq!(total, 4);
    }

    #[tokio::test]
    async fn ticker_processes_and_shuts_down() {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        db.insert_email(&new_email("tick", "body", 1)).await.unwrap();
        let pipeline = Arc::new(pipeline_over(Arc::clone(&db)));

        let (handle, shutdown) = spawn_pipeline_ticker(pipeline, Duration::from_millis(20));

        let mut processed = false;
        for _ in 0..100 {
            if db.find_unprocessed().await.unwrap().is_empty() {
                processed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(processed);

        shutdown.store(true, Ordering::Relaxed);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
