//! Email corpus: records, the ingestion boundary and REST routes.

pub mod ingest;
pub mod model;
pub mod routes;

pub use ingest::{IngestReport, clear_emails, ingest_mock_inbox};
pub use model::{ActionItem, EmailMetadata, EmailRecord, NewEmail, Priority};
