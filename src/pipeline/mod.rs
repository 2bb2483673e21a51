//! Email processing pipeline.
//!
//! Every unprocessed email flows through:
//! 1. `Pipeline::run_pending()` scans the corpus for `processed = false`
//! 2. `Enricher::enrich()` resolves templates and calls the generator
//! 3. `Database::update_metadata()` commits the metadata and the flag in one update

pub mod driver;
pub mod enricher;

pub use driver::{Pipeline, RunReport, spawn_pipeline_ticker};
pub use enricher::{Enricher, SUMMARY_PLACEHOLDER};
