//! Email agent: free-form chat and reply drafting.

pub mod model;
pub mod routes;
pub mod service;

pub use model::{Draft, DraftStatus};
pub use service::{EmailAgent, EmailContext};
