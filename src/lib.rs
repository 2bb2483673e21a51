//! Inbox Agent: email enrichment pipeline and its HTTP surface.

pub mod agent;
pub mod config;
pub mod emails;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod server;
pub mod store;
