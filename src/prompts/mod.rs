//! Prompt templates: model, resolution, default seeding and REST routes.

pub mod model;
pub mod resolver;
pub mod routes;
pub mod seed;

pub use model::{PromptInput, PromptTemplate, TaskType};
pub use resolver::PromptResolver;
pub use seed::seed_default_prompts;
