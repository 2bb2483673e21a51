//! Default prompt templates installed on a fresh database.

use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::prompts::model::{PromptInput, TaskType};
use crate::store::Database;

/// (name, task type, template) for every seeded default.
const DEFAULT_PROMPTS: &[(&str, &str, &str)] = &[
    (
        "Default Categorization",
        "categorization",
        "Categorize emails into: Important, Newsletter, Spam, To-Do. To-Do emails must include a direct request requiring user action. Return only the category name.",
    ),
    (
        "Default Action Extraction",
        "extraction",
        "Extract tasks from the email. Respond in JSON format: { \"tasks\": [ { \"task\": \"...\", \"deadline\": \"...\", \"priority\": \"High/Medium/Low\" } ] }. If no tasks, return { \"tasks\": [] }.",
    ),
    (
        "Default Auto-Reply",
        "reply",
        "Draft a polite and professional reply. Address the sender by name if possible. Keep it concise.",
    ),
    (
        "Default Chat",
        "chat",
        "You are a helpful email assistant. Answer questions based on the email context provided.",
    ),
];

/// The default templates, all active.
pub fn default_prompts() -> Vec<PromptInput> {
    DEFAULT_PROMPTS
        .iter()
        .map(|(name, task_type, template)| {
            PromptInput::new(*name, TaskType::from(*task_type), *template, true)
        })
        .collect()
}

/// Insert each default whose task type has no stored template yet.
///
/// Returns the number inserted.
pub async fn seed_default_prompts(db: &dyn Database) -> Result<usize, DatabaseError> {
    let mut inserted = 0;
    for prompt in default_prompts() {
        if db.find_prompt_by_type(&prompt.task_type).await?.is_some() {
            debug!(name = %prompt.name, "Prompt already exists");
            continue;
        }
        db.create_prompt(&prompt).await?;
        info!(name = %prompt.name, "Seeded prompt");
        inserted += 1;
    }
    Ok(inserted)
}
