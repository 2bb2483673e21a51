//! Prompt templates and the task types they apply to.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Enrichment task a template applies to.
///
/// Open set: unknown names round-trip through `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskType {
    Categorization,
    Extraction,
    Summarization,
    Reply,
    Chat,
    Custom(String),
}

impl TaskType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Categorization => "categorization",
            Self::Extraction => "extraction",
            Self::Summarization => "summarization",
            Self::Reply => "reply",
            Self::Chat => "chat",
            Self::Custom(name) => name,
        }
    }
}

impl From<String> for TaskType {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "categorization" => Self::Categorization,
            "extraction" => Self::Extraction,
            "summarization" => Self::Summarization,
            "reply" => Self::Reply,
            "chat" => Self::Chat,
            _ => Self::Custom(s),
        }
    }
}

impl From<&str> for TaskType {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<TaskType> for String {
    fn from(t: TaskType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored, user-editable prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    /// Passed to the backend verbatim.
    pub template: String,
    pub is_active: bool,
}

/// Fields of a template as submitted by the management surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptInput {
    pub name: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub template: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl PromptInput {
    pub fn new(
        name: impl Into<String>,
        task_type: TaskType,
        template: impl Into<String>,
        is_active: bool,
    ) -> Self {
        Self {
            name: name.into(),
            task_type,
            template: template.into(),
            is_active,
        }
    }
}
