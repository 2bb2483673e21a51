//! Email records and their machine-derived metadata.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Urgency of an extracted action item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    /// Lenient parse: unknown values fall back to `Medium`.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown priority: '{other}'")),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task extracted from an email body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub task: String,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub priority: Priority,
}

impl ActionItem {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            deadline: None,
            priority: Priority::Medium,
        }
    }

    /// Build an item from one generated `tasks` element.
    ///
    /// Requires a non-empty string `task`. A non-string `deadline` is
    /// dropped; an unknown or missing `priority` becomes `Medium`.
    pub fn from_generated(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let task = obj.get("task")?.as_str()?.trim();
        if task.is_empty() {
            return None;
        }

        let deadline = obj
            .get("deadline")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        let priority = obj
            .get("priority")
            .and_then(Value::as_str)
            .map(Priority::parse_lenient)
            .unwrap_or_default();

        Some(Self {
            task: task.to_string(),
            deadline,
            priority,
        })
    }

    /// Read the `tasks` sequence out of a structured generation result.
    ///
    /// Absent or malformed `tasks` yields an empty list.
    pub fn list_from_generated(value: &Value) -> Vec<Self> {
        value
            .get("tasks")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Self::from_generated).collect())
            .unwrap_or_default()
    }
}

/// Enrichment output attached to an email. Replaced wholesale on each pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMetadata {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// An email in the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailRecord {
    pub id: Uuid,
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    pub processed: bool,
    pub metadata: EmailMetadata,
}

impl EmailRecord {
    /// Subject and body as presented to the categorizer.
    pub fn categorization_content(&self) -> String {
        format!("Subject: {}\nBody: {}", self.subject, self.body)
    }
}

/// An email as handed over by the ingestion boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmail {
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}
