//! Reply drafts produced by the agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a draft.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    #[default]
    Generated,
    Edited,
    Approved,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Edited => "edited",
            Self::Approved => "approved",
        }
    }

    /// Parse a stored status; unknown values read as `Generated`.
    pub fn from_db(s: &str) -> Self {
        match s {
            "edited" => Self::Edited,
            "approved" => Self::Approved,
            _ => Self::Generated,
        }
    }
}

/// Generated reply text tied to an email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub id: Uuid,
    /// Absent when the draft was generated for an inline email.
    pub email_id: Option<Uuid>,
    pub subject: String,
    pub body: String,
    pub status: DraftStatus,
    pub created_at: DateTime<Utc>,
}

impl Draft {
    /// A freshly generated reply to `subject`.
    pub fn reply(email_id: Option<Uuid>, subject: &str, body: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email_id,
            subject: format!("Re: {subject}"),
            body,
            status: DraftStatus::Generated,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_prefixes_subject() {
        let draft = Draft::reply(None, "Invoice Due", "Will do.".into());
        assert_eq!(draft.subject, "Re: Invoice Due");
        assert_eq!(draft.status, DraftStatus::Generated);
    }

    #[test]
    fn status_round_trips_through_db_text() {
        for status in [DraftStatus::Generated, DraftStatus::Edited, DraftStatus::Approved] {
            assert_eq!(DraftStatus::from_db(status.as_str()), status);
        }
        assert_eq!(DraftStatus::from_db("bogus"), DraftStatus::Generated);
        assert_eq!(
            serde_json::to_value(DraftStatus::Approved).unwrap(),
            serde_json::json!("approved")
        );
    }
}
