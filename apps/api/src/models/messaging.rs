use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConversationRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub employer_id: Uuid,
    pub worker_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl ConversationRow {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.employer_id == user_id || self.worker_id == user_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MessageRow {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    /// Caller-chosen key that lets a client match its optimistic copy.
    pub client_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A conversation as shown in an inbox: the job and both parties by name,
/// plus a preview of the latest message.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ConversationSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub conversation: ConversationRow,
    pub job_title: String,
    pub employer_name: String,
    pub worker_name: String,
    pub last_message: Option<String>,
}
