use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Signup,
    PasswordReset,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::Signup => "signup",
            TokenPurpose::PasswordReset => "password_reset",
        }
    }
}

/// A one-time code plus magic-link token. Only hashes are stored.
#[derive(Debug, Clone, FromRow)]
pub struct MagicTokenRow {
    pub id: Uuid,
    pub email: String,
    pub purpose: String,
    pub token_hash: String,
    pub code_hash: String,
    pub attempts_left: i32,
    pub resends_left: i32,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
