//! Ordered view of one conversation that merges three sources: history from
//! the database, optimistic local sends, and messages pushed live.
//!
//! Entries are ordered by `(created_at, id)`. A message id is never shown
//! twice. A pushed message carrying the `client_id` of a pending local copy
//! replaces that copy instead of being appended.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::messaging::MessageRow;

pub const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    Pending,
    Sent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadEntry {
    pub message: MessageRow,
    pub delivery: Delivery,
}

#[derive(Debug, Default)]
pub struct MessageThread {
    entries: Vec<ThreadEntry>,
    seen: HashSet<Uuid>,
}

impl MessageThread {
    pub fn from_history(history: Vec<MessageRow>) -> Self {
        let mut thread = Self::default();
        for message in history {
            thread.apply_remote(message);
        }
        thread
    }

    pub fn entries(&self) -> &[ThreadEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Shows a message before the server has confirmed it.
    pub fn push_optimistic(
        &mut self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
        client_id: Uuid,
        now: DateTime<Utc>,
    ) {
        self.entries.push(ThreadEntry {
            message: MessageRow {
                id: client_id,
                conversation_id,
                sender_id,
                content: content.to_string(),
                client_id: Some(client_id),
                created_at: now,
            },
            delivery: Delivery::Pending,
        });
    }

    /// Replaces the pending copy with the stored message.
    /// Returns false if the stored message was already shown.
    pub fn confirm(&mut self, client_id: Uuid, stored: MessageRow) -> bool {
        self.remove_pending(client_id);
        self.insert_sent(stored)
    }

    /// Drops a pending copy whose send failed. Returns it so the text can be restored.
    pub fn rollback(&mut self, client_id: Uuid) -> Option<MessageRow> {
        self.remove_pending(client_id)
    }

    /// Merges a message from history or the live feed.
    /// Returns true if the message was not shown before.
    pub fn apply_remote(&mut self, message: MessageRow) -> bool {
        if let Some(client_id) = message.client_id {
            self.remove_pending(client_id);
        }
        self.insert_sent(message)
    }

    fn remove_pending(&mut self, client_id: Uuid) -> Option<MessageRow> {
        let pos = self.entries.iter().position(|e| {
            e.delivery == Delivery::Pending && e.message.client_id == Some(client_id)
        })?;
        Some(self.entries.remove(pos).message)
    }

    fn insert_sent(&mut self, message: MessageRow) -> bool {
        if !self.seen.insert(message.id) {
            return false;
        }
        let key = (message.created_at, message.id);
        // Pending copies stay at the tail until confirmed.
        let sent_len = self
            .entries
            .iter()
            .take_while(|e| e.delivery == Delivery::Sent)
            .count();
        let pos = self.entries[..sent_len]
            .partition_point(|e| (e.message.created_at, e.message.id) <= key);
        self.entries.insert(
            pos,
            ThreadEntry {
                message,
                delivery: Delivery::Sent,
            },
        );
        true
    }
}

/// Trims message text and enforces the length limit.
pub fn normalize_content(raw: &str) -> Result<String, AppError> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(AppError::Validation("message cannot be empty".to_string()));
    }
    if content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::Validation(format!(
            "message must be at most {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn stored(conv: Uuid, content: &str, at: DateTime<Utc>, client_id: Option<Uuid>) -> MessageRow {
        MessageRow {
            id: Uuid::new_v4(),
            conversation_id: conv,
            sender_id: Uuid::new_v4(),
            content: content.to_string(),
            client_id,
            created_at: at,
        }
    }

    fn contents(thread: &MessageThread) -> Vec<&str> {
        thread
            .entries()
            .iter()
            .map(|e| e.message.content.as_str())
            .collect()
    }

    #[test]
    fn test_history_is_sorted_and_deduped() {
        let conv = Uuid::new_v4();
        let t0 = Utc::now();
        let a = stored(conv, "a", t0, None);
        let b = stored(conv, "b", t0 + Duration::seconds(5), None);
        let thread = MessageThread::from_history(vec![b.clone(), a.clone(), b]);
        assert_eq!(contents(&thread), vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_push_is_ignored() {
        let conv = Uuid::new_v4();
        let msg = stored(conv, "hi", Utc::now(), None);
        let mut thread = MessageThread::default();
        assert!(thread.apply_remote(msg.clone()));
        assert!(!thread.apply_remote(msg));
        assert_eq!(thread.len(), 1);
    }

    #[test]
    fn test_optimistic_then_confirm() {
        let conv = Uuid::new_v4();
        let client_id = Uuid::new_v4();
        let now = Utc::now();
        let mut thread = MessageThread::default();
        thread.push_optimistic(conv, Uuid::new_v4(), "on my way", client_id, now);
        assert_eq!(thread.entries()[0].delivery, Delivery::Pending);

        let server = stored(conv, "on my way", now, Some(client_id));
        assert!(thread.confirm(client_id, server.clone()));
        assert_eq!(thread.len(), 1);
        assert_eq!(thread.entries()[0].delivery, Delivery::Sent);
        assert_eq!(thread.entries()[0].message.id, server.id);
    }

    #[test]
    fn test_live_push_reconciles_pending_copy() {
        let conv = Uuid::new_v4();
        let client_id = Uuid::new_v4();
        let now = Utc::now();
        let mut thread = MessageThread::default();
        thread.push_optimistic(conv, Uuid::new_v4(), "hello", client_id, now);

        // The realtime copy arrives before the send call returns.
        let server = stored(conv, "hello", now, Some(client_id));
        assert!(thread.apply_remote(server.clone()));
        assert_eq!(thread.len(), 1);

        // The late confirmation must not duplicate it.
        assert!(!thread.confirm(client_id, server));
        assert_eq!(thread.len(), 1);
    }

    #[test]
    fn test_rollback_removes_pending() {
        let conv = Uuid::new_v4();
        let client_id = Uuid::new_v4();
        let mut thread = MessageThread::default();
        thread.push_optimistic(conv, Uuid::new_v4(), "oops", client_id, Utc::now());
        let restored = thread.rollback(client_id).unwrap();
        assert_eq!(restored.content, "oops");
        assert!(thread.is_empty());
        assert!(thread.rollback(client_id).is_none());
    }

    #[test]
    fn test_pending_stays_after_sent_messages() {
        let conv = Uuid::new_v4();
        let now = Utc::now();
        let mut thread = MessageThread::default();
        thread.push_optimistic(conv, Uuid::new_v4(), "mine", Uuid::new_v4(), now);
        thread.apply_remote(stored(conv, "theirs", now + Duration::seconds(1), None));
        assert_eq!(contents(&thread), vec!["theirs", "mine"]);
    }

    #[test]
    fn test_normalize_content() {
        assert_eq!(normalize_content("  hi  ").unwrap(), "hi");
        assert!(normalize_content("   ").is_err());
        assert!(normalize_content(&"x".repeat(MAX_MESSAGE_CHARS + 1)).is_err());
    }
}
