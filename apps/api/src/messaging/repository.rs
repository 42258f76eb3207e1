use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::messaging::{ConversationRow, ConversationSummary, MessageRow};

/// Most messages returned by one poll or sent as stream backlog.
pub const MESSAGE_PAGE_LIMIT: i64 = 200;

/// Returns the conversation for (job, employer, worker), creating it on first contact.
pub async fn get_or_create_conversation(
    pool: &PgPool,
    job_id: Uuid,
    employer_id: Uuid,
    worker_id: Uuid,
) -> Result<ConversationRow, sqlx::Error> {
    let inserted = sqlx::query_as::<_, ConversationRow>(
        r#"
        INSERT INTO conversations (id, job_id, employer_id, worker_id)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (job_id, employer_id, worker_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(job_id)
    .bind(employer_id)
    .bind(worker_id)
    .fetch_optional(pool)
    .await?;

    if let Some(row) = inserted {
        info!("Conversation {} opened on job {job_id}", row.id);
        return Ok(row);
    }

    sqlx::query_as::<_, ConversationRow>(
        r#"
        SELECT * FROM conversations
        WHERE job_id = $1 AND employer_id = $2 AND worker_id = $3
        "#,
    )
    .bind(job_id)
    .bind(employer_id)
    .bind(worker_id)
    .fetch_one(pool)
    .await
}

pub async fn get_conversation(
    pool: &PgPool,
    conversation_id: Uuid,
) -> Result<Option<ConversationRow>, sqlx::Error> {
    sqlx::query_as::<_, ConversationRow>("SELECT * FROM conversations WHERE id = $1")
        .bind(conversation_id)
        .fetch_optional(pool)
        .await
}

/// Conversations the user takes part in, most recent activity first.
pub async fn list_conversations(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<ConversationSummary>, sqlx::Error> {
    sqlx::query_as::<_, ConversationSummary>(
        r#"
        SELECT c.*,
               j.title AS job_title,
               e.name  AS employer_name,
               w.name  AS worker_name,
               lm.content AS last_message
        FROM conversations c
        JOIN jobs j     ON j.id = c.job_id
        JOIN profiles e ON e.user_id = c.employer_id
        JOIN profiles w ON w.user_id = c.worker_id
        LEFT JOIN LATERAL (
            SELECT content FROM messages m
            WHERE m.conversation_id = c.id
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT 1
        ) lm ON TRUE
        WHERE c.employer_id = $1 OR c.worker_id = $1
        ORDER BY COALESCE(c.last_message_at, c.created_at) DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Messages strictly after `since`, oldest first. Without `since`, the latest page.
pub async fn list_messages(
    pool: &PgPool,
    conversation_id: Uuid,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<MessageRow>, sqlx::Error> {
    match since {
        Some(since) => {
            sqlx::query_as::<_, MessageRow>(
                r#"
                SELECT * FROM messages
                WHERE conversation_id = $1 AND created_at > $2
                ORDER BY created_at ASC, id ASC
                LIMIT $3
                "#,
            )
            .bind(conversation_id)
            .bind(since)
            .bind(MESSAGE_PAGE_LIMIT)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, MessageRow>(
                r#"
                SELECT * FROM (
                    SELECT * FROM messages
                    WHERE conversation_id = $1
                    ORDER BY created_at DESC, id DESC
                    LIMIT $2
                ) latest
                ORDER BY created_at ASC, id ASC
                "#,
            )
            .bind(conversation_id)
            .bind(MESSAGE_PAGE_LIMIT)
            .fetch_all(pool)
            .await
        }
    }
}

/// Stores a message. With a `client_id`, a repeated send returns the stored row
/// and `false` instead of inserting a second copy.
pub async fn insert_message(
    pool: &PgPool,
    conversation_id: Uuid,
    sender_id: Uuid,
    content: &str,
    client_id: Option<Uuid>,
) -> Result<(MessageRow, bool), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query_as::<_, MessageRow>(
        r#"
        INSERT INTO messages (id, conversation_id, sender_id, content, client_id)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (conversation_id, client_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(conversation_id)
    .bind(sender_id)
    .bind(content)
    .bind(client_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(message) = inserted else {
        let existing = sqlx::query_as::<_, MessageRow>(
            "SELECT * FROM messages WHERE conversation_id = $1 AND client_id = $2",
        )
        .bind(conversation_id)
        .bind(client_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        return Ok((existing, false));
    };

    sqlx::query("UPDATE conversations SET last_message_at = $2 WHERE id = $1")
        .bind(conversation_id)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok((message, true))
}
