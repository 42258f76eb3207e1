use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::profile::ProfileRow;
use crate::models::token::{MagicTokenRow, TokenPurpose};

pub struct NewToken<'a> {
    pub email: &'a str,
    pub purpose: TokenPurpose,
    pub token_hash: &'a str,
    pub code_hash: &'a str,
    pub attempts_left: i32,
    pub resends_left: i32,
    pub expires_at: DateTime<Utc>,
}

/// Issues a token, retiring any live token for the same email and purpose.
pub async fn insert_token(
    pool: &PgPool,
    token: NewToken<'_>,
) -> Result<MagicTokenRow, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE magic_tokens SET consumed_at = NOW()
        WHERE email = $1 AND purpose = $2 AND consumed_at IS NULL
        "#,
    )
    .bind(token.email)
    .bind(token.purpose.as_str())
    .execute(&mut *tx)
    .await?;

    let row = sqlx::query_as::<_, MagicTokenRow>(
        r#"
        INSERT INTO magic_tokens
            (id, email, purpose, token_hash, code_hash, attempts_left, resends_left, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(token.email)
    .bind(token.purpose.as_str())
    .bind(token.token_hash)
    .bind(token.code_hash)
    .bind(token.attempts_left)
    .bind(token.resends_left)
    .bind(token.expires_at)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

/// The newest token for an email and purpose, consumed or not.
pub async fn latest_token(
    pool: &PgPool,
    email: &str,
    purpose: TokenPurpose,
) -> Result<Option<MagicTokenRow>, sqlx::Error> {
    sqlx::query_as::<_, MagicTokenRow>(
        r#"
        SELECT * FROM magic_tokens
        WHERE email = $1 AND purpose = $2
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(email)
    .bind(purpose.as_str())
    .fetch_optional(pool)
    .await
}

pub async fn token_by_link_hash(
    pool: &PgPool,
    token_hash: &str,
) -> Result<Option<MagicTokenRow>, sqlx::Error> {
    sqlx::query_as::<_, MagicTokenRow>("SELECT * FROM magic_tokens WHERE token_hash = $1")
        .bind(token_hash)
        .fetch_optional(pool)
        .await
}

/// Spends one attempt in a single statement so parallel guesses cannot share
/// a read. `None` when the token had no attempts left or was already used.
pub const SPEND_ATTEMPT_SQL: &str = r#"
    UPDATE magic_tokens SET attempts_left = attempts_left - 1
    WHERE id = $1 AND attempts_left > 0 AND consumed_at IS NULL
    RETURNING attempts_left
"#;

/// Consumes only a token that is still unused, unexpired and has attempts left.
pub const CONSUME_TOKEN_SQL: &str = r#"
    UPDATE magic_tokens SET consumed_at = NOW()
    WHERE id = $1 AND consumed_at IS NULL AND attempts_left > 0 AND expires_at > NOW()
"#;

pub async fn spend_attempt(pool: &PgPool, token_id: Uuid) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(SPEND_ATTEMPT_SQL)
        .bind(token_id)
        .fetch_optional(pool)
        .await
}

/// Marks a token used. Returns false if it was consumed, expired or locked
/// out by another request first.
pub async fn consume_token(pool: &PgPool, token_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(CONSUME_TOKEN_SQL)
        .bind(token_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Stores a rotated code on an existing token.
pub async fn rotate_code(
    pool: &PgPool,
    token_id: Uuid,
    token_hash: &str,
    code_hash: &str,
    attempts_left: i32,
    resends_left: i32,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE magic_tokens
        SET token_hash = $2, code_hash = $3, attempts_left = $4,
            resends_left = $5, expires_at = $6
        WHERE id = $1
        "#,
    )
    .bind(token_id)
    .bind(token_hash)
    .bind(code_hash)
    .bind(attempts_left)
    .bind(resends_left)
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn profile_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<ProfileRow>, sqlx::Error> {
    sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Creates an unverified profile, or refreshes the details of one that never
/// verified. `None` means the email already belongs to a verified account.
pub async fn upsert_pending_profile(
    pool: &PgPool,
    name: &str,
    email: &str,
    phone: Option<&str>,
    password_hash: Option<&str>,
) -> Result<Option<ProfileRow>, sqlx::Error> {
    sqlx::query_as::<_, ProfileRow>(
        r#"
        INSERT INTO profiles (user_id, name, email, phone, password_hash)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET
            name = EXCLUDED.name,
            phone = COALESCE(EXCLUDED.phone, profiles.phone),
            password_hash = COALESCE(EXCLUDED.password_hash, profiles.password_hash),
            updated_at = NOW()
        WHERE profiles.email_verified = FALSE
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .bind(phone)
    .bind(password_hash)
    .fetch_optional(pool)
    .await
}

pub async fn mark_email_verified(
    pool: &PgPool,
    email: &str,
) -> Result<Option<ProfileRow>, sqlx::Error> {
    sqlx::query_as::<_, ProfileRow>(
        r#"
        UPDATE profiles SET email_verified = TRUE, updated_at = NOW()
        WHERE email = $1
        RETURNING *
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn set_password_hash(
    pool: &PgPool,
    email: &str,
    hash: &str,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE profiles SET password_hash = $2, updated_at = NOW() WHERE email = $1")
            .bind(email)
            .bind(hash)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squash(sql: &str) -> String {
        sql.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_attempts_are_decremented_in_place() {
        let sql = squash(SPEND_ATTEMPT_SQL);
        assert!(sql.contains("SET attempts_left = attempts_left - 1"));
        assert!(sql.contains("attempts_left > 0"));
        assert!(sql.contains("consumed_at IS NULL"));
        assert!(sql.contains("RETURNING attempts_left"));
    }

    #[test]
    fn test_consume_rechecks_attempts_and_expiry() {
        let sql = squash(CONSUME_TOKEN_SQL);
        assert!(sql.contains("consumed_at IS NULL"));
        assert!(sql.contains("attempts_left > 0"));
        assert!(sql.contains("expires_at > NOW()"));
    }
}
