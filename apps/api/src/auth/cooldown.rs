//! Redis-backed guards shared by every API instance: the per-email resend
//! cooldown and single-use password-reset grants.

use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::models::token::TokenPurpose;

pub const RESET_GRANT_TTL_SECS: u64 = 900;

pub fn cooldown_key(purpose: TokenPurpose, email: &str) -> String {
    format!("otp:cooldown:{}:{}", purpose.as_str(), email.to_lowercase())
}

pub fn reset_grant_key(token_hash: &str) -> String {
    format!("pwreset:grant:{token_hash}")
}

pub async fn connect(client: &redis::Client) -> redis::RedisResult<MultiplexedConnection> {
    client.get_multiplexed_async_connection().await
}

/// Starts the cooldown if none is running. Returns the seconds left on an
/// existing cooldown, or `None` when the caller may proceed.
pub async fn try_start_cooldown(
    conn: &mut MultiplexedConnection,
    key: &str,
    secs: u64,
) -> redis::RedisResult<Option<u64>> {
    let set: Option<String> = redis::cmd("SET")
        .arg(key)
        .arg(1)
        .arg("NX")
        .arg("EX")
        .arg(secs)
        .query_async(conn)
        .await?;
    if set.is_some() {
        return Ok(None);
    }
    let ttl: i64 = conn.ttl(key).await?;
    Ok(Some(ttl.max(1) as u64))
}

/// Stores a reset grant pointing at `email`.
pub async fn store_reset_grant(
    conn: &mut MultiplexedConnection,
    token_hash: &str,
    email: &str,
) -> redis::RedisResult<()> {
    redis::cmd("SET")
        .arg(reset_grant_key(token_hash))
        .arg(email)
        .arg("EX")
        .arg(RESET_GRANT_TTL_SECS)
        .query_async(conn)
        .await
}

/// Reads a reset grant without spending it.
pub async fn peek_reset_grant(
    conn: &mut MultiplexedConnection,
    token_hash: &str,
) -> redis::RedisResult<Option<String>> {
    conn.get(reset_grant_key(token_hash)).await
}

/// Atomically reads and deletes a reset grant so it can only be used once.
pub async fn take_reset_grant(
    conn: &mut MultiplexedConnection,
    token_hash: &str,
) -> redis::RedisResult<Option<String>> {
    redis::cmd("GETDEL")
        .arg(reset_grant_key(token_hash))
        .query_async(conn)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_key_is_case_insensitive() {
        assert_eq!(
            cooldown_key(TokenPurpose::Signup, "Ravi@Example.com"),
            "otp:cooldown:signup:ravi@example.com"
        );
        assert_ne!(
            cooldown_key(TokenPurpose::Signup, "a@b.in"),
            cooldown_key(TokenPurpose::PasswordReset, "a@b.in")
        );
    }

    #[test]
    fn test_reset_grant_key() {
        assert_eq!(reset_grant_key("abc"), "pwreset:grant:abc");
    }
}
