//! Server side of the sign-up and password-reset flows: issue, deliver,
//! verify and rotate one-time codes.

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::auth::cooldown::{self, cooldown_key, try_start_cooldown};
use crate::auth::mailer::{
    code_only_email, deliver_with_fallback, magic_link_email, CodeEmailKind, DeliveryChannel,
};
use crate::auth::otp::{
    generate_code, generate_link_token, hash_secret, normalize_code, wrong_code_error, OtpError,
    OtpFlow, OtpPhase,
};
use crate::auth::store::{self, NewToken};
use crate::config::OtpSettings;
use crate::errors::AppError;
use crate::models::token::{MagicTokenRow, TokenPurpose};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct IssueOutcome {
    pub channel: DeliveryChannel,
    pub expires_in_secs: i64,
    pub resends_left: i32,
}

/// Lower-cases and sanity-checks an email address.
pub fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty() && domain.contains('.') && !domain.ends_with('.')
    });
    if !valid {
        return Err(AppError::Validation(format!("'{raw}' is not a valid email")));
    }
    Ok(email)
}

/// Web client route the magic link opens.
pub fn magic_link_url(base_url: &str, purpose: TokenPurpose, token: &str) -> String {
    let path = match purpose {
        TokenPurpose::Signup => "verify-email",
        TokenPurpose::PasswordReset => "reset-password/verify",
    };
    format!("{}/{path}?token={token}", base_url.trim_end_matches('/'))
}

fn email_kind(purpose: TokenPurpose) -> CodeEmailKind {
    match purpose {
        TokenPurpose::Signup => CodeEmailKind::Signup,
        TokenPurpose::PasswordReset => CodeEmailKind::PasswordReset,
    }
}

async fn deliver(
    state: &AppState,
    email: &str,
    purpose: TokenPurpose,
    link_token: &str,
    code: &str,
) -> Result<DeliveryChannel, AppError> {
    let kind = email_kind(purpose);
    let link = magic_link_url(&state.config.app_base_url, purpose, link_token);
    let magic = magic_link_email(email, kind, &link, code);
    let fallback = code_only_email(email, kind, code);
    Ok(deliver_with_fallback(state.mailer.as_ref(), &magic, &fallback).await?)
}

/// Starts the cross-instance resend cooldown for `email`, or reports the wait.
async fn start_cooldown(
    state: &AppState,
    email: &str,
    purpose: TokenPurpose,
) -> Result<(), AppError> {
    let mut conn = cooldown::connect(&state.redis).await?;
    if let Some(wait) = try_start_cooldown(
        &mut conn,
        &cooldown_key(purpose, email),
        state.config.otp.resend_cooldown_secs,
    )
    .await?
    {
        return Err(OtpError::Cooldown {
            retry_after_secs: wait,
        }
        .into());
    }
    Ok(())
}

/// A stored token together with the plaintext secrets to mail out.
struct IssuedCode {
    code: String,
    link_token: String,
    outcome: IssueOutcome,
}

async fn store_new_code(
    state: &AppState,
    email: &str,
    purpose: TokenPurpose,
) -> Result<IssuedCode, AppError> {
    let now = Utc::now();
    let mut flow = OtpFlow::new(state.config.otp);
    flow.send(now)?;
    let expires_at = flow.expires_at().ok_or(OtpError::NotIssued)?;

    let code = generate_code();
    let link_token = generate_link_token();
    store::insert_token(
        &state.db,
        NewToken {
            email,
            purpose,
            token_hash: &hash_secret(&link_token),
            code_hash: &hash_secret(&code),
            attempts_left: flow.attempts_left(),
            resends_left: flow.resends_left(),
            expires_at,
        },
    )
    .await?;
    info!("Issued {} code for {email}", purpose.as_str());

    Ok(IssuedCode {
        code,
        link_token,
        outcome: IssueOutcome {
            channel: DeliveryChannel::MagicLink,
            expires_in_secs: flow.seconds_remaining(now),
            resends_left: flow.resends_left(),
        },
    })
}

/// Issues a fresh code for `email`, replacing any live one.
pub async fn issue_code(
    state: &AppState,
    email: &str,
    purpose: TokenPurpose,
) -> Result<IssueOutcome, AppError> {
    start_cooldown(state, email, purpose).await?;
    let issued = store_new_code(state, email, purpose).await?;
    let channel = deliver(state, email, purpose, &issued.link_token, &issued.code).await?;
    Ok(IssueOutcome {
        channel,
        ..issued.outcome
    })
}

/// What every password-reset request is told, whether or not the account exists.
pub fn reset_request_outcome(settings: OtpSettings) -> IssueOutcome {
    IssueOutcome {
        channel: DeliveryChannel::MagicLink,
        expires_in_secs: settings.ttl_secs,
        resends_left: settings.max_resends,
    }
}

/// Starts a password reset. Known and unknown emails share the cooldown and
/// the response; mail goes out in the background so timing matches too.
pub async fn request_password_reset(
    state: &AppState,
    email: &str,
) -> Result<IssueOutcome, AppError> {
    let purpose = TokenPurpose::PasswordReset;
    start_cooldown(state, email, purpose).await?;
    let outcome = reset_request_outcome(state.config.otp);

    if store::profile_by_email(&state.db, email).await?.is_none() {
        info!("Password reset requested for unknown email {email}");
        return Ok(outcome);
    }

    let issued = store_new_code(state, email, purpose).await?;
    let state = state.clone();
    let email = email.to_string();
    tokio::spawn(async move {
        if let Err(e) = deliver(&state, &email, purpose, &issued.link_token, &issued.code).await {
            error!("Password reset mail to {email} failed: {e}");
        }
    });
    Ok(outcome)
}

/// Rotates the code on the latest token, subject to cooldown and resend limits.
pub async fn resend_code(
    state: &AppState,
    email: &str,
    purpose: TokenPurpose,
) -> Result<IssueOutcome, AppError> {
    let settings = state.config.otp;
    let row = store::latest_token(&state.db, email, purpose)
        .await?
        .ok_or(OtpError::NotIssued)?;

    let now = Utc::now();
    let mut flow = OtpFlow::from_token(&row, settings, now);
    flow.resend(now)?;

    start_cooldown(state, email, purpose).await?;

    let code = generate_code();
    let link_token = generate_link_token();
    store::rotate_code(
        &state.db,
        row.id,
        &hash_secret(&link_token),
        &hash_secret(&code),
        flow.attempts_left(),
        flow.resends_left(),
        flow.expires_at().ok_or(OtpError::NotIssued)?,
    )
    .await?;
    info!(
        "Re-sent {} code for {email}, {} resend(s) left",
        purpose.as_str(),
        flow.resends_left()
    );

    let channel = deliver(state, email, purpose, &link_token, &code).await?;
    Ok(IssueOutcome {
        channel,
        expires_in_secs: flow.seconds_remaining(now),
        resends_left: flow.resends_left(),
    })
}

/// Checks a typed code against the latest token and consumes it on success.
pub async fn verify_code(
    state: &AppState,
    email: &str,
    purpose: TokenPurpose,
    code: &str,
) -> Result<MagicTokenRow, AppError> {
    let code = normalize_code(code)
        .ok_or_else(|| AppError::Validation("code must be 6 digits".to_string()))?;
    let row = store::latest_token(&state.db, email, purpose)
        .await?
        .ok_or(OtpError::NotIssued)?;

    let now = Utc::now();
    let mut flow = OtpFlow::from_token(&row, state.config.otp, now);
    let live = flow.phase() == OtpPhase::CodeSent;
    let matches = hash_secret(&code) == row.code_hash;

    if let Err(e) = flow.verify(matches, now) {
        // The stored counter is decremented in place; the flow only saw a snapshot.
        let e = if live && !matches {
            wrong_code_error(store::spend_attempt(&state.db, row.id).await?)
        } else {
            e
        };
        warn!("Code check for {email} failed ({e})");
        return Err(e.into());
    }

    consume(state, row).await
}

/// Verifies a magic-link token and consumes it.
pub async fn verify_link(state: &AppState, token: &str) -> Result<MagicTokenRow, AppError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::Validation("token cannot be empty".to_string()));
    }
    let row = store::token_by_link_hash(&state.db, &hash_secret(token))
        .await?
        .ok_or_else(|| AppError::NotFound("This link is invalid".to_string()))?;

    let now = Utc::now();
    let mut flow = OtpFlow::from_token(&row, state.config.otp, now);
    flow.verify(true, now)?;
    consume(state, row).await
}

async fn consume(state: &AppState, row: MagicTokenRow) -> Result<MagicTokenRow, AppError> {
    if !store::consume_token(&state.db, row.id).await? {
        return Err(OtpError::AlreadyUsed.into());
    }
    info!("Verified {} token for {}", row.purpose, row.email);
    Ok(row)
}

/// Hands out a single-use grant that authorises setting a new password.
pub async fn grant_password_reset(state: &AppState, email: &str) -> Result<String, AppError> {
    let grant = generate_link_token();
    let mut conn = cooldown::connect(&state.redis).await?;
    cooldown::store_reset_grant(&mut conn, &hash_secret(&grant), email).await?;
    Ok(grant)
}

/// Looks up the email a reset grant was issued for without spending it.
pub async fn peek_password_reset(state: &AppState, grant: &str) -> Result<String, AppError> {
    let mut conn = cooldown::connect(&state.redis).await?;
    cooldown::peek_reset_grant(&mut conn, &hash_secret(grant))
        .await?
        .ok_or_else(reset_expired)
}

/// Spends a reset grant. Only one caller can win it.
pub async fn redeem_password_reset(state: &AppState, grant: &str) -> Result<String, AppError> {
    let mut conn = cooldown::connect(&state.redis).await?;
    cooldown::take_reset_grant(&mut conn, &hash_secret(grant))
        .await?
        .ok_or_else(reset_expired)
}

fn reset_expired() -> AppError {
    AppError::Gone("This reset link has expired, start again".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ravi@Example.COM ").unwrap(), "ravi@example.com");
        assert!(normalize_email("ravi").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("ravi@localhost").is_err());
        assert!(normalize_email("ravi@example.").is_err());
    }

    #[test]
    fn test_reset_response_does_not_depend_on_account() {
        let settings = OtpSettings::default();
        let outcome = reset_request_outcome(settings);
        assert_eq!(outcome.channel, DeliveryChannel::MagicLink);
        assert_eq!(outcome.expires_in_secs, settings.ttl_secs);
        assert_eq!(outcome.resends_left, settings.max_resends);
    }

    #[test]
    fn test_magic_link_routes() {
        assert_eq!(
            magic_link_url("https://localjobzz.com/", TokenPurpose::Signup, "abc"),
            "https://localjobzz.com/verify-email?token=abc"
        );
        assert_eq!(
            magic_link_url("https://localjobzz.com", TokenPurpose::PasswordReset, "abc"),
            "https://localjobzz.com/reset-password/verify?token=abc"
        );
    }
}
