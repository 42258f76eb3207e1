//! Axum route handlers for sign-up, verification and password reset.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::service::{self, normalize_email, IssueOutcome};
use crate::auth::{password, store};
use crate::errors::AppError;
use crate::models::profile::ProfileRow;
use crate::models::token::TokenPurpose;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub delivery: IssueOutcome,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
    #[serde(default = "default_purpose")]
    pub purpose: TokenPurpose,
}

fn default_purpose() -> TokenPurpose {
    TokenPurpose::Signup
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct MagicTokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct VerifiedResponse {
    pub verified: bool,
    pub profile: ProfileRow,
}

#[derive(Debug, Serialize)]
pub struct MagicTokenResponse {
    pub purpose: TokenPurpose,
    pub email: String,
    /// Set for sign-up links.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileRow>,
    /// Set for password-reset links.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResetGrantResponse {
    pub reset_token: String,
}

#[derive(Debug, Deserialize)]
pub struct NewPasswordRequest {
    pub reset_token: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/auth/signup
pub async fn handle_signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let email = normalize_email(&request.email)?;
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    let password_hash = request.password.as_deref().map(password::hash).transpose()?;
    let phone = request
        .phone
        .as_deref()
        .map(crate::jobs::posting::normalize_phone)
        .transpose()?;

    let profile = store::upsert_pending_profile(
        &state.db,
        name,
        &email,
        phone.as_deref(),
        password_hash.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::Conflict(format!("An account for {email} already exists")))?;

    let delivery = service::issue_code(&state, &email, TokenPurpose::Signup).await?;
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user_id: profile.user_id,
            delivery,
        }),
    ))
}

/// POST /api/v1/auth/verify-otp
pub async fn handle_verify_otp(
    State(state): State<AppState>,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<Json<VerifiedResponse>, AppError> {
    let email = normalize_email(&request.email)?;
    service::verify_code(&state, &email, TokenPurpose::Signup, &request.code).await?;
    let profile = verified_profile(&state, &email).await?;
    Ok(Json(VerifiedResponse {
        verified: true,
        profile,
    }))
}

/// POST /api/v1/auth/verify-magic-token
pub async fn handle_verify_magic_token(
    State(state): State<AppState>,
    Json(request): Json<MagicTokenRequest>,
) -> Result<Json<MagicTokenResponse>, AppError> {
    let row = service::verify_link(&state, &request.token).await?;
    let response = match row.purpose.as_str() {
        "password_reset" => MagicTokenResponse {
            purpose: TokenPurpose::PasswordReset,
            reset_token: Some(service::grant_password_reset(&state, &row.email).await?),
            email: row.email,
            profile: None,
        },
        _ => MagicTokenResponse {
            purpose: TokenPurpose::Signup,
            profile: Some(verified_profile(&state, &row.email).await?),
            email: row.email,
            reset_token: None,
        },
    };
    Ok(Json(response))
}

/// POST /api/v1/auth/resend-otp
pub async fn handle_resend_otp(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<IssueOutcome>, AppError> {
    let email = normalize_email(&request.email)?;
    Ok(Json(
        service::resend_code(&state, &email, request.purpose).await?,
    ))
}

/// POST /api/v1/auth/forgot-password
///
/// Unknown emails get the same response as known ones.
pub async fn handle_forgot_password(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<IssueOutcome>, AppError> {
    let email = normalize_email(&request.email)?;
    Ok(Json(service::request_password_reset(&state, &email).await?))
}

/// POST /api/v1/auth/reset-password/verify
pub async fn handle_reset_password_verify(
    State(state): State<AppState>,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<Json<ResetGrantResponse>, AppError> {
    let email = normalize_email(&request.email)?;
    service::verify_code(&state, &email, TokenPurpose::PasswordReset, &request.code).await?;
    let reset_token = service::grant_password_reset(&state, &email).await?;
    Ok(Json(ResetGrantResponse { reset_token }))
}

/// POST /api/v1/auth/reset-password/new
///
/// The grant is only spent once the new password is accepted, so a rejected
/// password can be retried with the same grant.
pub async fn handle_reset_password_new(
    State(state): State<AppState>,
    Json(request): Json<NewPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let grant = request.reset_token.trim();
    let email = service::peek_password_reset(&state, grant).await?;

    let profile = store::profile_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No account for {email}")))?;
    check_new_password(&request.new_password, profile.password_hash.as_deref())?;
    let hashed = password::hash(&request.new_password)?;

    let email = service::redeem_password_reset(&state, grant).await?;
    store::set_password_hash(&state.db, &email, &hashed).await?;
    info!("Password reset completed for {email}");
    Ok(Json(MessageResponse {
        message: "Your password has been updated".to_string(),
    }))
}

/// Length rules, and the new password must not be the current one.
fn check_new_password(new_password: &str, current_hash: Option<&str>) -> Result<(), AppError> {
    password::validate(new_password)?;
    if current_hash.is_some_and(|old| password::verify(new_password, old)) {
        return Err(AppError::Validation(
            "new password must differ from the current one".to_string(),
        ));
    }
    Ok(())
}

async fn verified_profile(state: &AppState, email: &str) -> Result<ProfileRow, AppError> {
    store::mark_email_verified(&state.db, email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No account for {email}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_password_must_differ_from_current() {
        let current = password::hash("old secret 1").unwrap();
        assert!(matches!(
            check_new_password("old secret 1", Some(&current)),
            Err(AppError::Validation(_))
        ));
        assert!(check_new_password("new secret 2", Some(&current)).is_ok());
        assert!(check_new_password("new secret 2", None).is_ok());
    }

    #[test]
    fn test_short_new_password_rejected() {
        assert!(matches!(
            check_new_password("short", None),
            Err(AppError::Validation(_))
        ));
    }
}
