//! Outgoing mail for sign-up and password-reset codes.
//!
//! Delivery tries the magic-link email three times (the first send plus two
//! retries, two seconds apart). If every attempt fails it falls back to a
//! plain code email, so the user can still type the code by hand.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

const RESEND_API_URL: &str = "https://api.resend.com/emails";
pub const MAGIC_LINK_RETRIES: u32 = 2;
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum MailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail provider rejected the message (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid recipient '{0}'")]
    InvalidRecipient(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

/// Sends through the Resend HTTP API.
pub struct ResendMailer {
    client: Client,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        if !email.to.contains('@') {
            return Err(MailError::InvalidRecipient(email.to.clone()));
        }
        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [email.to],
                "subject": email.subject,
                "html": email.html,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Rejected {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        info!("Email '{}' sent to {}", email.subject, email.to);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    MagicLink,
    OtpCode,
}

/// What a code email is for; drives subject and wording.
#[derive(Debug, Clone, Copy)]
pub enum CodeEmailKind {
    Signup,
    PasswordReset,
}

pub fn magic_link_email(to: &str, kind: CodeEmailKind, link: &str, code: &str) -> OutgoingEmail {
    let (subject, action) = match kind {
        CodeEmailKind::Signup => ("Verify your localjobzz account", "verify your email"),
        CodeEmailKind::PasswordReset => ("Reset your localjobzz password", "reset your password"),
    };
    OutgoingEmail {
        to: to.to_string(),
        subject: subject.to_string(),
        html: format!(
            "<p>Tap the link below to {action}:</p>\
             <p><a href=\"{link}\">{link}</a></p>\
             <p>Or enter this code: <strong>{code}</strong></p>"
        ),
    }
}

pub fn code_only_email(to: &str, kind: CodeEmailKind, code: &str) -> OutgoingEmail {
    let subject = match kind {
        CodeEmailKind::Signup => "Your localjobzz verification code",
        CodeEmailKind::PasswordReset => "Your localjobzz password reset code",
    };
    OutgoingEmail {
        to: to.to_string(),
        subject: subject.to_string(),
        html: format!("<p>Your code is <strong>{code}</strong>.</p>"),
    }
}

/// Magic link with retries, then a code-only email as the last resort.
pub async fn deliver_with_fallback(
    mailer: &dyn Mailer,
    magic: &OutgoingEmail,
    fallback: &OutgoingEmail,
) -> Result<DeliveryChannel, MailError> {
    for attempt in 0..=MAGIC_LINK_RETRIES {
        if attempt > 0 {
            tokio::time::sleep(RETRY_DELAY).await;
        }
        match mailer.send(magic).await {
            Ok(()) => return Ok(DeliveryChannel::MagicLink),
            Err(e) => warn!(
                "Magic link to {} failed (attempt {}/{}): {e}",
                magic.to,
                attempt + 1,
                MAGIC_LINK_RETRIES + 1
            ),
        }
    }

    warn!("Falling back to code-only email for {}", fallback.to);
    mailer.send(fallback).await?;
    Ok(DeliveryChannel::OtpCode)
}
