//! One-time code lifecycle.
//!
//! `Idle → CodeSent → (Verified | Expired | AttemptsExhausted)`, with resend
//! looping back to `CodeSent` from `CodeSent` or `Expired`. The flow is pure:
//! handlers rebuild it from the stored token, apply one transition and
//! persist the counters it reports.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::OtpSettings;
use crate::models::token::MagicTokenRow;

pub const CODE_LENGTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPhase {
    Idle,
    CodeSent,
    Verified,
    Expired,
    AttemptsExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtpError {
    #[error("No code has been sent for this request")]
    NotIssued,

    #[error("The code has expired, request a new one")]
    Expired,

    #[error("Too many wrong attempts, request a new code")]
    AttemptsExhausted,

    #[error("No resends left, start again")]
    ResendsExhausted,

    #[error("Please wait {retry_after_secs}s before requesting another code")]
    Cooldown { retry_after_secs: u64 },

    #[error("Incorrect code, {attempts_left} attempt(s) left")]
    InvalidCode { attempts_left: i32 },

    #[error("This code has already been used")]
    AlreadyUsed,
}

#[derive(Debug, Clone)]
pub struct OtpFlow {
    phase: OtpPhase,
    settings: OtpSettings,
    attempts_left: i32,
    resends_left: i32,
    sent_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
}

impl OtpFlow {
    pub fn new(settings: OtpSettings) -> Self {
        Self {
            phase: OtpPhase::Idle,
            settings,
            attempts_left: settings.max_attempts,
            resends_left: settings.max_resends,
            sent_at: None,
            expires_at: None,
        }
    }

    /// Rebuilds the flow from a stored token as of `now`.
    pub fn from_token(row: &MagicTokenRow, settings: OtpSettings, now: DateTime<Utc>) -> Self {
        let mut flow = Self {
            phase: OtpPhase::CodeSent,
            settings,
            attempts_left: row.attempts_left,
            resends_left: row.resends_left,
            sent_at: Some(row.expires_at - Duration::seconds(settings.ttl_secs)),
            expires_at: Some(row.expires_at),
        };
        if row.consumed_at.is_some() {
            flow.phase = OtpPhase::Verified;
        } else if row.attempts_left <= 0 {
            flow.phase = OtpPhase::AttemptsExhausted;
        }
        flow.tick(now);
        flow
    }

    pub fn phase(&self) -> OtpPhase {
        self.phase
    }

    pub fn attempts_left(&self) -> i32 {
        self.attempts_left
    }

    pub fn resends_left(&self) -> i32 {
        self.resends_left
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Moves a live code past its expiry into `Expired`.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if self.phase == OtpPhase::CodeSent && self.expires_at.is_some_and(|e| now >= e) {
            self.phase = OtpPhase::Expired;
        }
    }

    /// First issue of a code.
    pub fn send(&mut self, now: DateTime<Utc>) -> Result<(), OtpError> {
        if self.phase != OtpPhase::Idle {
            return self.resend(now);
        }
        self.start_code(now);
        Ok(())
    }

    /// Rotates the code. Resets attempts and expiry, spends one resend.
    pub fn resend(&mut self, now: DateTime<Utc>) -> Result<(), OtpError> {
        self.tick(now);
        match self.phase {
            OtpPhase::Idle => return Err(OtpError::NotIssued),
            OtpPhase::Verified => return Err(OtpError::AlreadyUsed),
            OtpPhase::AttemptsExhausted => return Err(OtpError::AttemptsExhausted),
            OtpPhase::CodeSent | OtpPhase::Expired => {}
        }
        let wait = self.resend_available_in(now);
        if wait > 0 {
            return Err(OtpError::Cooldown {
                retry_after_secs: wait,
            });
        }
        if self.resends_left <= 0 {
            return Err(OtpError::ResendsExhausted);
        }
        self.resends_left -= 1;
        self.start_code(now);
        Ok(())
    }

    /// Applies one verification attempt; `code_matches` is decided by the caller.
    pub fn verify(&mut self, code_matches: bool, now: DateTime<Utc>) -> Result<(), OtpError> {
        self.tick(now);
        match self.phase {
            OtpPhase::Idle => return Err(OtpError::NotIssued),
            OtpPhase::Verified => return Err(OtpError::AlreadyUsed),
            OtpPhase::Expired => return Err(OtpError::Expired),
            OtpPhase::AttemptsExhausted => return Err(OtpError::AttemptsExhausted),
            OtpPhase::CodeSent => {}
        }
        if code_matches {
            self.phase = OtpPhase::Verified;
            return Ok(());
        }
        self.attempts_left = (self.attempts_left - 1).max(0);
        if self.attempts_left == 0 {
            self.phase = OtpPhase::AttemptsExhausted;
            return Err(OtpError::AttemptsExhausted);
        }
        Err(OtpError::InvalidCode {
            attempts_left: self.attempts_left,
        })
    }

    /// Countdown shown next to the code input.
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        match (self.phase, self.expires_at) {
            (OtpPhase::CodeSent, Some(expires)) => (expires - now).num_seconds().max(0),
            _ => 0,
        }
    }

    /// Seconds until another resend is allowed; 0 when allowed now.
    pub fn resend_available_in(&self, now: DateTime<Utc>) -> u64 {
        let Some(sent_at) = self.sent_at else {
            return 0;
        };
        let ready_at = sent_at + Duration::seconds(self.settings.resend_cooldown_secs as i64);
        (ready_at - now).num_seconds().max(0) as u64
    }

    fn start_code(&mut self, now: DateTime<Utc>) {
        self.phase = OtpPhase::CodeSent;
        self.attempts_left = self.settings.max_attempts;
        self.sent_at = Some(now);
        self.expires_at = Some(now + Duration::seconds(self.settings.ttl_secs));
    }
}

/// Error for a wrong guess, from the counter the store reports after
/// spending the attempt. `None` means there was nothing left to spend.
pub fn wrong_code_error(remaining: Option<i32>) -> OtpError {
    match remaining {
        Some(attempts_left) if attempts_left > 0 => OtpError::InvalidCode { attempts_left },
        _ => OtpError::AttemptsExhausted,
    }
}

/// Random zero-padded numeric code.
pub fn generate_code() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{n:0width$}", width = CODE_LENGTH)
}

/// Random URL-safe token for magic links and password-reset grants.
pub fn generate_link_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Codes and tokens are stored as SHA-256 hex digests only.
pub fn hash_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.trim().as_bytes()))
}

/// Accepts "123 456" or "123-456" as typed on a phone keypad.
pub fn normalize_code(input: &str) -> Option<String> {
    let digits: String = input.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    (digits.len() == CODE_LENGTH && digits.chars().all(|c| c.is_ascii_digit())).then_some(digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn settings() -> OtpSettings {
        OtpSettings {
            ttl_secs: 600,
            max_attempts: 3,
            max_resends: 2,
            resend_cooldown_secs: 60,
        }
    }

    fn sent_flow(now: DateTime<Utc>) -> OtpFlow {
        let mut flow = OtpFlow::new(settings());
        flow.send(now).unwrap();
        flow
    }

    #[test]
    fn test_send_starts_countdown() {
        let now = Utc::now();
        let flow = sent_flow(now);
        assert_eq!(flow.phase(), OtpPhase::CodeSent);
        assert_eq!(flow.seconds_remaining(now), 600);
        assert_eq!(flow.seconds_remaining(now + Duration::seconds(100)), 500);
    }

    #[test]
    fn test_correct_code_verifies() {
        let now = Utc::now();
        let mut flow = sent_flow(now);
        flow.verify(true, now).unwrap();
        assert_eq!(flow.phase(), OtpPhase::Verified);
        assert_eq!(flow.verify(true, now), Err(OtpError::AlreadyUsed));
    }

    #[test]
    fn test_wrong_codes_exhaust_attempts() {
        let now = Utc::now();
        let mut flow = sent_flow(now);
        assert_eq!(
            flow.verify(false, now),
            Err(OtpError::InvalidCode { attempts_left: 2 })
        );
        assert_eq!(
            flow.verify(false, now),
            Err(OtpError::InvalidCode { attempts_left: 1 })
        );
        assert_eq!(flow.verify(false, now), Err(OtpError::AttemptsExhausted));
        assert_eq!(flow.phase(), OtpPhase::AttemptsExhausted);
        // Even the right code is refused now.
        assert_eq!(flow.verify(true, now), Err(OtpError::AttemptsExhausted));
        assert_eq!(
            flow.resend(now + Duration::seconds(120)),
            Err(OtpError::AttemptsExhausted)
        );
    }

    #[test]
    fn test_code_expires() {
        let now = Utc::now();
        let mut flow = sent_flow(now);
        let later = now + Duration::seconds(601);
        assert_eq!(flow.verify(true, later), Err(OtpError::Expired));
        assert_eq!(flow.phase(), OtpPhase::Expired);
        assert_eq!(flow.seconds_remaining(later), 0);
    }

    #[test]
    fn test_resend_respects_cooldown() {
        let now = Utc::now();
        let mut flow = sent_flow(now);
        let soon = now + Duration::seconds(20);
        assert_eq!(
            flow.resend(soon),
            Err(OtpError::Cooldown {
                retry_after_secs: 40
            })
        );
        assert_eq!(flow.resend_available_in(soon), 40);
    }

    #[test]
    fn test_resend_after_expiry_returns_to_code_sent() {
        let now = Utc::now();
        let mut flow = sent_flow(now);
        let _ = flow.verify(false, now);
        let later = now + Duration::seconds(700);
        flow.resend(later).unwrap();
        assert_eq!(flow.phase(), OtpPhase::CodeSent);
        assert_eq!(flow.attempts_left(), 3);
        assert_eq!(flow.resends_left(), 1);
        assert_eq!(flow.seconds_remaining(later), 600);
    }

    #[test]
    fn test_resends_run_out() {
        let mut now = Utc::now();
        let mut flow = sent_flow(now);
        for _ in 0..2 {
            now += Duration::seconds(61);
            flow.resend(now).unwrap();
        }
        now += Duration::seconds(61);
        assert_eq!(flow.resend(now), Err(OtpError::ResendsExhausted));
    }

    #[test]
    fn test_idle_flow_rejects_verify_and_resend() {
        let now = Utc::now();
        let mut flow = OtpFlow::new(settings());
        assert_eq!(flow.verify(true, now), Err(OtpError::NotIssued));
        assert_eq!(flow.resend(now), Err(OtpError::NotIssued));
        assert_eq!(flow.resend_available_in(now), 0);
    }

    #[test]
    fn test_from_token_reconstructs_phase() {
        let now = Utc::now();
        let mut row = MagicTokenRow {
            id: Uuid::new_v4(),
            email: "a@b.in".to_string(),
            purpose: "signup".to_string(),
            token_hash: hash_secret("t"),
            code_hash: hash_secret("123456"),
            attempts_left: 2,
            resends_left: 1,
            expires_at: now + Duration::seconds(300),
            consumed_at: None,
            created_at: now,
        };
        let flow = OtpFlow::from_token(&row, settings(), now);
        assert_eq!(flow.phase(), OtpPhase::CodeSent);
        assert_eq!(flow.attempts_left(), 2);
        // Sent 300s ago, so the cooldown has passed.
        assert_eq!(flow.resend_available_in(now), 0);

        row.attempts_left = 0;
        assert_eq!(
            OtpFlow::from_token(&row, settings(), now).phase(),
            OtpPhase::AttemptsExhausted
        );

        row.attempts_left = 2;
        row.consumed_at = Some(now);
        assert_eq!(
            OtpFlow::from_token(&row, settings(), now).phase(),
            OtpPhase::Verified
        );

        row.consumed_at = None;
        row.expires_at = now - Duration::seconds(1);
        assert_eq!(
            OtpFlow::from_token(&row, settings(), now).phase(),
            OtpPhase::Expired
        );
    }

    #[test]
    fn test_wrong_code_error_follows_stored_counter() {
        // Parallel guesses each see the counter the database left behind.
        let stored: Vec<OtpError> = [Some(4), Some(3), Some(0), None]
            .into_iter()
            .map(wrong_code_error)
            .collect();
        assert_eq!(
            stored,
            vec![
                OtpError::InvalidCode { attempts_left: 4 },
                OtpError::InvalidCode { attempts_left: 3 },
                OtpError::AttemptsExhausted,
                OtpError::AttemptsExhausted,
            ]
        );
    }

    #[test]
    fn test_generated_code_shape() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_link_tokens_are_unique_hex() {
        let a = generate_link_token();
        let b = generate_link_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_is_stable_and_trims() {
        assert_eq!(hash_secret("123456"), hash_secret(" 123456 "));
        assert_ne!(hash_secret("123456"), hash_secret("123457"));
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("123 456").as_deref(), Some("123456"));
        assert_eq!(normalize_code("123-456").as_deref(), Some("123456"));
        assert_eq!(normalize_code("12345"), None);
        assert_eq!(normalize_code("12a456"), None);
    }
}
