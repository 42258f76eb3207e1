// Sign-up verification and password reset: one-time codes, magic links,
// resend cooldowns and mail delivery.

pub mod cooldown;
pub mod handlers;
pub mod mailer;
pub mod otp;
pub mod password;
pub mod service;
pub mod store;
