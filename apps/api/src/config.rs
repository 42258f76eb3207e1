use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub resend_api_key: String,
    pub mail_from: String,
    /// Public URL of the web client; magic links point here.
    pub app_base_url: String,
    pub port: u16,
    pub rust_log: String,
    pub otp: OtpSettings,
    pub job_ttl_days: i32,
    pub job_sweep_interval_secs: u64,
}

/// Limits applied to every one-time code issued by the auth module.
#[derive(Debug, Clone, Copy)]
pub struct OtpSettings {
    pub ttl_secs: i64,
    pub max_attempts: i32,
    pub max_resends: i32,
    pub resend_cooldown_secs: u64,
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            max_attempts: 5,
            max_resends: 3,
            resend_cooldown_secs: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = OtpSettings::default();

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            resend_api_key: require_env("RESEND_API_KEY")?,
            mail_from: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "localjobzz <no-reply@localjobzz.com>".to_string()),
            app_base_url: std::env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            otp: OtpSettings {
                ttl_secs: parse_env("OTP_TTL_SECS", defaults.ttl_secs)?,
                max_attempts: parse_env("OTP_MAX_ATTEMPTS", defaults.max_attempts)?,
                max_resends: parse_env("OTP_MAX_RESENDS", defaults.max_resends)?,
                resend_cooldown_secs: parse_env(
                    "OTP_RESEND_COOLDOWN_SECS",
                    defaults.resend_cooldown_secs,
                )?,
            },
            job_ttl_days: parse_env("JOB_TTL_DAYS", 30)?,
            job_sweep_interval_secs: parse_env("JOB_SWEEP_INTERVAL_SECS", 3600)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_rejects_out_of_range_ttl() {
        std::env::set_var("LOCALJOBZZ_TEST_TTL_DAYS", "99999999999");
        assert!(parse_env::<i32>("LOCALJOBZZ_TEST_TTL_DAYS", 30).is_err());
        std::env::set_var("LOCALJOBZZ_TEST_TTL_DAYS", "45");
        assert_eq!(parse_env::<i32>("LOCALJOBZZ_TEST_TTL_DAYS", 30).unwrap(), 45);
    }

    #[test]
    fn test_parse_env_default_when_unset() {
        assert_eq!(parse_env::<i32>("LOCALJOBZZ_TEST_UNSET_VAR", 30).unwrap(), 30);
    }
}
