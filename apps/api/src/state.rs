use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use redis::Client as RedisClient;
use sqlx::PgPool;

use crate::auth::mailer::Mailer;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::messaging::hub::MessageHub;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Resend cooldowns and password-reset grants.
    pub redis: RedisClient,
    /// Job image storage.
    pub s3: S3Client,
    pub llm: LlmClient,
    pub config: Config,
    pub mailer: Arc<dyn Mailer>,
    /// Live message fan-out for SSE subscribers on this instance.
    pub hub: MessageHub,
}
