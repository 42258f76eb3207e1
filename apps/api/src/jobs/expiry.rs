use std::time::Duration;

use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::jobs::repository::expire_stale_jobs;

/// Spawns the background loop that retires listings older than `ttl_days`.
pub fn spawn_expiry_sweep(pool: PgPool, ttl_days: i32, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match expire_stale_jobs(&pool, ttl_days).await {
                Ok(0) => {}
                Ok(n) => info!("Expired {n} job(s) older than {ttl_days} days"),
                Err(e) => error!("Job expiry sweep failed: {e}"),
            }
        }
    })
}
