//! Pool setup and the retry-with-backoff wrapper (§4.3 "Retries": on
//! transient lock failure, retry up to N times with a short configurable
//! back-off, then surface the error).

use crate::error::{Result, StoreError};
use sqlx::postgres::{PgPoolOptions, PgPool};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

pub async fn connect(url: &str, timeout: Duration) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(16)
        .acquire_timeout(timeout)
        .connect(url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

/// Retry policy mirroring `db.lock_tries` / `db.lock_failed_delay`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub tries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { tries: 3, delay: Duration::from_millis(100) }
    }
}

pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < policy.tries => {
                warn!(attempt, tries = policy.tries, "transient store error, retrying: {e}");
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) if e.is_transient() => {
                return Err(StoreError::LockFailed(format!(
                    "gave up after {attempt} attempts: {e}"
                )))
            }
            Err(e) => return Err(e),
        }
    }
}
