//! The Catalogue Store (spec §4.3): durable state for machines, boards,
//! links, jobs and pending changes, backed by Postgres.

pub mod error;
pub mod job_repo;
pub mod machine_repo;
pub mod pool;
pub mod rows;

pub use error::{Result, StoreError};
pub use machine_repo::{Inserted, NewBoard};
pub use pool::RetryPolicy;

use sqlx::PgPool;
use std::time::Duration;

/// A handle on the connected pool, passed around the engines in place of
/// a raw `PgPool` so call sites read as catalogue operations rather than
/// bare SQL (spec §4.3's "abstract operations the other modules use").
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
    retry: RetryPolicy,
}

impl Store {
    pub async fn connect(url: &str, acquire_timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let pool = pool::connect(url, acquire_timeout).await?;
        Ok(Self { pool, retry })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }
}
