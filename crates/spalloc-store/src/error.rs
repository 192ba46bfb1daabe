use spalloc_model::SpallocError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("lock acquisition failed after retries: {0}")]
    LockFailed(String),
}

impl StoreError {
    /// A Postgres SQLSTATE for serialization failure or deadlock is
    /// transient and worth retrying (§4.3 "Retries").
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Db(sqlx::Error::Database(db)) => {
                matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
            }
            StoreError::LockFailed(_) => true,
            _ => false,
        }
    }
}

impl From<StoreError> for SpallocError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(m) => SpallocError::NotFound(m),
            StoreError::Conflict(m) => SpallocError::Conflict(m),
            e if e.is_transient() => SpallocError::Transient(e.to_string()),
            e => SpallocError::Internal(e.to_string()),
        }
    }
}
