use spalloc_model::SpallocError;
use spalloc_store::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, JobsError>;

#[derive(Error, Debug)]
pub enum JobsError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Model(#[from] SpallocError),

    #[error("bad keepalive interval: {0}")]
    BadKeepalive(String),
}

impl From<JobsError> for SpallocError {
    fn from(e: JobsError) -> Self {
        match e {
            JobsError::Store(e) => e.into(),
            JobsError::Model(e) => e,
            JobsError::BadKeepalive(m) => SpallocError::BadRequest(m),
        }
    }
}
