use spalloc_model::SpallocError;
use spalloc_store::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BmpError>;

#[derive(Error, Debug)]
pub enum BmpError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A transceiver operation failed after its configured retry budget
    /// was exhausted (spec §4.5).
    #[error("hardware error: {0}")]
    Hardware(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<BmpError> for SpallocError {
    fn from(e: BmpError) -> Self {
        match e {
            BmpError::Store(e) => e.into(),
            BmpError::Hardware(m) => SpallocError::Hardware(m),
            BmpError::Internal(m) => SpallocError::Internal(m),
        }
    }
}
