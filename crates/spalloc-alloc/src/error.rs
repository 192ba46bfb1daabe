use spalloc_model::SpallocError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AllocError>;

#[derive(Error, Debug)]
pub enum AllocError {
    #[error(transparent)]
    Store(#[from] spalloc_store::StoreError),

    #[error("no machine matches the request's tag constraints")]
    NoMatchingMachine,

    #[error("no region satisfies the request")]
    NoRegionAvailable,

    #[error(transparent)]
    Model(#[from] SpallocError),
}

impl From<AllocError> for SpallocError {
    fn from(e: AllocError) -> Self {
        match e {
            AllocError::Store(e) => e.into(),
            AllocError::Model(e) => e,
            e @ (AllocError::NoMatchingMachine | AllocError::NoRegionAvailable) => {
                SpallocError::Transient(e.to_string())
            }
        }
    }
}
