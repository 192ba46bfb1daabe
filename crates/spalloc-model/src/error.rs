//! The error taxonomy from spec §7, expressed as a single enum.
//!
//! Per-crate error types (`LoaderError`, `StoreError`, `BmpError`, ...)
//! convert into this one via `From` so that callers above the engine layer
//! (the admission API, the binary) only ever match on one set of kinds.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SpallocError>;

#[derive(Error, Debug)]
pub enum SpallocError {
    /// Unknown job, board, machine or selector.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed request, conflicting selectors, invalid coordinates.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Name uniqueness violation, duplicate link, job already terminal.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Reserved for the external layer; nothing in the core engine raises
    /// this, but it is part of the taxonomy callers must be able to match.
    #[error("unauthorised: {0}")]
    Unauthorised(String),

    /// Lock acquisition failure, hardware timeout within retry budget.
    /// Callers may retry locally (allocation: next tick; BMP: next attempt).
    #[error("transient: {0}")]
    Transient(String),

    /// A BMP operation failed after its retry budget was exhausted.
    #[error("hardware: {0}")]
    Hardware(String),

    /// Invariant violation. Logged and surfaced as an internal error.
    #[error("internal: {0}")]
    Internal(String),
}

impl SpallocError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn bad_request(what: impl Into<String>) -> Self {
        Self::BadRequest(what.into())
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        Self::Conflict(what.into())
    }

    pub fn transient(what: impl Into<String>) -> Self {
        Self::Transient(what.into())
    }

    pub fn hardware(what: impl Into<String>) -> Self {
        Self::Hardware(what.into())
    }

    pub fn internal(what: impl Into<String>) -> Self {
        Self::Internal(what.into())
    }

    /// Whether a caller should retry this operation locally rather than
    /// surface it. Transient errors are the only kind that is retried
    /// implicitly by the engines themselves (§7 propagation rules).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
