//! The Admission API (spec §4.8): the single entry point that fronts the
//! Job Lifecycle, the Catalogue Store and the Epoch Manager for every
//! external caller.

pub mod admission;
pub mod board_state;
pub mod error;

pub use admission::{Admission, CoreAdmission};
pub use error::{Result, SpallocError};
