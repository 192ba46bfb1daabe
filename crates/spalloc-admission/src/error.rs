//! The Admission API's errors are exactly the workspace taxonomy (spec
//! §4.8: "no operation may leak a storage- or hardware-specific error; a
//! caller sees only the taxonomy from §7").

pub use spalloc_model::{Result, SpallocError};
