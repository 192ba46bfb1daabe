//! Surrogate-key newtypes.
//!
//! The catalogue store hands these out as `BIGSERIAL` ids; keeping them as
//! distinct types (rather than raw `i64`) prevents a `BoardId` ending up
//! where a `JobId` was expected, the arena-of-indices pattern from
//! spec §9's cyclic-reference note applied to the storage layer too.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(v: i64) -> Self {
                Self(v)
            }
        }

        impl From<$name> for i64 {
            fn from(v: $name) -> Self {
                v.0
            }
        }
    };
}

id_type!(MachineId);
id_type!(BoardId);
id_type!(LinkId);
id_type!(BmpId);
id_type!(JobId);
id_type!(PendingChangeId);
