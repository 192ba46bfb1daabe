//! The three epoch domains a caller can `waitFor` (spec §3, §4.7).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EpochDomain {
    Machine,
    Job,
    Blacklist,
}

impl EpochDomain {
    pub const ALL: [EpochDomain; 3] =
        [EpochDomain::Machine, EpochDomain::Job, EpochDomain::Blacklist];
}
