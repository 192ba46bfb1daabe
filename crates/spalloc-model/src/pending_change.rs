//! Pending hardware changes queued against a board for a job (spec §3).

use crate::ids::{BoardId, JobId, PendingChangeId};
use serde::{Deserialize, Serialize};

/// Per-FPGA link-init flags, only meaningful on power-on. One field per
/// outbound direction; `false` means that FPGA's link stays disabled
/// because the corresponding outbound link is dead or crosses the
/// allocation boundary (§4.4 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LinkInitFlags {
    pub n: bool,
    pub s: bool,
    pub e: bool,
    pub w: bool,
    pub ne: bool,
    pub sw: bool,
}

impl LinkInitFlags {
    pub fn all_enabled() -> Self {
        Self { n: true, s: true, e: true, w: true, ne: true, sw: true }
    }

    pub fn all_disabled() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Power { on: bool, link_init: LinkInitFlags },
    BlacklistRead,
    BlacklistWrite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeStatus {
    Queued,
    InFlight,
    Done,
    Failed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingChange {
    pub id: PendingChangeId,
    pub job_id: JobId,
    pub board_id: BoardId,
    pub kind: ChangeKind,
    pub status: ChangeStatus,
}
