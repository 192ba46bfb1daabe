//! Shared domain types for the spalloc core engine: coordinates, the
//! Machine/Board/Link/BMP entities, the Job state machine, the polymorphic
//! job request, pending changes, epoch domains, and the error taxonomy.
//!
//! Grounded on `knhk-autonomic::types`/`error` (teacher: `seanchatmangpt-knhk`):
//! one error enum per concern, plain data structs with `serde` derives, no
//! back-pointers between entities (spec §9's arena-of-indices redesign
//! flag — `Board`/`Link` reference their `Machine` and each other only by
//! id, never by reference).

pub mod coord;
pub mod direction;
pub mod epoch;
pub mod error;
pub mod ids;
pub mod job;
pub mod machine;
pub mod pending_change;
pub mod request;

pub use coord::{CabinetFrame, ChipCoord, Physical, Triad};
pub use direction::Direction;
pub use epoch::EpochDomain;
pub use error::{Result, SpallocError};
pub use ids::{BmpId, BoardId, JobId, LinkId, MachineId, PendingChangeId};
pub use job::{Job, JobState};
pub use machine::{Bmp, Board, Link, Machine, MachineSummary, PowerState};
pub use pending_change::{ChangeKind, ChangeStatus, LinkInitFlags, PendingChange};
pub use request::{BoardSelector, JobRequest};

/// Triad-chip spacing in chips (spec §4.1): S.
pub const TRIAD_CHIP_SPACING: u32 = 12;
