//! The polymorphic job request (spec §9 REDESIGN FLAGS: "Polymorphic job
//! request... a tagged variant with a single dispatch in the allocator").

use crate::coord::{Physical, Triad};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardSelector {
    Triad(Triad),
    Physical(Physical),
    Ip(Ipv4Addr),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum JobRequest {
    /// Request by board count; `max_dead_boards` boards inside the chosen
    /// rectangle may be dead and still count toward the tolerance.
    NumBoards { n: u32, max_dead_boards: u32 },
    /// Request a specific rectangular footprint, in boards.
    Rectangle { width: u32, height: u32, max_dead_boards: u32 },
    /// Request one specific board; `max_dead_boards` is meaningless here
    /// and ignored by the allocator (§4.4 tie-breaks).
    Specific { selector: BoardSelector },
}

impl JobRequest {
    /// The configured priority-accrual rate category this request ages
    /// under (§4.4 step 1, `allocator.priority_scale.*`).
    pub fn priority_scale_key(&self) -> &'static str {
        match self {
            JobRequest::NumBoards { .. } => "size",
            JobRequest::Rectangle { .. } => "dimensions",
            JobRequest::Specific { .. } => "specific_board",
        }
    }

    pub fn max_dead_boards(&self) -> u32 {
        match self {
            JobRequest::NumBoards { max_dead_boards, .. } => *max_dead_boards,
            JobRequest::Rectangle { max_dead_boards, .. } => *max_dead_boards,
            JobRequest::Specific { .. } => 0,
        }
    }
}
