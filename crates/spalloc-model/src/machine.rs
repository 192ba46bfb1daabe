//! Machine, Board, Link and BMP entities (spec §3).

use crate::coord::{CabinetFrame, ChipCoord, Physical, Triad};
use crate::direction::Direction;
use crate::ids::{BmpId, BoardId, JobId, LinkId, MachineId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    pub id: MachineId,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub depth: u8,
    pub tags: Vec<String>,
    pub in_service: bool,
    /// Highest chip coordinate reachable on this machine, as stored by the
    /// loader: (maxX*S + S-1, maxY*S + S-1).
    pub max_chip: ChipCoord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerState {
    Off,
    On,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub machine_id: MachineId,
    pub triad: Triad,
    pub physical: Physical,
    pub ip: Option<Ipv4Addr>,
    pub bmp_id: BmpId,
    pub may_be_allocated: bool,
    pub allocated_job: Option<JobId>,
    pub power_state: PowerState,
    pub power_on_time: Option<DateTime<Utc>>,
    pub power_off_time: Option<DateTime<Utc>>,
    pub bmp_serial: Option<String>,
    pub physical_serial: Option<String>,
}

impl Board {
    /// A board excluded from allocation and link traversal: disabled by an
    /// operator, or never given an IP/physical-b by the loader because the
    /// machine description marked its triad dead.
    pub fn is_dead(&self) -> bool {
        !self.may_be_allocated || self.ip.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub machine_id: MachineId,
    pub from_board: BoardId,
    pub direction: Direction,
    pub to_board: BoardId,
    /// Dead if either endpoint is dead or the machine description marked
    /// the link dead at either end (§4.2).
    pub live: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bmp {
    pub id: BmpId,
    pub machine_id: MachineId,
    pub address: CabinetFrame,
    pub management_ip: Ipv4Addr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineSummary {
    pub id: MachineId,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub depth: u8,
    pub tags: Vec<String>,
    pub in_service: bool,
    pub num_boards: u32,
    pub num_in_use: u32,
    pub num_dead: u32,
}
