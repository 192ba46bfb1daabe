//! The machine description document (spec §6 "Machine description format"):
//! serde types mirroring the wire shape, accepting both the bracketed
//! coordinate strings and structured forms.

use serde::{Deserialize, Serialize};
use spalloc_model::{CabinetFrame, Physical, Triad};
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachinesDocument {
    pub machines: Vec<MachineDescription>,
    /// Service settings ignored by the core (§1 out-of-scope layers own
    /// these): port, ip, timeout_check_interval, max_retired_jobs,
    /// seconds_before_free.
    #[serde(flatten)]
    pub ignored: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineDescription {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub dead_boards: BTreeSet<Triad>,
    #[serde(default)]
    pub dead_links: BTreeMap<Triad, BTreeSet<String>>,
    pub board_locations: BTreeMap<Triad, Physical>,
    pub bmp_ips: BTreeMap<CabinetFrame, Ipv4Addr>,
    pub spinnaker_ips: BTreeMap<Triad, Ipv4Addr>,
}

impl MachineDescription {
    /// Depth is 1 iff this machine has exactly one board (a single-board
    /// development setup), else the full 3 (spec §4.2).
    pub fn depth(&self) -> u8 {
        if self.board_locations.len() == 1 {
            1
        } else {
            3
        }
    }

    pub fn is_live(&self, triad: Triad) -> bool {
        self.board_locations.contains_key(&triad) && !self.dead_boards.contains(&triad)
    }
}
