//! Submachine projection (spec §4.6): what a READY job's owner is told
//! about the boards it holds.

use crate::error::{JobsError, Result};
use spalloc_model::{ChipCoord, Direction, JobId, JobState, Physical, Triad};
use spalloc_store::Store;
use std::net::Ipv4Addr;

/// The standard SCP/UDP command port every SpiNNaker board listens on.
pub const SCP_PORT: u16 = 17893;

#[derive(Debug, Clone)]
pub struct AllocatedBoard {
    pub triad: Triad,
    pub physical: Physical,
}

#[derive(Debug, Clone)]
pub struct Connection {
    pub chip: ChipCoord,
    pub ip: Ipv4Addr,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct Submachine {
    pub width: u32,
    pub height: u32,
    pub depth: u8,
    pub boards: Vec<AllocatedBoard>,
    pub connections: Vec<Connection>,
}

/// spec §4.6: "width, height, depth (from machine), the list of allocated
/// boards with their triad+physical coordinates, and the list of
/// (board, IP, port) connection triples for the four root-adjacent chips
/// derived from the allocated root board."
pub async fn describe_submachine(store: &Store, job_id: JobId) -> Result<Submachine> {
    let job = spalloc_store::job_repo::get_job(store.pool(), job_id).await?;
    if job.state != JobState::Power && job.state != JobState::Ready {
        return Err(JobsError::Model(spalloc_model::SpallocError::conflict(format!(
            "job {job_id} has no submachine (state {:?})",
            job.state
        ))));
    }
    let root_board_id = job
        .root_board_id
        .ok_or_else(|| JobsError::Model(spalloc_model::SpallocError::internal("allocated job missing root board")))?;

    let boards = spalloc_store::machine_repo::list_boards_by_job(store.pool(), job_id).await?;
    let root = boards
        .iter()
        .find(|b| b.id == root_board_id)
        .ok_or_else(|| JobsError::Model(spalloc_model::SpallocError::internal("root board not among allocated boards")))?;
    let machine = spalloc_store::machine_repo::get_machine_by_id(store.pool(), root.machine_id).await?;
    let root_ip = root
        .ip
        .ok_or_else(|| JobsError::Model(spalloc_model::SpallocError::internal("root board has no IP")))?;

    let root_chip = spalloc_topology::root_chip(root.triad)?;
    let connections = root_adjacent_connections(root_chip, root_ip, machine.width * spalloc_topology::S, machine.height * spalloc_topology::S);

    Ok(Submachine {
        width: job.width.unwrap_or(0),
        height: job.height.unwrap_or(0),
        depth: machine.depth,
        boards: boards.iter().map(|b| AllocatedBoard { triad: b.triad, physical: b.physical }).collect(),
        connections,
    })
}

/// The root chip plus its four cardinal (N/S/E/W) neighbours, all reached
/// through the root board's single Ethernet connection.
fn root_adjacent_connections(root: ChipCoord, ip: Ipv4Addr, chip_width: u32, chip_height: u32) -> Vec<Connection> {
    [Direction::North, Direction::South, Direction::East, Direction::West]
        .into_iter()
        .map(|d| Connection { chip: step_chip(root, d, chip_width, chip_height), ip, port: SCP_PORT })
        .collect()
}

fn step_chip(chip: ChipCoord, direction: Direction, width: u32, height: u32) -> ChipCoord {
    let (dx, dy): (i64, i64) = match direction {
        Direction::North => (0, 1),
        Direction::South => (0, -1),
        Direction::East => (1, 0),
        Direction::West => (-1, 0),
        Direction::NorthEast | Direction::SouthWest => (0, 0),
    };
    ChipCoord {
        x: (chip.x as i64 + dx).rem_euclid(width as i64) as u32,
        y: (chip.y as i64 + dy).rem_euclid(height as i64) as u32,
    }
}
