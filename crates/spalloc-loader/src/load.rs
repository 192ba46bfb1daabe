//! Insert a validated [`MachineDescription`] into the catalogue store
//! (spec §4.2's insert order, all in one transaction per machine).

use crate::description::MachineDescription;
use crate::error::{LoaderError, Result};
use crate::validate::validate;
use spalloc_model::{CabinetFrame, ChipCoord, Direction, Triad};
use spalloc_store::machine_repo::{self, Inserted, NewBoard};
use spalloc_topology::{is_link_dead, mv, BoardLiveness, S};
use sqlx::PgPool;
use std::collections::BTreeMap;
use tracing::info;

impl BoardLiveness for MachineDescription {
    fn is_board_dead(&self, triad: Triad) -> bool {
        !self.is_live(triad)
    }

    fn has_marked_dead_link(&self, triad: Triad, direction: Direction) -> bool {
        self.dead_links
            .get(&triad)
            .map(|set| set.contains(direction.canonical_name()))
            .unwrap_or(false)
    }
}

#[tracing::instrument(skip(pool, desc), fields(machine = %desc.name))]
pub async fn load_machine(pool: &PgPool, desc: &MachineDescription) -> Result<spalloc_model::MachineId> {
    validate(desc)?;

    let mut tx = pool.begin().await.map_err(spalloc_store::StoreError::Db)?;

    let max_chip = max_chip_coord(desc);
    let machine_id = machine_repo::insert_machine(
        &mut *tx,
        &desc.name,
        desc.width,
        desc.height,
        desc.depth(),
        max_chip,
    )
    .await?;

    for tag in &desc.tags {
        machine_repo::insert_tag(&mut *tx, machine_id, tag).await?;
    }

    let mut bmp_ids = BTreeMap::new();
    for (&cf, &ip) in &desc.bmp_ips {
        let bmp_id = machine_repo::insert_bmp(&mut *tx, machine_id, cf, ip).await?;
        bmp_ids.insert(cf, bmp_id);
    }

    // Live boards first (with address, IP, physical, BMP), then dead
    // boards last (null IP/physical-b, borrowing triad(0,0,0)'s BMP as a
    // placeholder — spec §4.2).
    let placeholder_cf = desc
        .board_locations
        .get(&Triad::new(0, 0, 0).map_err(|e| LoaderError::Parse(e.to_string()))?)
        .map(|p| CabinetFrame { cabinet: p.cabinet, frame: p.frame });

    let mut board_ids = BTreeMap::new();

    for (&triad, &physical) in &desc.board_locations {
        if !desc.is_live(triad) {
            continue;
        }
        let cf = CabinetFrame { cabinet: physical.cabinet, frame: physical.frame };
        let bmp_id = *bmp_ids.get(&cf).ok_or(LoaderError::MissingBmpIp(physical))?;
        let ip = desc.spinnaker_ips.get(&triad).copied();
        let board = NewBoard { triad, physical, ip, bmp_id, may_be_allocated: true };
        let board_id = machine_repo::insert_board(&mut *tx, machine_id, board).await?;
        board_ids.insert(triad, board_id);
    }

    for (&triad, &physical) in &desc.board_locations {
        if desc.is_live(triad) {
            continue;
        }
        let bmp_id = placeholder_cf.and_then(|cf| bmp_ids.get(&cf).copied()).ok_or_else(|| {
            LoaderError::Parse("no placeholder BMP available for dead board".into())
        })?;
        let board = NewBoard { triad, physical, ip: None, bmp_id, may_be_allocated: false };
        let board_id = machine_repo::insert_board(&mut *tx, machine_id, board).await?;
        board_ids.insert(triad, board_id);
    }

    // Iterate all (board, direction) pairs; the reciprocal of each pair
    // arrives as an `Inserted::Skipped` rather than a real error (spec
    // §4.2's insert-order rule, §9's typed insert-conflict result).
    for &triad in desc.board_locations.keys() {
        let Some(&from_id) = board_ids.get(&triad) else { continue };
        for direction in Direction::ALL {
            let neighbour = mv(triad, direction, desc.width, desc.height);
            let Some(&to_id) = board_ids.get(&neighbour) else { continue };
            let live = !is_link_dead(desc, triad, direction, desc.width, desc.height);
            match machine_repo::insert_link(&mut *tx, machine_id, from_id, direction, to_id, live).await? {
                Inserted::Inserted(()) | Inserted::Skipped => {}
            }
        }
    }

    tx.commit().await.map_err(spalloc_store::StoreError::Db)?;
    info!(boards = board_ids.len(), "machine loaded");
    Ok(machine_id)
}

/// (maxX*S + S-1, maxY*S + S-1) over the machine's actual board
/// locations, not its nominal width/height (spec §4.2).
fn max_chip_coord(desc: &MachineDescription) -> ChipCoord {
    let max_x = desc.board_locations.keys().map(|t| t.x).max().unwrap_or(0);
    let max_y = desc.board_locations.keys().map(|t| t.y).max().unwrap_or(0);
    ChipCoord { x: max_x * S + S - 1, y: max_y * S + S - 1 }
}
