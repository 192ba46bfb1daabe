//! Machine/BMP/Board/Link catalogue operations (spec §4.3).

use crate::error::{Result, StoreError};
use crate::rows::{BmpRow, BoardRow, LinkRow, MachineRow};
use spalloc_model::{
    Bmp, BmpId, Board, BoardId, CabinetFrame, ChipCoord, Direction, Link, Machine, MachineId,
    MachineSummary, Physical, PowerState, Triad,
};
use sqlx::PgPool;
use std::net::Ipv4Addr;

/// Whether an insert happened, or was recognised as already-done (spec §9:
/// "express as a typed result `{Inserted, Skipped(Reason)}`" rather than
/// catching a storage exception to mean "already done").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inserted<T> {
    Inserted(T),
    Skipped,
}

pub async fn insert_machine(
    executor: impl sqlx::PgExecutor<'_>,
    name: &str,
    width: u32,
    height: u32,
    depth: u8,
    max_chip: ChipCoord,
) -> Result<MachineId> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO machines (name, width, height, depth, max_chip_x, max_chip_y)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(name)
    .bind(width as i32)
    .bind(height as i32)
    .bind(depth as i16)
    .bind(max_chip.x as i32)
    .bind(max_chip.y as i32)
    .fetch_one(executor)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(format!("machine name already in use: {name}"))
        }
        _ => StoreError::Db(e),
    })?;
    Ok(row.0.into())
}

pub async fn insert_tag(executor: impl sqlx::PgExecutor<'_>, machine_id: MachineId, tag: &str) -> Result<()> {
    sqlx::query("INSERT INTO machine_tags (machine_id, tag) VALUES ($1, $2)")
        .bind(machine_id.0)
        .bind(tag)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn insert_bmp(
    executor: impl sqlx::PgExecutor<'_>,
    machine_id: MachineId,
    address: CabinetFrame,
    management_ip: Ipv4Addr,
) -> Result<BmpId> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO bmps (machine_id, cabinet, frame, management_ip)
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(machine_id.0)
    .bind(address.cabinet as i32)
    .bind(address.frame as i32)
    .bind(management_ip.to_string())
    .fetch_one(executor)
    .await?;
    Ok(row.0.into())
}

pub struct NewBoard {
    pub triad: Triad,
    pub physical: Physical,
    pub ip: Option<Ipv4Addr>,
    pub bmp_id: BmpId,
    pub may_be_allocated: bool,
}

pub async fn insert_board(
    executor: impl sqlx::PgExecutor<'_>,
    machine_id: MachineId,
    board: NewBoard,
) -> Result<BoardId> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO boards (machine_id, x, y, z, cabinet, frame, board_num, ip_address, bmp_id, may_be_allocated)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
    )
    .bind(machine_id.0)
    .bind(board.triad.x as i32)
    .bind(board.triad.y as i32)
    .bind(board.triad.z as i16)
    .bind(board.physical.cabinet as i32)
    .bind(board.physical.frame as i32)
    .bind(board.physical.board as i32)
    .bind(board.ip.map(|ip| ip.to_string()))
    .bind(board.bmp_id.0)
    .bind(board.may_be_allocated)
    .fetch_one(executor)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict("duplicate board coordinate".into())
        }
        _ => StoreError::Db(e),
    })?;
    Ok(row.0.into())
}

/// Insert a link, treating a unique-constraint violation on
/// `(from_board_id, direction)` as "the reciprocal already inserted this
/// pair" rather than a real error (spec §4.2's insert-order rule).
pub async fn insert_link(
    executor: impl sqlx::PgExecutor<'_>,
    machine_id: MachineId,
    from_board: BoardId,
    direction: Direction,
    to_board: BoardId,
    live: bool,
) -> Result<Inserted<()>> {
    let result = sqlx::query(
        "INSERT INTO links (machine_id, from_board_id, direction, to_board_id, live)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(machine_id.0)
    .bind(from_board.0)
    .bind(direction.canonical_name())
    .bind(to_board.0)
    .bind(live)
    .execute(executor)
    .await;

    match result {
        Ok(_) => Ok(Inserted::Inserted(())),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(Inserted::Skipped),
        Err(e) => Err(StoreError::Db(e)),
    }
}

pub async fn get_machine_by_name(pool: &PgPool, name: &str) -> Result<Machine> {
    let row: MachineRow = sqlx::query_as("SELECT * FROM machines WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("machine {name}")))?;
    let tags = fetch_tags(pool, row.id.into()).await?;
    Ok(row.into_model(tags))
}

pub async fn get_machine_by_id(pool: &PgPool, id: MachineId) -> Result<Machine> {
    let row: MachineRow = sqlx::query_as("SELECT * FROM machines WHERE id = $1")
        .bind(id.0)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("machine {id}")))?;
    let tags = fetch_tags(pool, id).await?;
    Ok(row.into_model(tags))
}

async fn fetch_tags(pool: &PgPool, machine_id: MachineId) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT tag FROM machine_tags WHERE machine_id = $1")
        .bind(machine_id.0)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(t,)| t).collect())
}

pub async fn list_machines(pool: &PgPool) -> Result<Vec<MachineSummary>> {
    let rows: Vec<MachineRow> = sqlx::query_as("SELECT * FROM machines ORDER BY name").fetch_all(pool).await?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let machine_id: MachineId = row.id.into();
        let tags = fetch_tags(pool, machine_id).await?;
        let (num_boards, num_in_use, num_dead): (i64, i64, i64) = sqlx::query_as(
            "SELECT count(*),
                    count(*) FILTER (WHERE allocated_job_id IS NOT NULL),
                    count(*) FILTER (WHERE NOT may_be_allocated OR ip_address IS NULL)
             FROM boards WHERE machine_id = $1",
        )
        .bind(machine_id.0)
        .fetch_one(pool)
        .await?;
        let m = row.into_model(tags);
        out.push(MachineSummary {
            id: m.id,
            name: m.name,
            width: m.width,
            height: m.height,
            depth: m.depth,
            tags: m.tags,
            in_service: m.in_service,
            num_boards: num_boards as u32,
            num_in_use: num_in_use as u32,
            num_dead: num_dead as u32,
        });
    }
    Ok(out)
}

/// List every board of a machine in allocation-preference order: lowest
/// y, then lowest x, then lowest z (spec §4.4's anchor tie-break, reused
/// here as the general "preference order" spec §4.3 asks the store for).
pub async fn list_boards_ordered(pool: &PgPool, machine_id: MachineId) -> Result<Vec<Board>> {
    let rows: Vec<BoardRow> = sqlx::query_as(
        "SELECT * FROM boards WHERE machine_id = $1 ORDER BY y, x, z",
    )
    .bind(machine_id.0)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(|r| r.into_model()).collect()
}

pub async fn get_board_by_triad(pool: &PgPool, machine_id: MachineId, triad: Triad) -> Result<Option<Board>> {
    let row: Option<BoardRow> = sqlx::query_as(
        "SELECT * FROM boards WHERE machine_id = $1 AND x = $2 AND y = $3 AND z = $4",
    )
    .bind(machine_id.0)
    .bind(triad.x as i32)
    .bind(triad.y as i32)
    .bind(triad.z as i16)
    .fetch_optional(pool)
    .await?;
    row.map(|r| r.into_model()).transpose()
}

pub async fn get_board_by_physical(pool: &PgPool, machine_id: MachineId, physical: Physical) -> Result<Option<Board>> {
    let row: Option<BoardRow> = sqlx::query_as(
        "SELECT * FROM boards WHERE machine_id = $1 AND cabinet = $2 AND frame = $3 AND board_num = $4",
    )
    .bind(machine_id.0)
    .bind(physical.cabinet as i32)
    .bind(physical.frame as i32)
    .bind(physical.board as i32)
    .fetch_optional(pool)
    .await?;
    row.map(|r| r.into_model()).transpose()
}

pub async fn get_board_by_ip(pool: &PgPool, ip: Ipv4Addr) -> Result<Option<Board>> {
    let row: Option<BoardRow> = sqlx::query_as("SELECT * FROM boards WHERE ip_address = $1")
        .bind(ip.to_string())
        .fetch_optional(pool)
        .await?;
    row.map(|r| r.into_model()).transpose()
}

pub async fn get_board(pool: &PgPool, id: BoardId) -> Result<Board> {
    let row: BoardRow = sqlx::query_as("SELECT * FROM boards WHERE id = $1")
        .bind(id.0)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("board {id}")))?;
    row.into_model()
}

/// Every board served by one BMP (spec §3: "BMP... serves all boards with
/// matching (c,f)"), used by the BMP Controller to discover its claim set.
pub async fn list_boards_by_bmp(pool: &PgPool, bmp_id: BmpId) -> Result<Vec<Board>> {
    let rows: Vec<BoardRow> = sqlx::query_as("SELECT * FROM boards WHERE bmp_id = $1")
        .bind(bmp_id.0)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(|r| r.into_model()).collect()
}

pub async fn list_boards_by_job(pool: &PgPool, job_id: spalloc_model::JobId) -> Result<Vec<Board>> {
    let rows: Vec<BoardRow> = sqlx::query_as("SELECT * FROM boards WHERE allocated_job_id = $1")
        .bind(job_id.0)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(|r| r.into_model()).collect()
}

/// Clear every board still marked allocated to `job_id` (spec §4.6: "release
/// boards after power-off settles").
pub async fn release_boards_for_job(
    executor: impl sqlx::PgExecutor<'_>,
    job_id: spalloc_model::JobId,
) -> Result<u64> {
    let result = sqlx::query("UPDATE boards SET allocated_job_id = NULL WHERE allocated_job_id = $1")
        .bind(job_id.0)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn list_bmps(pool: &PgPool, machine_id: MachineId) -> Result<Vec<Bmp>> {
    let rows: Vec<BmpRow> = sqlx::query_as("SELECT * FROM bmps WHERE machine_id = $1")
        .bind(machine_id.0)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(|r| r.into_model()).collect()
}

pub async fn list_all_bmps(pool: &PgPool) -> Result<Vec<Bmp>> {
    let rows: Vec<BmpRow> = sqlx::query_as("SELECT * FROM bmps").fetch_all(pool).await?;
    rows.into_iter().map(|r| r.into_model()).collect()
}

pub async fn list_links(pool: &PgPool, machine_id: MachineId) -> Result<Vec<Link>> {
    let rows: Vec<LinkRow> = sqlx::query_as("SELECT * FROM links WHERE machine_id = $1")
        .bind(machine_id.0)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(|r| r.into_model()).collect()
}

pub async fn set_board_allocated_job(
    executor: impl sqlx::PgExecutor<'_>,
    board_id: BoardId,
    job_id: Option<spalloc_model::JobId>,
) -> Result<()> {
    sqlx::query("UPDATE boards SET allocated_job_id = $1 WHERE id = $2")
        .bind(job_id.map(|j| j.0))
        .bind(board_id.0)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn set_board_may_be_allocated(pool: &PgPool, board_id: BoardId, enabled: bool) -> Result<()> {
    sqlx::query("UPDATE boards SET may_be_allocated = $1 WHERE id = $2")
        .bind(enabled)
        .bind(board_id.0)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_board_power_state(
    executor: impl sqlx::PgExecutor<'_>,
    board_id: BoardId,
    state: PowerState,
    at: chrono::DateTime<chrono::Utc>,
) -> Result<()> {
    match state {
        PowerState::On => {
            sqlx::query("UPDATE boards SET power_state = 'on', power_on_time = $1 WHERE id = $2")
                .bind(at)
                .bind(board_id.0)
                .execute(executor)
                .await?;
        }
        PowerState::Off => {
            sqlx::query("UPDATE boards SET power_state = 'off', power_off_time = $1 WHERE id = $2")
                .bind(at)
                .bind(board_id.0)
                .execute(executor)
                .await?;
        }
    }
    Ok(())
}
