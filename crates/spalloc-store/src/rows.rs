//! `sqlx::FromRow` row types and their conversions to/from `spalloc_model`
//! entities. Kept deliberately separate from the domain types (spec §9:
//! "Per-row option fields... tagged-union / optional value types at the
//! model layer; the storage schema remains nullable").

use crate::error::{Result, StoreError};
use chrono::{DateTime, Utc};
use spalloc_model::{
    Bmp, Board, CabinetFrame, ChangeKind, ChangeStatus, Direction, Job, JobRequest, JobState,
    Link, LinkInitFlags, Machine, PendingChange, Physical, PowerState, Triad,
};
use std::net::Ipv4Addr;
use std::str::FromStr;

#[derive(Debug, sqlx::FromRow)]
pub struct MachineRow {
    pub id: i64,
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub depth: i16,
    pub in_service: bool,
    pub max_chip_x: i32,
    pub max_chip_y: i32,
}

impl MachineRow {
    pub fn into_model(self, tags: Vec<String>) -> Machine {
        Machine {
            id: self.id.into(),
            name: self.name,
            width: self.width as u32,
            height: self.height as u32,
            depth: self.depth as u8,
            tags,
            in_service: self.in_service,
            max_chip: spalloc_model::ChipCoord { x: self.max_chip_x as u32, y: self.max_chip_y as u32 },
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct BmpRow {
    pub id: i64,
    pub machine_id: i64,
    pub cabinet: i32,
    pub frame: i32,
    pub management_ip: String,
}

impl BmpRow {
    pub fn into_model(self) -> Result<Bmp> {
        Ok(Bmp {
            id: self.id.into(),
            machine_id: self.machine_id.into(),
            address: CabinetFrame { cabinet: self.cabinet as u32, frame: self.frame as u32 },
            management_ip: parse_ip(&self.management_ip)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct BoardRow {
    pub id: i64,
    pub machine_id: i64,
    pub x: i32,
    pub y: i32,
    pub z: i16,
    pub cabinet: i32,
    pub frame: i32,
    pub board_num: i32,
    pub ip_address: Option<String>,
    pub bmp_id: i64,
    pub may_be_allocated: bool,
    pub allocated_job_id: Option<i64>,
    pub power_state: String,
    pub power_on_time: Option<DateTime<Utc>>,
    pub power_off_time: Option<DateTime<Utc>>,
    pub bmp_serial: Option<String>,
    pub physical_serial: Option<String>,
}

impl BoardRow {
    pub fn into_model(self) -> Result<Board> {
        let ip = self.ip_address.as_deref().map(parse_ip).transpose()?;
        Ok(Board {
            id: self.id.into(),
            machine_id: self.machine_id.into(),
            triad: Triad { x: self.x as u32, y: self.y as u32, z: self.z as u8 },
            physical: Physical {
                cabinet: self.cabinet as u32,
                frame: self.frame as u32,
                board: self.board_num as u32,
            },
            ip,
            bmp_id: self.bmp_id.into(),
            may_be_allocated: self.may_be_allocated,
            allocated_job: self.allocated_job_id.map(Into::into),
            power_state: if self.power_state == "on" { PowerState::On } else { PowerState::Off },
            power_on_time: self.power_on_time,
            power_off_time: self.power_off_time,
            bmp_serial: self.bmp_serial,
            physical_serial: self.physical_serial,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct LinkRow {
    pub id: i64,
    pub machine_id: i64,
    pub from_board_id: i64,
    pub direction: String,
    pub to_board_id: i64,
    pub live: bool,
}

impl LinkRow {
    pub fn into_model(self) -> Result<Link> {
        let direction = Direction::from_str(&self.direction)
            .map_err(|e| StoreError::Conflict(format!("bad stored direction: {e}")))?;
        Ok(Link {
            id: self.id.into(),
            machine_id: self.machine_id.into(),
            from_board: self.from_board_id.into(),
            direction,
            to_board: self.to_board_id.into(),
            live: self.live,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct JobRow {
    pub id: i64,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub keepalive_interval_secs: i32,
    pub keepalive_timestamp: DateTime<Utc>,
    pub keepalive_host: Option<String>,
    pub state: String,
    pub request: serde_json::Value,
    pub machine_tags: serde_json::Value,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub root_board_id: Option<i64>,
    pub num_pending: i32,
    pub death_reason: Option<String>,
    pub death_time: Option<DateTime<Utc>>,
}

impl JobRow {
    pub fn into_model(self) -> Result<Job> {
        let state = match self.state.as_str() {
            "queued" => JobState::Queued,
            "power" => JobState::Power,
            "ready" => JobState::Ready,
            "destroyed" => JobState::Destroyed,
            other => return Err(StoreError::Conflict(format!("bad stored job state: {other}"))),
        };
        let request: JobRequest = serde_json::from_value(self.request)
            .map_err(|e| StoreError::Conflict(format!("bad stored job request: {e}")))?;
        let machine_tags: Vec<String> = serde_json::from_value(self.machine_tags)
            .map_err(|e| StoreError::Conflict(format!("bad stored machine tags: {e}")))?;
        Ok(Job {
            id: self.id.into(),
            owner: self.owner,
            created_at: self.created_at,
            keepalive_interval_secs: self.keepalive_interval_secs as u32,
            keepalive_timestamp: self.keepalive_timestamp,
            keepalive_host: self.keepalive_host,
            state,
            request,
            machine_tags,
            width: self.width.map(|v| v as u32),
            height: self.height.map(|v| v as u32),
            root_board_id: self.root_board_id.map(Into::into),
            num_pending: self.num_pending,
            death_reason: self.death_reason,
            death_time: self.death_time,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PendingChangeRow {
    pub id: i64,
    pub job_id: i64,
    pub board_id: i64,
    pub kind: serde_json::Value,
    pub status: String,
    pub error: Option<String>,
}

impl PendingChangeRow {
    pub fn into_model(self) -> Result<PendingChange> {
        let kind: ChangeKind = serde_json::from_value(self.kind)
            .map_err(|e| StoreError::Conflict(format!("bad stored change kind: {e}")))?;
        let status = match self.status.as_str() {
            "queued" => ChangeStatus::Queued,
            "in_flight" => ChangeStatus::InFlight,
            "done" => ChangeStatus::Done,
            "failed" => ChangeStatus::Failed(self.error.unwrap_or_default()),
            other => return Err(StoreError::Conflict(format!("bad stored change status: {other}"))),
        };
        Ok(PendingChange {
            id: self.id.into(),
            job_id: self.job_id.into(),
            board_id: self.board_id.into(),
            kind,
            status,
        })
    }
}

fn parse_ip(s: &str) -> Result<Ipv4Addr> {
    Ipv4Addr::from_str(s).map_err(|e| StoreError::Conflict(format!("bad stored ip {s}: {e}")))
}

pub fn job_state_str(state: JobState) -> &'static str {
    match state {
        JobState::Queued => "queued",
        JobState::Power => "power",
        JobState::Ready => "ready",
        JobState::Destroyed => "destroyed",
    }
}

pub fn change_status_str(status: &ChangeStatus) -> &'static str {
    match status {
        ChangeStatus::Queued => "queued",
        ChangeStatus::InFlight => "in_flight",
        ChangeStatus::Done => "done",
        ChangeStatus::Failed(_) => "failed",
    }
}
