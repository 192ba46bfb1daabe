//! Job entity and its state machine (spec §3, §4.6).

use crate::error::SpallocError;
use crate::ids::{BoardId, JobId};
use crate::request::JobRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Queued,
    Power,
    Ready,
    Destroyed,
}

impl JobState {
    /// Whether `to` is a legal successor of `self`. Mirrors the table in
    /// spec §4.6: transitions are monotonic along
    /// QUEUED -> POWER -> READY -> DESTROYED, and DESTROYED is terminal.
    pub fn can_transition_to(self, to: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, to),
            (Queued, Power)
                | (Queued, Destroyed)
                | (Power, Ready)
                | (Power, Destroyed)
                | (Ready, Destroyed)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub keepalive_interval_secs: u32,
    pub keepalive_timestamp: DateTime<Utc>,
    pub keepalive_host: Option<String>,
    pub state: JobState,
    pub request: JobRequest,
    /// Tag constraints on the target machine, empty meaning "any".
    pub machine_tags: Vec<String>,
    /// Set once allocation succeeds; width/height are in chips.
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub root_board_id: Option<BoardId>,
    /// Outstanding power-change count; the Change Observer decrements this
    /// and drives POWER -> READY / DESTROYED when it reaches zero.
    pub num_pending: i32,
    pub death_reason: Option<String>,
    pub death_time: Option<DateTime<Utc>>,
}

impl Job {
    /// Apply a state transition, rejecting illegal ones (the "destroy is
    /// terminal" law from spec §8).
    pub fn transition(&mut self, to: JobState) -> Result<(), SpallocError> {
        if !self.state.can_transition_to(to) {
            return Err(SpallocError::conflict(format!(
                "illegal job transition {:?} -> {:?} for job {}",
                self.state, to, self.id
            )));
        }
        self.state = to;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.state == JobState::Destroyed
    }
}
