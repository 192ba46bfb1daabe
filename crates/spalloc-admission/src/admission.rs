//! The Admission API (spec §4.8): the one surface every external caller
//! goes through. Each operation is transactional end-to-end — it either
//! commits its catalogue writes and bumps the epochs they affect, or
//! leaves no trace.
//!
//! Grounded on the teacher's (`seanchatmangpt-knhk`) practice of putting a
//! thin, fully-`async_trait`-ed façade in front of its engines so the
//! binary and any transport adapter depend on one trait rather than the
//! engines' concrete types.

use crate::board_state;
use crate::error::Result;
use async_trait::async_trait;
use spalloc_epoch::{EpochDomain, EpochManager};
use spalloc_jobs::{describe_submachine, JobService, Submachine};
use spalloc_model::{Board, BoardSelector, Job, JobId, JobRequest, MachineId, MachineSummary};
use spalloc_store::Store;
use std::time::Duration;

#[async_trait]
pub trait Admission: Send + Sync {
    async fn list_machines(&self) -> Result<Vec<MachineSummary>>;

    async fn create_job(
        &self,
        owner: &str,
        request: JobRequest,
        machine_tags: Vec<String>,
        keepalive_interval_secs: u32,
        keepalive_host: Option<&str>,
    ) -> Result<JobId>;

    async fn describe_job(&self, job_id: JobId) -> Result<Job>;

    async fn describe_submachine(&self, job_id: JobId) -> Result<Submachine>;

    async fn keepalive(&self, job_id: JobId, host: &str) -> Result<()>;

    async fn destroy_job(&self, job_id: JobId, reason: &str) -> Result<()>;

    async fn set_board_state(&self, machine: MachineId, selector: BoardSelector, enabled: bool) -> Result<()>;

    async fn get_board_state(&self, machine: MachineId, selector: BoardSelector) -> Result<Board>;

    /// Block until `domain`'s epoch has advanced past `known_epoch`, or
    /// `timeout` elapses; returns the epoch observed either way.
    async fn wait_for(&self, domain: EpochDomain, known_epoch: u64, timeout: Duration) -> u64;
}

/// The concrete `Admission` wired to a live store, epoch manager and job
/// service. One instance is shared (cheaply cloned) across however many
/// transport adapters the binary exposes.
#[derive(Clone)]
pub struct CoreAdmission {
    store: Store,
    epochs: EpochManager,
    jobs: JobService,
}

impl CoreAdmission {
    pub fn new(store: Store, epochs: EpochManager, jobs: JobService) -> Self {
        Self { store, epochs, jobs }
    }
}

#[async_trait]
impl Admission for CoreAdmission {
    async fn list_machines(&self) -> Result<Vec<MachineSummary>> {
        Ok(spalloc_store::machine_repo::list_machines(self.store.pool()).await?)
    }

    async fn create_job(
        &self,
        owner: &str,
        request: JobRequest,
        machine_tags: Vec<String>,
        keepalive_interval_secs: u32,
        keepalive_host: Option<&str>,
    ) -> Result<JobId> {
        Ok(self.jobs.create_job(owner, request, machine_tags, keepalive_interval_secs, keepalive_host).await?)
    }

    async fn describe_job(&self, job_id: JobId) -> Result<Job> {
        Ok(spalloc_store::job_repo::get_job(self.store.pool(), job_id).await?)
    }

    async fn describe_submachine(&self, job_id: JobId) -> Result<Submachine> {
        Ok(describe_submachine(&self.store, job_id).await?)
    }

    async fn keepalive(&self, job_id: JobId, host: &str) -> Result<()> {
        Ok(self.jobs.keepalive(job_id, host).await?)
    }

    async fn destroy_job(&self, job_id: JobId, reason: &str) -> Result<()> {
        Ok(self.jobs.destroy_job(job_id, reason).await?)
    }

    async fn set_board_state(&self, machine: MachineId, selector: BoardSelector, enabled: bool) -> Result<()> {
        let board = board_state::resolve(&self.store, machine, selector).await?;
        spalloc_store::machine_repo::set_board_may_be_allocated(self.store.pool(), board.id, enabled).await?;
        self.epochs.bump(EpochDomain::Machine);
        Ok(())
    }

    async fn get_board_state(&self, machine: MachineId, selector: BoardSelector) -> Result<Board> {
        Ok(board_state::resolve(&self.store, machine, selector).await?)
    }

    async fn wait_for(&self, domain: EpochDomain, known_epoch: u64, timeout: Duration) -> u64 {
        self.epochs.wait_for(domain, known_epoch, timeout).await
    }
}
