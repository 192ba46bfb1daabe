//! Job Lifecycle operations above the raw store (spec §4.6): creation,
//! keepalive, explicit destruction, and the expiry sweep loop.
//!
//! Grounded on the teacher's (`seanchatmangpt-knhk`) `AutonomicController`
//! tick-loop shape for the sweep; the state table itself is spec.md's.

use crate::error::{JobsError, Result};
use crate::settle::on_change_completed;
use chrono::Utc;
use spalloc_config::KeepaliveConfig;
use spalloc_epoch::{EpochDomain, EpochManager};
use spalloc_model::{ChangeKind, JobId, JobRequest, JobState, LinkInitFlags};
use spalloc_store::Store;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, instrument, warn};

#[derive(Clone)]
pub struct JobService {
    store: Store,
    epochs: EpochManager,
    config: KeepaliveConfig,
    running: Arc<AtomicBool>,
}

impl JobService {
    pub fn new(store: Store, epochs: EpochManager, config: KeepaliveConfig) -> Self {
        Self { store, epochs, config, running: Arc::new(AtomicBool::new(false)) }
    }

    #[instrument(skip(self, request))]
    pub async fn create_job(
        &self,
        owner: &str,
        request: JobRequest,
        machine_tags: Vec<String>,
        keepalive_interval_secs: u32,
        keepalive_host: Option<&str>,
    ) -> Result<JobId> {
        if keepalive_interval_secs < self.config.min_secs || keepalive_interval_secs > self.config.max_secs {
            return Err(JobsError::BadKeepalive(format!(
                "keepalive interval {keepalive_interval_secs}s outside [{}, {}]",
                self.config.min_secs, self.config.max_secs
            )));
        }
        let id = spalloc_store::job_repo::create_job(
            self.store.pool(),
            owner,
            &request,
            &machine_tags,
            keepalive_interval_secs,
            keepalive_host,
        )
        .await?;
        self.epochs.bump(EpochDomain::Job);
        info!(job_id = %id, owner, "job created");
        Ok(id)
    }

    /// Reject if the job is DESTROYED (spec §4.6 keepalive rule).
    pub async fn keepalive(&self, job_id: JobId, host: &str) -> Result<()> {
        spalloc_store::job_repo::set_job_keepalive(self.store.pool(), job_id, host, Utc::now()).await?;
        Ok(())
    }

    /// Explicit destroy (admission-initiated or expiry-driven), following
    /// the QUEUED/POWER/READY rows of the state table.
    #[instrument(skip(self))]
    pub async fn destroy_job(&self, job_id: JobId, reason: &str) -> Result<()> {
        let mut job = spalloc_store::job_repo::get_job(self.store.pool(), job_id).await?;
        let previous = job.state;
        job.transition(JobState::Destroyed)?;

        match previous {
            JobState::Queued => {
                spalloc_store::job_repo::delete_job_request(self.store.pool(), job_id).await?;
            }
            JobState::Power | JobState::Ready => {
                spalloc_store::job_repo::cancel_queued_changes_for_job(self.store.pool(), job_id).await?;
                let boards = spalloc_store::machine_repo::list_boards_by_job(self.store.pool(), job_id).await?;
                for board in &boards {
                    let kind = ChangeKind::Power { on: false, link_init: LinkInitFlags::all_disabled() };
                    spalloc_store::job_repo::insert_pending_change(self.store.pool(), job_id, board.id, &kind)
                        .await?;
                }
                let active = spalloc_store::job_repo::count_active_changes(self.store.pool(), job_id).await?;
                spalloc_store::job_repo::set_num_pending(self.store.pool(), job_id, active as i32).await?;
            }
            JobState::Destroyed => {}
        }

        spalloc_store::job_repo::destroy_job(self.store.pool(), job_id, reason, Utc::now()).await?;
        self.epochs.bump(EpochDomain::Job);
        info!(job_id = %job_id, reason, "job destroyed");

        // If destroying freed no boards (job had none allocated, e.g. still
        // QUEUED), settle immediately so a waiter on the job epoch doesn't
        // need a second event to see boards released.
        on_change_completed(&self.store, &self.epochs, job_id).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn start_expiry_sweep(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("expiry sweep already running");
            return;
        }
        let mut ticker = interval(Duration::from_secs(self.config.expiry_period_secs.max(1)));
        info!("job expiry sweep started");
        loop {
            ticker.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            if let Err(e) = self.sweep().await {
                error!("expiry sweep failed: {e}");
            }
        }
        info!("job expiry sweep stopped");
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    async fn sweep(&self) -> Result<()> {
        let expired = spalloc_store::job_repo::list_expired_jobs(self.store.pool()).await?;
        for job in expired {
            if let Err(e) = self.destroy_job(job.id, "keepalive expired").await {
                error!(job_id = %job.id, "failed to destroy expired job: {e}");
            }
        }
        Ok(())
    }
}
