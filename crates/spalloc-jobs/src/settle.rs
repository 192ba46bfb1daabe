//! The Change Observer's job-transition side (spec §4.6, §4.7): decides
//! what a job's state should become once its outstanding pending changes
//! reach zero, and releases boards once a destroyed job's power-off
//! changes have settled.

use crate::error::Result;
use chrono::Utc;
use spalloc_epoch::{EpochDomain, EpochManager};
use spalloc_model::{ChangeKind, JobId, JobState, LinkInitFlags};
use spalloc_store::Store;
use tracing::{info, instrument};

/// Call once per pending-change completion (success or failure), after the
/// change's own status row has been written and `num_pending` decremented.
///
/// - POWER, `num_pending == 0`, no failures -> READY.
/// - POWER, `num_pending == 0`, any failure -> DESTROYED, power-off queued
///   for every board still allocated to the job.
/// - DESTROYED, `num_pending == 0` -> release any boards still allocated
///   (the "release boards after power-off settles" step).
#[instrument(skip(store, epochs))]
pub async fn on_change_completed(store: &Store, epochs: &EpochManager, job_id: JobId) -> Result<()> {
    let job = spalloc_store::job_repo::get_job(store.pool(), job_id).await?;
    if job.num_pending > 0 {
        return Ok(());
    }

    match job.state {
        JobState::Power => {
            if spalloc_store::job_repo::has_failed_changes(store.pool(), job_id).await? {
                destroy_after_failure(store, epochs, job_id).await?;
            } else {
                spalloc_store::job_repo::set_job_state(store.pool(), job_id, JobState::Ready).await?;
                epochs.bump(EpochDomain::Job);
                info!(job_id = %job_id, "job ready");
            }
        }
        JobState::Destroyed => {
            let released = spalloc_store::machine_repo::release_boards_for_job(store.pool(), job_id).await?;
            if released > 0 {
                epochs.bump(EpochDomain::Machine);
                info!(job_id = %job_id, released, "boards released after power-off settled");
            }
        }
        JobState::Queued | JobState::Ready => {}
    }
    Ok(())
}

async fn destroy_after_failure(store: &Store, epochs: &EpochManager, job_id: JobId) -> Result<()> {
    let boards = spalloc_store::machine_repo::list_boards_by_job(store.pool(), job_id).await?;
    let mut queued = 0i32;
    for board in &boards {
        let kind = ChangeKind::Power { on: false, link_init: LinkInitFlags::all_disabled() };
        spalloc_store::job_repo::insert_pending_change(store.pool(), job_id, board.id, &kind).await?;
        queued += 1;
    }
    spalloc_store::job_repo::set_num_pending(store.pool(), job_id, queued).await?;
    spalloc_store::job_repo::destroy_job(store.pool(), job_id, "allocation failed", Utc::now()).await?;
    epochs.bump(EpochDomain::Job);
    info!(job_id = %job_id, queued, "job destroyed after a failed pending change, power-off queued");
    Ok(())
}
