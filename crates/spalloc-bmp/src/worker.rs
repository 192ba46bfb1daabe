//! One worker per BMP (spec §4.5): polls its boards' queued changes,
//! claims them, and drives them to completion strictly serially so that a
//! single physical BMP never sees two concurrent commands.
//!
//! Grounded on the teacher's (`seanchatmangpt-knhk`) `AutonomicController`
//! tick-loop shape, reused here per-BMP instead of globally: an
//! `Arc<AtomicBool>` running flag, a `tokio::time::interval` ticker, one
//! `#[instrument]`-decorated cycle that logs and continues past a single
//! change's failure rather than aborting the worker.

use crate::error::{BmpError, Result};
use crate::transceiver::Transceiver;
use chrono::Utc;
use spalloc_config::TransceiverConfig;
use spalloc_epoch::{EpochDomain, EpochManager};
use spalloc_model::{Bmp, Board, BoardId, ChangeKind, ChangeStatus, JobId, PendingChange, Physical, PowerState};
use spalloc_store::Store;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};

pub struct BmpWorker {
    bmp: Bmp,
    store: Store,
    epochs: EpochManager,
    config: TransceiverConfig,
    transceiver: Arc<dyn Transceiver>,
    running: Arc<AtomicBool>,
}

impl BmpWorker {
    pub fn new(
        bmp: Bmp,
        store: Store,
        epochs: EpochManager,
        config: TransceiverConfig,
        transceiver: Arc<dyn Transceiver>,
    ) -> Self {
        Self { bmp, store, epochs, config, transceiver, running: Arc::new(AtomicBool::new(false)) }
    }

    #[instrument(skip(self), fields(bmp = %self.bmp.address))]
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("bmp worker already running");
            return;
        }
        let mut ticker = interval(Duration::from_secs(self.config.probe_interval_secs.max(1)));
        info!(address = %self.bmp.address, "bmp worker started");
        loop {
            ticker.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            if let Err(e) = self.cycle().await {
                error!("bmp cycle failed: {e}");
            }
        }
        info!(address = %self.bmp.address, "bmp worker stopped");
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// spec §4.5 step 1-2: claim every queued change for this BMP's
    /// boards, then dispatch by kind.
    #[instrument(skip(self))]
    async fn cycle(&self) -> Result<()> {
        let boards = spalloc_store::machine_repo::list_boards_by_bmp(self.store.pool(), self.bmp.id).await?;
        if boards.is_empty() {
            return Ok(());
        }
        let board_ids: Vec<BoardId> = boards.iter().map(|b| b.id).collect();
        let by_id: HashMap<BoardId, &Board> = boards.iter().map(|b| (b.id, b)).collect();

        let claims = spalloc_store::job_repo::claim_pending_changes(self.store.pool(), &board_ids).await?;
        if claims.is_empty() {
            return Ok(());
        }
        debug!(claimed = claims.len(), "bmp claimed pending changes");

        // A `Vec` of groups in first-seen order, not a `HashMap`: `claims`
        // arrives FIFO by pending-change id (spec §4.5's "Ordering: FIFO by
        // pending-change id within a BMP"), and a hash map's iteration
        // order would scramble that across groups when dispatching below.
        let mut power_groups: Vec<((JobId, bool), Vec<(PendingChange, Board)>)> = Vec::new();
        let mut others = Vec::new();
        for change in claims {
            let Some(&board) = by_id.get(&change.board_id) else {
                warn!(change_id = %change.id, "claimed change for unknown board, skipping");
                continue;
            };
            match change.kind {
                ChangeKind::Power { on, .. } => {
                    let key = (change.job_id, on);
                    match power_groups.iter_mut().find(|(k, _)| *k == key) {
                        Some((_, group)) => group.push((change, (*board).clone())),
                        None => power_groups.push((key, vec![(change, (*board).clone())])),
                    }
                }
                ChangeKind::BlacklistRead | ChangeKind::BlacklistWrite => others.push(change),
            }
        }

        for ((job_id, on), group) in power_groups {
            if let Err(e) = self.dispatch_power(job_id, on, group).await {
                error!(job_id = %job_id, "power dispatch failed: {e}");
            }
        }
        for change in others {
            if let Err(e) = self.dispatch_blacklist(change).await {
                error!("blacklist dispatch failed: {e}");
            }
        }
        Ok(())
    }

    /// One job's worth of boards turning on or off together (spec §4.5
    /// step 3: batched per job so a job's boards power up as one unit).
    async fn dispatch_power(&self, job_id: JobId, on: bool, group: Vec<(PendingChange, Board)>) -> Result<()> {
        let physicals: Vec<Physical> = group.iter().map(|(_, b)| b.physical).collect();

        match retry(self.config.power_attempts, || self.transceiver.set_power(&physicals, on)).await {
            Ok(()) => {}
            Err(e) => {
                self.fail_group(&group, &format!("power {on}: {e}")).await?;
                return Ok(());
            }
        }

        let mut num_done = 0u32;
        for (change, board) in group {
            if on {
                let link_init = match &change.kind {
                    ChangeKind::Power { link_init, .. } => *link_init,
                    _ => unreachable!("grouped by Power kind"),
                };
                if let Err(e) = self.bring_up_fpga(board.physical, link_init).await {
                    self.fail_one(&change, &format!("fpga bring-up: {e}")).await?;
                    continue;
                }
            }
            let at = Utc::now();
            let state = if on { PowerState::On } else { PowerState::Off };
            spalloc_store::machine_repo::set_board_power_state(self.store.pool(), board.id, state, at).await?;
            self.complete(&change, ChangeStatus::Done).await?;
            num_done += 1;
        }
        info!(job_id = %job_id, on, num_done, "bmp power change committed");
        Ok(())
    }

    async fn bring_up_fpga(&self, board: Physical, link_init: spalloc_model::LinkInitFlags) -> Result<()> {
        retry(self.config.fpga_attempts, || self.transceiver.configure_link_init(board, link_init)).await?;
        for attempt in 1..=self.config.fpga_attempts.max(1) {
            match self.transceiver.verify_fpga(board).await {
                Ok(true) => return Ok(()),
                Ok(false) if attempt < self.config.fpga_attempts && self.config.fpga_reload => {
                    warn!(?board, attempt, "fpga did not come up, reloading");
                    self.transceiver
                        .configure_link_init(board, link_init)
                        .await
                        .map_err(|e| BmpError::Hardware(e.to_string()))?;
                }
                Ok(false) => return Err(BmpError::Hardware(format!("fpga at {board} did not come up"))),
                Err(e) => return Err(BmpError::Hardware(e.to_string())),
            }
        }
        Err(BmpError::Hardware(format!("fpga at {board} never verified")))
    }

    async fn fail_group(&self, group: &[(PendingChange, Board)], reason: &str) -> Result<()> {
        for (change, _) in group {
            self.fail_one(change, reason).await?;
        }
        Ok(())
    }

    async fn fail_one(&self, change: &PendingChange, reason: &str) -> Result<()> {
        warn!(change_id = %change.id, reason, "pending change failed permanently");
        self.complete(change, ChangeStatus::Failed(reason.to_string())).await
    }

    /// Writes the change's final status, decrements the job's outstanding
    /// count, and hands off to the Job Lifecycle's settle logic (spec
    /// §4.7: "decrements num_pending; when it reaches zero the job
    /// transitions"). Every Power-kind completion, success or failure,
    /// goes through here exactly once.
    async fn complete(&self, change: &PendingChange, status: ChangeStatus) -> Result<()> {
        spalloc_store::job_repo::complete_pending_change(self.store.pool(), change.id, &status).await?;
        spalloc_store::job_repo::decrement_num_pending(self.store.pool(), change.job_id).await?;
        self.epochs.bump(EpochDomain::Machine);
        spalloc_jobs::on_change_completed(&self.store, &self.epochs, change.job_id)
            .await
            .map_err(|e| BmpError::Internal(e.to_string()))?;
        Ok(())
    }

    /// Blacklist operations touch one board at a time and are serialized
    /// by running on this BMP's single worker task (spec §4.5 step 5).
    /// They do not affect `num_pending`/job state, only the blacklist
    /// epoch.
    async fn dispatch_blacklist(&self, change: PendingChange) -> Result<()> {
        let board = spalloc_store::machine_repo::get_board(self.store.pool(), change.board_id).await?;
        let outcome = match change.kind {
            ChangeKind::BlacklistRead => {
                retry(self.config.power_attempts, || self.transceiver.read_blacklist(board.physical)).await
            }
            ChangeKind::BlacklistWrite => {
                retry(self.config.power_attempts, || self.transceiver.write_blacklist(board.physical)).await
            }
            ChangeKind::Power { .. } => unreachable!("non-power changes only"),
        };
        let status = match outcome {
            Ok(()) => ChangeStatus::Done,
            Err(e) => {
                warn!(change_id = %change.id, "blacklist operation failed: {e}");
                ChangeStatus::Failed(e.to_string())
            }
        };
        spalloc_store::job_repo::complete_pending_change(self.store.pool(), change.id, &status).await?;
        self.epochs.bump(EpochDomain::Blacklist);
        Ok(())
    }
}

async fn retry<T, F, Fut>(attempts: u32, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, crate::transceiver::TransceiverError>>,
{
    let attempts = attempts.max(1);
    let mut last = None;
    for attempt in 1..=attempts {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                warn!(attempt, attempts, "transceiver operation failed: {e}");
                last = Some(e);
            }
        }
    }
    Err(BmpError::Hardware(last.map(|e| e.to_string()).unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transceiver::TransceiverError;
    use std::sync::atomic::AtomicU32;

    #[tokio::test]
    async fn retry_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry(3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(TransceiverError("not yet".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_gives_up_after_the_configured_attempt_count() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry(2, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(TransceiverError("down".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dummy_transceiver_always_succeeds() {
        use crate::transceiver::{DummyTransceiver, Transceiver};
        let tx = DummyTransceiver;
        let board = Physical { cabinet: 0, frame: 0, board: 0 };
        assert!(tx.set_power(&[board], true).await.is_ok());
        assert!(tx.verify_fpga(board).await.unwrap());
    }
}
