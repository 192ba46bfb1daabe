//! The Allocation Engine tick loop (spec §4.4).
//!
//! Grounded on `AutonomicController::start`'s MAPE-K loop shape (teacher:
//! `seanchatmangpt-knhk`): a `tokio::time::interval` ticker, an atomic
//! running flag, one `#[instrument]`-decorated cycle method that never
//! lets a single request's failure abort the tick.

use crate::error::{AllocError, Result};
use crate::search::{find_fixed_rectangle, find_number_of_boards, RegionView};
use crate::snapshot::MachineSnapshot;
use spalloc_config::AllocatorConfig;
use spalloc_epoch::{EpochDomain, EpochManager};
use spalloc_model::{BoardSelector, ChangeKind, Direction, JobId, JobRequest, LinkInitFlags, Triad};
use spalloc_store::Store;
use spalloc_topology::mv;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};

pub struct AllocationEngine {
    store: Store,
    epochs: EpochManager,
    config: AllocatorConfig,
    running: Arc<AtomicBool>,
}

impl AllocationEngine {
    pub fn new(store: Store, epochs: EpochManager, config: AllocatorConfig) -> Self {
        Self { store, epochs, config, running: Arc::new(AtomicBool::new(false)) }
    }

    #[instrument(skip(self))]
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("allocation engine already running");
            return;
        }
        let mut ticker = interval(Duration::from_secs(self.config.period_secs.max(1)));
        info!(period_secs = self.config.period_secs, "allocation engine started");
        loop {
            ticker.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            if let Err(e) = self.tick().await {
                error!("allocation tick failed: {e}");
            }
        }
        info!("allocation engine stopped");
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// One pass over pending requests (spec §4.4 steps 1-5).
    #[instrument(skip(self))]
    async fn tick(&self) -> Result<()> {
        let mut pending = spalloc_store::job_repo::list_pending_requests(self.store.pool()).await?;
        if pending.is_empty() {
            return Ok(());
        }

        for p in &mut pending {
            let rate = priority_rate(&self.config, &p.job.request);
            p.importance += rate;
            spalloc_store::job_repo::bump_importance(self.store.pool(), p.job.id, p.importance).await?;
        }

        let max_importance = pending.iter().map(|p| p.importance).fold(f64::MIN, f64::max);
        let span = self.config.importance_span;
        let mut window: Vec<_> = pending
            .into_iter()
            .filter(|p| max_importance - p.importance <= span)
            .collect();
        window.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.job.id.0.cmp(&b.job.id.0))
        });

        debug!(considered = window.len(), "allocation window selected");

        for p in window {
            match self.consider(p.job.id, &p.job.request, &p.job.machine_tags).await {
                Ok(true) => {
                    self.epochs.bump(EpochDomain::Job);
                    self.epochs.bump(EpochDomain::Machine);
                }
                Ok(false) => {}
                Err(e) => warn!(job_id = %p.job.id, "allocation attempt failed: {e}"),
            }
        }
        Ok(())
    }

    /// Try to satisfy one request; returns `Ok(true)` on success, `Ok(false)`
    /// if no region is currently available (left pending for next tick).
    async fn consider(&self, job_id: JobId, request: &JobRequest, tags: &[String]) -> Result<bool> {
        let machine = self.pick_machine(tags).await?;
        let Some(machine) = machine else { return Ok(false) };

        match request {
            JobRequest::Specific { selector } => self.try_specific(job_id, machine, *selector).await,
            JobRequest::Rectangle { width, height, max_dead_boards } => {
                let snapshot = MachineSnapshot::load(&self.store, machine).await?;
                match find_fixed_rectangle(&snapshot, *width, *height, *max_dead_boards) {
                    Some(m) => self.commit(job_id, &snapshot, m.boards).await.map(|_| true),
                    None => Ok(false),
                }
            }
            JobRequest::NumBoards { n, max_dead_boards } => {
                let snapshot = MachineSnapshot::load(&self.store, machine).await?;
                match find_number_of_boards(&snapshot, *n, *max_dead_boards) {
                    Some(m) => self.commit(job_id, &snapshot, m.boards).await.map(|_| true),
                    None => Ok(false),
                }
            }
        }
    }

    async fn pick_machine(&self, tags: &[String]) -> Result<Option<spalloc_model::MachineId>> {
        let machines = spalloc_store::machine_repo::list_machines(self.store.pool()).await?;
        Ok(machines
            .into_iter()
            .find(|m| m.in_service && tags.iter().all(|t| m.tags.contains(t)))
            .map(|m| m.id))
    }

    async fn try_specific(
        &self,
        job_id: JobId,
        machine: spalloc_model::MachineId,
        selector: BoardSelector,
    ) -> Result<bool> {
        let board = match selector {
            BoardSelector::Triad(t) => {
                spalloc_store::machine_repo::get_board_by_triad(self.store.pool(), machine, t).await?
            }
            BoardSelector::Physical(p) => {
                spalloc_store::machine_repo::get_board_by_physical(self.store.pool(), machine, p).await?
            }
            BoardSelector::Ip(ip) => spalloc_store::machine_repo::get_board_by_ip(self.store.pool(), ip).await?,
        };
        let Some(board) = board else { return Ok(false) };
        if board.is_dead() || board.allocated_job.is_some() || !board.may_be_allocated {
            return Ok(false);
        }
        let snapshot = MachineSnapshot::load(&self.store, machine).await?;
        self.commit(job_id, &snapshot, vec![board.triad]).await.map(|_| true)
    }

    /// spec §4.4 step 4: one transaction — allocate boards, set job fields,
    /// queue pending power-on changes, delete the job_request row.
    async fn commit(&self, job_id: JobId, snapshot: &MachineSnapshot, boards: Vec<Triad>) -> Result<()> {
        let selection: HashSet<Triad> = boards.iter().copied().collect();
        let min_x = boards.iter().map(|t| t.x).min().unwrap_or(0);
        let min_y = boards.iter().map(|t| t.y).min().unwrap_or(0);
        let max_x = boards.iter().map(|t| t.x).max().unwrap_or(0);
        let max_y = boards.iter().map(|t| t.y).max().unwrap_or(0);
        let width_chips = (max_x - min_x + 1) * spalloc_topology::S;
        let height_chips = (max_y - min_y + 1) * spalloc_topology::S;

        let mut root = boards[0];
        for &t in &boards {
            if (t.y, t.x, t.z) < (root.y, root.x, root.z) {
                root = t;
            }
        }
        let root_id = snapshot
            .board_id(root)
            .ok_or_else(|| AllocError::Store(spalloc_store::StoreError::Conflict("root board vanished".into())))?;

        let mut tx = self.store.pool().begin().await.map_err(spalloc_store::StoreError::Db)?;

        for &triad in &boards {
            let board_id = snapshot
                .board_id(triad)
                .ok_or_else(|| AllocError::Store(spalloc_store::StoreError::Conflict("board vanished".into())))?;
            sqlx::query("UPDATE boards SET allocated_job_id = $1 WHERE id = $2")
                .bind(job_id.0)
                .bind(board_id.0)
                .execute(&mut *tx)
                .await
                .map_err(spalloc_store::StoreError::Db)?;

            let mut flags = LinkInitFlags::all_disabled();
            for direction in Direction::ALL {
                let neighbour = mv(triad, direction, snapshot.width(), snapshot.height());
                let internal = selection.contains(&neighbour) && snapshot.live_link(triad, direction);
                set_flag(&mut flags, direction, internal);
            }
            let kind = ChangeKind::Power { on: true, link_init: flags };
            sqlx::query(
                "INSERT INTO pending_changes (job_id, board_id, kind, status) VALUES ($1, $2, $3, 'queued')",
            )
            .bind(job_id.0)
            .bind(serde_json::to_value(&kind).map_err(|e| {
                AllocError::Store(spalloc_store::StoreError::Conflict(e.to_string()))
            })?)
            .bind(board_id.0)
            .execute(&mut *tx)
            .await
            .map_err(spalloc_store::StoreError::Db)?;
        }

        sqlx::query(
            "UPDATE jobs SET width = $1, height = $2, root_board_id = $3, num_pending = $4, state = 'power'
             WHERE id = $5",
        )
        .bind(width_chips as i32)
        .bind(height_chips as i32)
        .bind(root_id.0)
        .bind(boards.len() as i32)
        .bind(job_id.0)
        .execute(&mut *tx)
        .await
        .map_err(spalloc_store::StoreError::Db)?;

        sqlx::query("DELETE FROM job_requests WHERE job_id = $1")
            .bind(job_id.0)
            .execute(&mut *tx)
            .await
            .map_err(spalloc_store::StoreError::Db)?;

        tx.commit().await.map_err(spalloc_store::StoreError::Db)?;
        info!(job_id = %job_id, boards = boards.len(), "job allocated");
        Ok(())
    }
}

fn set_flag(flags: &mut LinkInitFlags, direction: Direction, value: bool) {
    match direction {
        Direction::North => flags.n = value,
        Direction::South => flags.s = value,
        Direction::East => flags.e = value,
        Direction::West => flags.w = value,
        Direction::NorthEast => flags.ne = value,
        Direction::SouthWest => flags.sw = value,
    }
}

fn priority_rate(config: &AllocatorConfig, request: &JobRequest) -> f64 {
    match request.priority_scale_key() {
        "size" => config.priority_scale.size,
        "dimensions" => config.priority_scale.dimensions,
        _ => config.priority_scale.specific_board,
    }
}
