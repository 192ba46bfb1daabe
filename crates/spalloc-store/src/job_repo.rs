//! Job / job_request / pending_change catalogue operations (spec §4.3, §4.4,
//! §4.5, §4.6).

use crate::error::{Result, StoreError};
use crate::rows::{change_status_str, job_state_str, JobRow, PendingChangeRow};
use chrono::{DateTime, Utc};
use spalloc_model::{
    BoardId, ChangeKind, ChangeStatus, Job, JobId, JobRequest, JobState, PendingChange,
    PendingChangeId,
};
use sqlx::PgPool;

pub async fn create_job(
    pool: &PgPool,
    owner: &str,
    request: &JobRequest,
    machine_tags: &[String],
    keepalive_interval_secs: u32,
    keepalive_host: Option<&str>,
) -> Result<JobId> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO jobs (owner, created_at, keepalive_interval_secs, keepalive_timestamp,
                           keepalive_host, state, request, machine_tags)
         VALUES ($1, $2, $3, $4, $5, 'queued', $6, $7) RETURNING id",
    )
    .bind(owner)
    .bind(now)
    .bind(keepalive_interval_secs as i32)
    .bind(now)
    .bind(keepalive_host)
    .bind(serde_json::to_value(request).map_err(|e| StoreError::Conflict(e.to_string()))?)
    .bind(serde_json::to_value(machine_tags).map_err(|e| StoreError::Conflict(e.to_string()))?)
    .fetch_one(&mut *tx)
    .await?;
    let job_id: JobId = row.0.into();
    sqlx::query("INSERT INTO job_requests (job_id, submitted_at, importance) VALUES ($1, $2, 0)")
        .bind(job_id.0)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(job_id)
}

pub async fn get_job(pool: &PgPool, id: JobId) -> Result<Job> {
    let row: JobRow = sqlx::query_as("SELECT * FROM jobs WHERE id = $1")
        .bind(id.0)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("job {id}")))?;
    row.into_model()
}

/// A pending request joined to its job, ordered for the allocator's
/// importance-aging pass (spec §4.4 step 1-2).
pub struct PendingRequest {
    pub job: Job,
    pub importance: f64,
    pub submitted_at: DateTime<Utc>,
}

pub async fn list_pending_requests(pool: &PgPool) -> Result<Vec<PendingRequest>> {
    let rows: Vec<(JobRow, f64, DateTime<Utc>)> = sqlx::query_as(
        "SELECT j.*, r.importance, r.submitted_at
         FROM job_requests r JOIN jobs j ON j.id = r.job_id
         ORDER BY r.job_id ASC",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|(row, importance, submitted_at)| {
            Ok(PendingRequest { job: row.into_model()?, importance, submitted_at })
        })
        .collect()
}

pub async fn bump_importance(pool: &PgPool, job_id: JobId, new_importance: f64) -> Result<()> {
    sqlx::query("UPDATE job_requests SET importance = $1 WHERE job_id = $2")
        .bind(new_importance)
        .bind(job_id.0)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_job_request(executor: impl sqlx::PgExecutor<'_>, job_id: JobId) -> Result<()> {
    sqlx::query("DELETE FROM job_requests WHERE job_id = $1")
        .bind(job_id.0)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn set_job_state(
    executor: impl sqlx::PgExecutor<'_>,
    job_id: JobId,
    state: JobState,
) -> Result<()> {
    sqlx::query("UPDATE jobs SET state = $1 WHERE id = $2")
        .bind(job_state_str(state))
        .bind(job_id.0)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn set_job_allocation(
    executor: impl sqlx::PgExecutor<'_>,
    job_id: JobId,
    width: u32,
    height: u32,
    root_board_id: BoardId,
    num_pending: i32,
) -> Result<()> {
    sqlx::query(
        "UPDATE jobs SET width = $1, height = $2, root_board_id = $3, num_pending = $4, state = 'power'
         WHERE id = $5",
    )
    .bind(width as i32)
    .bind(height as i32)
    .bind(root_board_id.0)
    .bind(num_pending)
    .bind(job_id.0)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn set_job_keepalive(pool: &PgPool, job_id: JobId, host: &str, at: DateTime<Utc>) -> Result<()> {
    let result = sqlx::query(
        "UPDATE jobs SET keepalive_timestamp = $1, keepalive_host = $2 WHERE id = $3 AND state != 'destroyed'",
    )
    .bind(at)
    .bind(host)
    .bind(job_id.0)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::Conflict(format!("job {job_id} is destroyed or missing")));
    }
    Ok(())
}

pub async fn decrement_num_pending(
    executor: impl sqlx::PgExecutor<'_>,
    job_id: JobId,
) -> Result<i32> {
    let row: (i32,) = sqlx::query_as(
        "UPDATE jobs SET num_pending = num_pending - 1 WHERE id = $1 RETURNING num_pending",
    )
    .bind(job_id.0)
    .fetch_one(executor)
    .await?;
    Ok(row.0)
}

pub async fn destroy_job(
    executor: impl sqlx::PgExecutor<'_>,
    job_id: JobId,
    reason: &str,
    at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE jobs SET state = 'destroyed', death_reason = $1, death_time = $2 WHERE id = $3",
    )
    .bind(reason)
    .bind(at)
    .bind(job_id.0)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn list_expired_jobs(pool: &PgPool) -> Result<Vec<Job>> {
    let rows: Vec<JobRow> = sqlx::query_as(
        "SELECT * FROM jobs
         WHERE state != 'destroyed'
           AND extract(epoch FROM (now() - keepalive_timestamp)) > keepalive_interval_secs",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(|r| r.into_model()).collect()
}

pub async fn insert_pending_change(
    executor: impl sqlx::PgExecutor<'_>,
    job_id: JobId,
    board_id: BoardId,
    kind: &ChangeKind,
) -> Result<PendingChangeId> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO pending_changes (job_id, board_id, kind, status) VALUES ($1, $2, $3, 'queued') RETURNING id",
    )
    .bind(job_id.0)
    .bind(serde_json::to_value(kind).map_err(|e| StoreError::Conflict(e.to_string()))?)
    .bind(board_id.0)
    .fetch_one(executor)
    .await?;
    Ok(row.0.into())
}

pub async fn delete_pending_changes_for_job(
    executor: impl sqlx::PgExecutor<'_>,
    job_id: JobId,
) -> Result<()> {
    sqlx::query("DELETE FROM pending_changes WHERE job_id = $1")
        .bind(job_id.0)
        .execute(executor)
        .await?;
    Ok(())
}

/// Claim every queued change for a given set of boards (one BMP's worth),
/// marking them in-flight in a short transaction (spec §4.5 step 1).
pub async fn claim_pending_changes(pool: &PgPool, board_ids: &[BoardId]) -> Result<Vec<PendingChange>> {
    if board_ids.is_empty() {
        return Ok(Vec::new());
    }
    let raw_ids: Vec<i64> = board_ids.iter().map(|b| b.0).collect();
    let mut tx = pool.begin().await?;
    let rows: Vec<PendingChangeRow> = sqlx::query_as(
        "UPDATE pending_changes SET status = 'in_flight'
         WHERE id IN (
             SELECT id FROM pending_changes
             WHERE board_id = ANY($1) AND status = 'queued'
             ORDER BY board_id, id
             FOR UPDATE SKIP LOCKED
         )
         RETURNING *",
    )
    .bind(&raw_ids)
    .fetch_all(&mut *tx)
    .await?;
    tx.commit().await?;
    rows.into_iter().map(|r| r.into_model()).collect()
}

/// Remove changes for this job that have not yet been claimed by a BMP
/// worker (spec §4.6: destroying a POWER job "cancels remaining pending
/// changes" — in-flight ones are left for the worker to finish, since a
/// claimed change cannot be safely un-claimed).
pub async fn cancel_queued_changes_for_job(pool: &PgPool, job_id: JobId) -> Result<u64> {
    let result = sqlx::query("DELETE FROM pending_changes WHERE job_id = $1 AND status = 'queued'")
        .bind(job_id.0)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn count_active_changes(pool: &PgPool, job_id: JobId) -> Result<i64> {
    let row: (i64,) = sqlx::query_as(
        "SELECT count(*) FROM pending_changes WHERE job_id = $1 AND status IN ('queued', 'in_flight')",
    )
    .bind(job_id.0)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

/// Whether any pending change for this job has settled as failed (spec
/// §4.6: a failed change while POWER drives the job to DESTROYED instead
/// of READY once `num_pending` reaches zero).
pub async fn has_failed_changes(pool: &PgPool, job_id: JobId) -> Result<bool> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM pending_changes WHERE job_id = $1 AND status = 'failed')",
    )
    .bind(job_id.0)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn set_num_pending(
    executor: impl sqlx::PgExecutor<'_>,
    job_id: JobId,
    num_pending: i32,
) -> Result<()> {
    sqlx::query("UPDATE jobs SET num_pending = $1 WHERE id = $2")
        .bind(num_pending)
        .bind(job_id.0)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn complete_pending_change(
    executor: impl sqlx::PgExecutor<'_>,
    id: PendingChangeId,
    status: &ChangeStatus,
) -> Result<()> {
    let error = match status {
        ChangeStatus::Failed(e) => Some(e.as_str()),
        _ => None,
    };
    sqlx::query("UPDATE pending_changes SET status = $1, error = $2 WHERE id = $3")
        .bind(change_status_str(status))
        .bind(error)
        .bind(id.0)
        .execute(executor)
        .await?;
    Ok(())
}
