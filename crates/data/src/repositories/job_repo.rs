//! Analysis job queue repository.
//!
//! The queue, not the worker, serializes job ownership: the worker runs
//! as overlapping scheduled invocations, so claiming must be a single
//! atomic conditional update against the shared store. Postgres row
//! locking (`FOR UPDATE SKIP LOCKED`) guarantees that two concurrent
//! `claim_next` calls never return the same job id.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::JobRecord;

/// Errors from queue operations.
#[derive(Error, Debug)]
pub enum QueueError {
    /// The requested transition found the job in a different state.
    /// Non-fatal for complete/fail callers: a stale sweep already
    /// reclaimed the job from under them.
    #[error("job {job_id} is not in the state required for {action}")]
    InvalidTransition {
        job_id: i64,
        action: &'static str,
    },

    /// The persistent store is unreachable or rejected the statement.
    /// Fatal for the current pass.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Counts from one stale sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Jobs returned to `pending` for another attempt.
    pub requeued: u64,
    /// Jobs that exhausted their attempt budget and were failed.
    pub abandoned: u64,
}

const CLAIM_NEXT_SQL: &str = r"
UPDATE analysis_jobs
SET status = 'processing', updated_at = NOW()
WHERE id = (
    SELECT id
    FROM analysis_jobs
    WHERE status = 'pending'
    ORDER BY created_at ASC
    LIMIT 1
    FOR UPDATE SKIP LOCKED
)
RETURNING id, user_id, match_id, status, error_message, attempts, created_at, updated_at
";

const COMPLETE_SQL: &str = r"
UPDATE analysis_jobs
SET status = 'completed', updated_at = NOW()
WHERE id = $1 AND status = 'processing'
";

const FAIL_SQL: &str = r"
UPDATE analysis_jobs
SET status = 'failed', error_message = $2, updated_at = NOW()
WHERE id = $1 AND status = 'processing'
";

const SWEEP_ABANDON_SQL: &str = r"
UPDATE analysis_jobs
SET status = 'failed',
    error_message = 'transient retry limit exhausted',
    updated_at = NOW()
WHERE status = 'processing' AND updated_at < $1 AND attempts + 1 >= $2
";

const SWEEP_REQUEUE_SQL: &str = r"
UPDATE analysis_jobs
SET status = 'pending', attempts = attempts + 1, updated_at = NOW()
WHERE status = 'processing' AND updated_at < $1
";

/// Repository for the `analysis_jobs` queue.
#[derive(Debug, Clone)]
pub struct JobQueueRepository {
    pool: PgPool,
}

impl JobQueueRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new pending job and returns its id.
    ///
    /// # Errors
    /// Returns [`QueueError::Storage`] if the store is unavailable.
    pub async fn enqueue(&self, user_id: i64, match_id: &str) -> Result<i64, QueueError> {
        let row: (i64,) = sqlx::query_as(
            r"
            INSERT INTO analysis_jobs (user_id, match_id, status)
            VALUES ($1, $2, 'pending')
            RETURNING id
            ",
        )
        .bind(user_id)
        .bind(match_id)
        .fetch_one(&self.pool)
        .await?;

        info!(job_id = row.0, user_id, match_id, "Enqueued analysis job");
        Ok(row.0)
    }

    /// Atomically claims the oldest pending job, if any.
    ///
    /// The claim is one conditional UPDATE over a `FOR UPDATE SKIP
    /// LOCKED` subselect: concurrent callers skip each other's locked
    /// row instead of blocking or double-claiming.
    ///
    /// # Errors
    /// Returns [`QueueError::Storage`] if the store is unavailable.
    pub async fn claim_next(&self) -> Result<Option<JobRecord>, QueueError> {
        let job = sqlx::query_as::<_, JobRecord>(CLAIM_NEXT_SQL)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(ref job) = job {
            info!(job_id = job.id, match_id = %job.match_id, "Claimed job");
        }
        Ok(job)
    }

    /// Marks a processing job completed.
    ///
    /// # Errors
    /// Returns [`QueueError::InvalidTransition`] if the job is no longer
    /// `processing` (a sweep reclaimed it); callers should treat this as
    /// non-fatal.
    pub async fn complete(&self, job_id: i64) -> Result<(), QueueError> {
        let result = sqlx::query(COMPLETE_SQL)
            .bind(job_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(QueueError::InvalidTransition {
                job_id,
                action: "complete",
            });
        }
        info!(job_id, "Job completed");
        Ok(())
    }

    /// Marks a processing job failed with an operator-facing message.
    ///
    /// # Errors
    /// Same contract as [`Self::complete`].
    pub async fn fail(&self, job_id: i64, error_message: &str) -> Result<(), QueueError> {
        let result = sqlx::query(FAIL_SQL)
            .bind(job_id)
            .bind(error_message)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(QueueError::InvalidTransition {
                job_id,
                action: "fail",
            });
        }
        warn!(job_id, error_message, "Job failed");
        Ok(())
    }

    /// Reclaims jobs stuck in `processing` longer than `timeout`.
    ///
    /// Jobs with attempt budget left go back to `pending` with the
    /// counter bumped; jobs at the bound are failed for good. Runs in a
    /// transaction so a job is either requeued or abandoned, never both.
    ///
    /// # Errors
    /// Returns [`QueueError::Storage`] if the store is unavailable.
    pub async fn sweep_stale(
        &self,
        timeout: Duration,
        max_attempts: i32,
    ) -> Result<SweepSummary, QueueError> {
        let cutoff = Utc::now() - timeout;
        let mut tx = self.pool.begin().await?;

        let abandoned = sqlx::query(SWEEP_ABANDON_SQL)
            .bind(cutoff)
            .bind(max_attempts)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let requeued = sqlx::query(SWEEP_REQUEUE_SQL)
            .bind(cutoff)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        if abandoned > 0 || requeued > 0 {
            warn!(requeued, abandoned, "Swept stale jobs");
        }
        Ok(SweepSummary {
            requeued,
            abandoned,
        })
    }

    /// Returns a user's most recent jobs, newest first. Kept for the
    /// front end's history view; jobs are never deleted.
    ///
    /// # Errors
    /// Returns [`QueueError::Storage`] if the query fails.
    pub async fn recent_for_user(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<JobRecord>, QueueError> {
        let jobs = sqlx::query_as::<_, JobRecord>(
            r"
            SELECT id, user_id, match_id, status, error_message, attempts, created_at, updated_at
            FROM analysis_jobs
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            ",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Claim Protocol Shape (no DB needed)
    // =========================================================================

    #[test]
    fn test_claim_is_a_single_conditional_update() {
        // The linearizability of claims rests on this being one atomic
        // statement, not a read-then-write.
        assert!(CLAIM_NEXT_SQL.trim_start().starts_with("UPDATE"));
        assert!(CLAIM_NEXT_SQL.contains("FOR UPDATE SKIP LOCKED"));
        assert!(CLAIM_NEXT_SQL.contains("status = 'pending'"));
        assert!(CLAIM_NEXT_SQL.contains("LIMIT 1"));
    }

    #[test]
    fn test_claim_is_fifo() {
        assert!(CLAIM_NEXT_SQL.contains("ORDER BY created_at ASC"));
    }

    #[test]
    fn test_complete_and_fail_guard_on_processing() {
        // processing -> completed/failed only; a swept job makes these
        // no-ops surfaced as InvalidTransition.
        assert!(COMPLETE_SQL.contains("status = 'processing'"));
        assert!(FAIL_SQL.contains("status = 'processing'"));
    }

    #[test]
    fn test_sweep_only_touches_stale_processing_rows() {
        for sql in [SWEEP_ABANDON_SQL, SWEEP_REQUEUE_SQL] {
            assert!(sql.contains("status = 'processing'"));
            assert!(sql.contains("updated_at < $1"));
        }
        assert!(SWEEP_REQUEUE_SQL.contains("attempts = attempts + 1"));
        assert!(SWEEP_ABANDON_SQL.contains("attempts + 1 >= $2"));
    }

    // =========================================================================
    // Error Types
    // =========================================================================

    #[test]
    fn test_invalid_transition_message() {
        let err = QueueError::InvalidTransition {
            job_id: 7,
            action: "complete",
        };
        let message = err.to_string();
        assert!(message.contains('7'));
        assert!(message.contains("complete"));
    }

    #[test]
    fn test_sweep_summary_default() {
        let summary = SweepSummary::default();
        assert_eq!(summary.requeued, 0);
        assert_eq!(summary.abandoned, 0);
    }
}
