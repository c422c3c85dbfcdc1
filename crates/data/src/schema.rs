//! Database schema creation.
//!
//! Idempotent DDL applied at startup or via `odds-oracle init-db`. The
//! store is the single source of truth for jobs and predictions; neither
//! table is ever dropped or trimmed by the pipeline.

use anyhow::Result;
use sqlx::PgPool;

const CREATE_ANALYSIS_JOBS: &str = r"
CREATE TABLE IF NOT EXISTS analysis_jobs (
    id            BIGSERIAL PRIMARY KEY,
    user_id       BIGINT NOT NULL,
    match_id      TEXT NOT NULL,
    status        TEXT NOT NULL DEFAULT 'pending',
    error_message TEXT,
    attempts      INTEGER NOT NULL DEFAULT 0,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

const CREATE_PREDICTION_HISTORY: &str = r"
CREATE TABLE IF NOT EXISTS prediction_history (
    id               BIGSERIAL PRIMARY KEY,
    user_id          BIGINT NOT NULL,
    match_id         TEXT NOT NULL,
    sport_key        TEXT NOT NULL,
    home_team        TEXT NOT NULL,
    away_team        TEXT NOT NULL,
    commence_time    TIMESTAMPTZ NOT NULL,
    predicted_winner TEXT NOT NULL,
    confidence_score DOUBLE PRECISION NOT NULL,
    risk_level       TEXT NOT NULL,
    status           TEXT NOT NULL DEFAULT 'pending',
    created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

// The claim query scans pending rows oldest-first; the reconciler scans
// pending predictions by commence time.
const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_jobs_status_created
     ON analysis_jobs (status, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_jobs_user
     ON analysis_jobs (user_id, created_at DESC)",
    // Backs the idempotent prediction insert: a job retried after a
    // crash or mid-flight sweep must not record a second prediction
    // for the same user and match.
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_predictions_user_match
     ON prediction_history (user_id, match_id)",
    "CREATE INDEX IF NOT EXISTS idx_predictions_status_commence
     ON prediction_history (status, commence_time)",
    "CREATE INDEX IF NOT EXISTS idx_predictions_user
     ON prediction_history (user_id, created_at DESC)",
];

/// Creates all tables and indexes if they do not exist.
///
/// # Errors
/// Returns an error if any DDL statement fails.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(CREATE_ANALYSIS_JOBS).execute(pool).await?;
    sqlx::query(CREATE_PREDICTION_HISTORY).execute(pool).await?;
    for ddl in CREATE_INDEXES {
        sqlx::query(ddl).execute(pool).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ddl_is_idempotent_by_construction() {
        assert!(CREATE_ANALYSIS_JOBS.contains("IF NOT EXISTS"));
        assert!(CREATE_PREDICTION_HISTORY.contains("IF NOT EXISTS"));
        for ddl in CREATE_INDEXES {
            assert!(ddl.contains("IF NOT EXISTS"));
        }
    }

    #[test]
    fn test_predictions_are_unique_per_user_and_match() {
        // Retried jobs rely on this constraint to make their result
        // write a no-op the second time around.
        let unique = CREATE_INDEXES
            .iter()
            .find(|ddl| ddl.contains("UNIQUE") && ddl.contains("prediction_history"))
            .expect("unique prediction index missing");
        assert!(unique.contains("user_id, match_id"));
    }
}
