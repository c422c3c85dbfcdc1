//! Prediction history repository.
//!
//! Only the reconciler writes `status` on these rows, and the write is a
//! conditional `pending -> correct|incorrect` update, so reconciliation
//! is idempotent: resolving a row twice affects zero rows the second
//! time.

use anyhow::Result;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::{debug, info};

use crate::models::{NewPrediction, PredictionRecord, PredictionStatus};

const RESOLVE_SQL: &str = r"
UPDATE prediction_history
SET status = $2
WHERE id = $1 AND status = 'pending'
";

// ON CONFLICT DO NOTHING makes the result write idempotent: a job
// retried after a crash or a mid-flight sweep finds its row already
// present and records nothing new.
const INSERT_SQL: &str = r"
INSERT INTO prediction_history
    (user_id, match_id, sport_key, home_team, away_team, commence_time,
     predicted_winner, confidence_score, risk_level, status)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending')
ON CONFLICT (user_id, match_id) DO NOTHING
RETURNING id
";

/// Repository for the `prediction_history` table.
#[derive(Debug, Clone)]
pub struct PredictionRepository {
    pool: PgPool,
}

impl PredictionRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new pending prediction and returns its id, or `None`
    /// if a prediction for this user and match already exists (a
    /// retried job re-recording its result).
    ///
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn insert(&self, prediction: &NewPrediction) -> Result<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as(INSERT_SQL)
            .bind(prediction.user_id)
            .bind(&prediction.match_id)
            .bind(&prediction.sport_key)
            .bind(&prediction.home_team)
            .bind(&prediction.away_team)
            .bind(prediction.commence_time)
            .bind(&prediction.predicted_winner)
            .bind(prediction.confidence_score)
            .bind(&prediction.risk_level)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((id,)) => {
                info!(
                    prediction_id = id,
                    match_id = %prediction.match_id,
                    predicted_winner = %prediction.predicted_winner,
                    "Saved prediction"
                );
                Ok(Some(id))
            }
            None => {
                debug!(
                    user_id = prediction.user_id,
                    match_id = %prediction.match_id,
                    "Prediction already recorded; insert was a no-op"
                );
                Ok(None)
            }
        }
    }

    /// Pending predictions whose settlement buffer has elapsed, oldest
    /// commence time first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn pending_due(&self, buffer: Duration) -> Result<Vec<PredictionRecord>> {
        let cutoff = Utc::now() - buffer;
        let records = sqlx::query_as::<_, PredictionRecord>(
            r"
            SELECT id, user_id, match_id, sport_key, home_team, away_team, commence_time,
                   predicted_winner, confidence_score, risk_level, status, created_at
            FROM prediction_history
            WHERE status = 'pending' AND commence_time <= $1
            ORDER BY commence_time ASC
            ",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Resolves a pending prediction; returns false if it was already
    /// resolved (idempotent no-op).
    ///
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn resolve(&self, id: i64, correct: bool) -> Result<bool> {
        let status = if correct {
            PredictionStatus::Correct
        } else {
            PredictionStatus::Incorrect
        };

        let result = sqlx::query(RESOLVE_SQL)
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        let updated = result.rows_affected() > 0;
        if updated {
            info!(prediction_id = id, status = %status, "Resolved prediction");
        }
        Ok(updated)
    }

    /// A user's most recent predictions, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn recent_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<PredictionRecord>> {
        let records = sqlx::query_as::<_, PredictionRecord>(
            r"
            SELECT id, user_id, match_id, sport_key, home_team, away_team, commence_time,
                   predicted_winner, confidence_score, risk_level, status, created_at
            FROM prediction_history
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            ",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Aggregate accuracy for a user's resolved predictions.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn accuracy_for_user(&self, user_id: i64) -> Result<PredictionStats> {
        let result: (Option<i64>, Option<i64>, Option<i64>) = sqlx::query_as(
            r"
            SELECT
                COUNT(*) as total,
                COUNT(*) FILTER (WHERE status <> 'pending') as resolved,
                COUNT(*) FILTER (WHERE status = 'correct') as correct
            FROM prediction_history
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let total = result.0.unwrap_or(0) as u32;
        let resolved = result.1.unwrap_or(0) as u32;
        let correct = result.2.unwrap_or(0) as u32;

        Ok(PredictionStats {
            total,
            resolved,
            pending: total.saturating_sub(resolved),
            correct,
        })
    }
}

/// Aggregate prediction statistics for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionStats {
    pub total: u32,
    pub resolved: u32,
    pub pending: u32,
    pub correct: u32,
}

impl PredictionStats {
    /// Fraction of resolved predictions that were correct.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.resolved == 0 {
            return 0.0;
        }
        f64::from(self.correct) / f64::from(self.resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Resolution Shape (no DB needed)
    // =========================================================================

    #[test]
    fn test_insert_is_idempotent_per_user_and_match() {
        // A job retried after a mid-flight sweep or crash writes its
        // prediction again; the conflict clause turns that into a
        // no-op instead of a duplicate history row.
        assert!(INSERT_SQL.contains("ON CONFLICT (user_id, match_id) DO NOTHING"));
        assert!(INSERT_SQL.contains("RETURNING id"));
    }

    #[test]
    fn test_resolve_is_conditional_on_pending() {
        // The WHERE clause makes reconciliation idempotent: a second
        // resolve on the same row affects zero rows.
        assert!(RESOLVE_SQL.contains("status = 'pending'"));
        assert!(RESOLVE_SQL.trim_start().starts_with("UPDATE"));
    }

    // =========================================================================
    // PredictionStats
    // =========================================================================

    #[test]
    fn test_accuracy() {
        let stats = PredictionStats {
            total: 10,
            resolved: 8,
            pending: 2,
            correct: 6,
        };
        assert!((stats.accuracy() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_accuracy_with_nothing_resolved() {
        let stats = PredictionStats {
            total: 3,
            resolved: 0,
            pending: 3,
            correct: 0,
        };
        assert!((stats.accuracy() - 0.0).abs() < f64::EPSILON);
    }
}
