//! Results reconciler.
//!
//! A slow scheduled pass that grades pending predictions once their
//! match has had time to finish. Grading is per-row and idempotent, so
//! overlapping reconciler invocations and crashes mid-pass are safe:
//! whoever resolves a row first wins, everyone else no-ops.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;
use tracing::{info, warn};

use odds_oracle_core::{MatchResultsProvider, MatchWinner, ReconcilerConfig};
use odds_oracle_data::PredictionRepository;

/// Counters from one reconciler pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Pending predictions past their settlement buffer.
    pub due: u32,
    pub resolved_correct: u32,
    pub resolved_incorrect: u32,
    /// Rows another invocation resolved first.
    pub already_resolved: u32,
    /// Matches whose final result is not published yet.
    pub awaiting_result: u32,
    /// Upstream fetch failures, retried on the next pass.
    pub fetch_errors: u32,
}

/// The winner name a prediction row is graded against.
fn actual_winner_name(winner: &MatchWinner, home_team: &str, away_team: &str) -> String {
    match winner {
        MatchWinner::Home => home_team.to_string(),
        MatchWinner::Away => away_team.to_string(),
        MatchWinner::Draw => "Draw".to_string(),
    }
}

/// Grades pending predictions against published final results.
pub struct ResultsReconciler {
    predictions: PredictionRepository,
    results: Arc<dyn MatchResultsProvider>,
    config: ReconcilerConfig,
}

impl ResultsReconciler {
    #[must_use]
    pub fn new(
        predictions: PredictionRepository,
        results: Arc<dyn MatchResultsProvider>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            predictions,
            results,
            config,
        }
    }

    /// Runs one reconciliation pass over every due prediction.
    ///
    /// A missing or failed result fetch skips that row and moves on; a
    /// storage error aborts the pass.
    ///
    /// # Errors
    /// Returns an error when the persistent store is unavailable.
    pub async fn run_pass(&self) -> Result<ReconcileSummary> {
        let buffer =
            Duration::seconds(self.config.settlement_buffer_secs.min(i64::MAX as u64) as i64);
        let due = self
            .predictions
            .pending_due(buffer)
            .await
            .context("loading due predictions failed")?;

        let mut summary = ReconcileSummary {
            due: u32::try_from(due.len()).unwrap_or(u32::MAX),
            ..ReconcileSummary::default()
        };

        for record in &due {
            let outcome = match self.results.fetch_outcome(&record.match_id).await {
                Ok(Some(outcome)) => outcome,
                Ok(None) => {
                    summary.awaiting_result += 1;
                    continue;
                }
                Err(err) => {
                    warn!(
                        prediction_id = record.id,
                        match_id = %record.match_id,
                        error = %err,
                        "Result fetch failed; will retry next pass"
                    );
                    summary.fetch_errors += 1;
                    continue;
                }
            };

            let actual =
                actual_winner_name(&outcome.winner, &record.home_team, &record.away_team);
            let correct = actual == record.predicted_winner;

            let updated = self
                .predictions
                .resolve(record.id, correct)
                .await
                .context("resolving prediction failed")?;

            if !updated {
                summary.already_resolved += 1;
            } else if correct {
                summary.resolved_correct += 1;
            } else {
                summary.resolved_incorrect += 1;
            }
        }

        info!(
            due = summary.due,
            correct = summary.resolved_correct,
            incorrect = summary.resolved_incorrect,
            awaiting = summary.awaiting_result,
            errors = summary.fetch_errors,
            "Reconciler pass finished"
        );
        Ok(summary)
    }
}
