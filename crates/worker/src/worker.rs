//! Batch analysis worker.
//!
//! Each scheduled invocation is one pass: sweep stale claims, then drain
//! the pending queue one atomically claimed job at a time until the
//! queue is empty or the pass budget runs out. Invocations may overlap;
//! the queue's claim protocol keeps them from stepping on each other.
//!
//! Failure handling follows one rule: a job failure never kills the
//! pass, a storage failure always does. Transient job failures are left
//! in `processing` so the stale sweep requeues them with the attempt
//! counter bumped, keeping `processing -> pending` a sweep-only
//! transition.

use std::time::{Duration as StdDuration, Instant};

use anyhow::{Context, Result};
use chrono::Duration;
use tracing::{error, info, warn};

use odds_oracle_core::{JobFailure, MatchDetails, ProviderError, WorkerConfig};
use odds_oracle_data::{
    JobQueueRepository, JobRecord, NewPrediction, PredictionRepository, QueueError, SweepSummary,
};
use odds_oracle_scanner::{best_prices, scan};
use odds_oracle_synthesizer::{Pick, SignalSet, Synthesizer};

use crate::signals::{home_oriented_score, market_implied_home_probability, SignalFetcher};

/// Counters from one worker pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub sweep: SweepSummary,
    /// Jobs that produced a stored prediction.
    pub completed: u32,
    /// Jobs failed for good on this pass.
    pub failed: u32,
    /// Transient failures left in `processing` for a later sweep.
    pub deferred: u32,
}

/// Outcome of processing one claimed job.
enum ProcessError {
    /// The job itself failed; the pass continues.
    Job(JobFailure),
    /// The store is unavailable; the pass aborts.
    Storage(anyhow::Error),
}

/// Maps a cache/provider error onto the job failure taxonomy.
///
/// Anything that is not a recognizable provider error is treated as
/// transient; a later attempt against a healthy upstream may succeed.
fn classify_fetch_error(err: &anyhow::Error) -> JobFailure {
    match err.downcast_ref::<ProviderError>() {
        Some(provider) => JobFailure::from_provider(provider),
        None => JobFailure::Transient(err.to_string()),
    }
}

/// Operator-facing message for a job failed for good.
///
/// A transient failure only reaches this point with its attempt budget
/// spent, so it carries the same exhausted marker the sweep writes.
fn terminal_failure_message(failure: &JobFailure) -> String {
    match failure {
        JobFailure::Transient(detail) => {
            format!("transient retry limit exhausted: {detail}")
        }
        other => other.operator_message(),
    }
}

/// Resolves a synthesized pick to the stored winner name.
fn picked_winner(pick: Pick, details: &MatchDetails) -> String {
    match pick {
        Pick::Home => details.home_team.clone(),
        Pick::Away => details.away_team.clone(),
        Pick::Draw => "Draw".to_string(),
    }
}

/// One-shot batch worker over the analysis job queue.
pub struct AnalysisWorker {
    queue: JobQueueRepository,
    predictions: PredictionRepository,
    signals: SignalFetcher,
    synthesizer: Synthesizer,
    config: WorkerConfig,
}

impl AnalysisWorker {
    #[must_use]
    pub fn new(
        queue: JobQueueRepository,
        predictions: PredictionRepository,
        signals: SignalFetcher,
        synthesizer: Synthesizer,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            predictions,
            signals,
            synthesizer,
            config,
        }
    }

    /// Runs one worker pass to completion.
    ///
    /// # Errors
    /// Returns an error only when the persistent store is unavailable;
    /// the pass stops immediately rather than thrash a dead database.
    pub async fn run_pass(&self) -> Result<PassSummary> {
        let mut summary = PassSummary {
            sweep: self
                .queue
                .sweep_stale(
                    Duration::seconds(self.config.stale_timeout_secs.min(i64::MAX as u64) as i64),
                    self.config.max_attempts,
                )
                .await
                .context("stale sweep failed")?,
            ..PassSummary::default()
        };

        let deadline = Instant::now() + StdDuration::from_secs(self.config.pass_budget_secs);

        loop {
            if Instant::now() >= deadline {
                info!("Pass budget exhausted; leaving remaining jobs for the next invocation");
                break;
            }

            let job = match self.queue.claim_next().await {
                Ok(Some(job)) => job,
                Ok(None) => break,
                Err(err) => return Err(err).context("claiming next job failed"),
            };

            match self.process_job(&job).await {
                Ok(()) => {
                    self.finish(job.id, "complete", self.queue.complete(job.id).await)?;
                    summary.completed += 1;
                }
                Err(ProcessError::Job(failure)) => {
                    self.record_failure(&job, &failure, &mut summary).await?;
                }
                Err(ProcessError::Storage(err)) => {
                    error!(job_id = job.id, "Aborting pass on storage error");
                    return Err(err);
                }
            }
        }

        let stats = self.signals.cache_stats();
        info!(
            completed = summary.completed,
            failed = summary.failed,
            deferred = summary.deferred,
            requeued = summary.sweep.requeued,
            abandoned = summary.sweep.abandoned,
            cache_hits = stats.hits,
            cache_misses = stats.misses,
            "Worker pass finished"
        );
        Ok(summary)
    }

    /// Applies the failure policy for one job.
    async fn record_failure(
        &self,
        job: &JobRecord,
        failure: &JobFailure,
        summary: &mut PassSummary,
    ) -> Result<()> {
        if failure.is_retryable() && job.attempts + 1 < self.config.max_attempts {
            // Left in `processing` on purpose: the stale sweep is the
            // only writer of processing -> pending, and it bumps the
            // attempt counter as it requeues.
            warn!(
                job_id = job.id,
                attempts = job.attempts,
                error = %failure,
                "Transient failure; deferring job to the stale sweep"
            );
            summary.deferred += 1;
            return Ok(());
        }

        self.finish(
            job.id,
            "fail",
            self.queue
                .fail(job.id, &terminal_failure_message(failure))
                .await,
        )?;
        summary.failed += 1;
        Ok(())
    }

    /// Terminal-transition error policy: a lost race with the sweep is
    /// logged and ignored, a storage error aborts the pass.
    fn finish(&self, job_id: i64, action: &str, result: Result<(), QueueError>) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(QueueError::InvalidTransition { .. }) => {
                warn!(job_id, action, "Job was reclaimed by a sweep mid-flight");
                Ok(())
            }
            Err(err @ QueueError::Storage(_)) => {
                Err(anyhow::Error::new(err)).context("terminal transition failed")
            }
        }
    }

    /// Runs the analysis for one job under the per-job time budget.
    async fn process_job(&self, job: &JobRecord) -> Result<(), ProcessError> {
        let budget = StdDuration::from_secs(self.config.job_budget_secs);
        match tokio::time::timeout(budget, self.analyze(job)).await {
            Ok(result) => result,
            Err(_) => Err(ProcessError::Job(JobFailure::Transient(format!(
                "job exceeded its {}s time budget",
                self.config.job_budget_secs
            )))),
        }
    }

    /// Fetches signals, synthesizes a prediction, and stores it.
    async fn analyze(&self, job: &JobRecord) -> Result<(), ProcessError> {
        let details = self
            .signals
            .match_details(&job.match_id)
            .await
            .map_err(|e| ProcessError::Job(classify_fetch_error(&e)))?;

        let quotes = self
            .signals
            .quotes(&job.match_id)
            .await
            .map_err(|e| ProcessError::Job(classify_fetch_error(&e)))?;

        let best = best_prices(&quotes);
        let market = market_implied_home_probability(&best, &details.home_team, &details.away_team)
            .ok_or_else(|| {
                // Books may simply not have posted both sides yet.
                ProcessError::Job(JobFailure::Transient(
                    "no quotes for one or both sides of the match".to_string(),
                ))
            })?;

        let hist_home = self
            .signals
            .historical_score(&details.home_team)
            .await
            .map_err(|e| ProcessError::Job(classify_fetch_error(&e)))?;
        let hist_away = self
            .signals
            .historical_score(&details.away_team)
            .await
            .map_err(|e| ProcessError::Job(classify_fetch_error(&e)))?;
        let sent_home = self
            .signals
            .sentiment_score(&details.home_team)
            .await
            .map_err(|e| ProcessError::Job(classify_fetch_error(&e)))?;
        let sent_away = self
            .signals
            .sentiment_score(&details.away_team)
            .await
            .map_err(|e| ProcessError::Job(classify_fetch_error(&e)))?;

        let signals = SignalSet::new(
            market,
            home_oriented_score(hist_home, hist_away),
            home_oriented_score(sent_home, sent_away),
        );

        let prediction = self
            .synthesizer
            .synthesize(signals)
            .map_err(|e| ProcessError::Job(JobFailure::Invariant(e.to_string())))?;

        // Arbitrage detection rides along on the quotes already in hand.
        // Opportunities are reported, never persisted or acted on.
        if let Some(opportunity) = scan(&job.match_id, &quotes) {
            info!(
                job_id = job.id,
                match_id = %job.match_id,
                margin = %opportunity.margin,
                "Arbitrage opportunity detected"
            );
        }

        let new = NewPrediction {
            user_id: job.user_id,
            match_id: job.match_id.clone(),
            sport_key: details.sport_key.clone(),
            home_team: details.home_team.clone(),
            away_team: details.away_team.clone(),
            commence_time: details.commence_time,
            predicted_winner: picked_winner(prediction.pick, &details),
            confidence_score: prediction.confidence_score,
            risk_level: prediction.risk_level.as_str().to_string(),
        };
        let inserted = self
            .predictions
            .insert(&new)
            .await
            .map_err(ProcessError::Storage)?;
        if inserted.is_none() {
            // A previous attempt already recorded this result before
            // its claim was swept; completing is all that is left.
            info!(job_id = job.id, match_id = %job.match_id, "Prediction already recorded");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn details() -> MatchDetails {
        MatchDetails {
            match_id: "m-1".to_string(),
            sport_key: "soccer_epl".to_string(),
            home_team: "Alpha".to_string(),
            away_team: "Bravo".to_string(),
            commence_time: Utc::now(),
        }
    }

    // =========================================================================
    // Failure Classification
    // =========================================================================

    #[test]
    fn test_provider_errors_keep_their_category_through_anyhow() {
        let transient = anyhow::Error::new(ProviderError::Network("timeout".into()));
        assert!(classify_fetch_error(&transient).is_retryable());

        let permanent = anyhow::Error::new(ProviderError::NotFound("match gone".into()));
        assert!(!classify_fetch_error(&permanent).is_retryable());
    }

    #[test]
    fn test_unrecognized_errors_default_to_transient() {
        let opaque = anyhow::anyhow!("connection pool poisoned");
        assert!(classify_fetch_error(&opaque).is_retryable());
    }

    #[test]
    fn test_exhausted_transient_gets_the_sweep_marker() {
        // Both paths that give up on a transient job, the sweep and the
        // worker's own attempt bound, store the same marker prefix.
        let failure = JobFailure::Transient("upstream request failed: timeout".into());
        let message = terminal_failure_message(&failure);
        assert!(message.starts_with("transient retry limit exhausted"));
        assert!(message.contains("timeout"));
    }

    #[test]
    fn test_permanent_failure_message_is_unchanged() {
        let failure = JobFailure::Permanent("not found: match xyz".into());
        assert_eq!(
            terminal_failure_message(&failure),
            failure.operator_message()
        );

        let invariant = JobFailure::Invariant("market signal 1.2 is outside [0,1]".into());
        assert_eq!(
            terminal_failure_message(&invariant),
            invariant.operator_message()
        );
    }

    // =========================================================================
    // Pick Resolution
    // =========================================================================

    #[test]
    fn test_picked_winner_names() {
        let details = details();
        assert_eq!(picked_winner(Pick::Home, &details), "Alpha");
        assert_eq!(picked_winner(Pick::Away, &details), "Bravo");
        assert_eq!(picked_winner(Pick::Draw, &details), "Draw");
    }

    #[test]
    fn test_pass_summary_default_is_zeroed() {
        let summary = PassSummary::default();
        assert_eq!(summary.completed, 0);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.deferred, 0);
        assert_eq!(summary.sweep, SweepSummary::default());
    }
}
