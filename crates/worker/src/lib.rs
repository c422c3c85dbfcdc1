//! Scheduled batch passes over the analysis pipeline.
//!
//! Two entry points, both designed for overlapping cron-style
//! invocations against the shared queue:
//! - [`AnalysisWorker::run_pass`] drains pending jobs into predictions
//! - [`ResultsReconciler::run_pass`] grades predictions against results

pub mod reconciler;
pub mod signals;
pub mod worker;

pub use reconciler::{ReconcileSummary, ResultsReconciler};
pub use signals::{home_oriented_score, market_implied_home_probability, SignalFetcher};
pub use worker::{AnalysisWorker, PassSummary};
