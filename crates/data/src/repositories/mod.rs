//! Typed repositories over the shared connection pool.

pub mod job_repo;
pub mod prediction_repo;

pub use job_repo::{JobQueueRepository, QueueError, SweepSummary};
pub use prediction_repo::{PredictionRepository, PredictionStats};
