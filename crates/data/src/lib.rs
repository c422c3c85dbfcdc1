//! Postgres storage for the analysis pipeline.
//!
//! This crate provides:
//! - Database client and idempotent schema creation
//! - Models for the `analysis_jobs` and `prediction_history` tables
//! - Repositories with the atomic claim/transition protocol the
//!   overlapping worker invocations rely on

pub mod database;
pub mod models;
pub mod repositories;
pub mod schema;

pub use database::DatabaseClient;
pub use models::{JobRecord, JobStatus, NewPrediction, PredictionRecord, PredictionStatus};
pub use repositories::{
    JobQueueRepository, PredictionRepository, PredictionStats, QueueError, SweepSummary,
};
