//! Data models for persistent rows.

pub mod job;
pub mod prediction;

pub use job::{JobRecord, JobStatus};
pub use prediction::{NewPrediction, PredictionRecord, PredictionStatus};
