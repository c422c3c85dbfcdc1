//! Analysis job model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an analysis job.
///
/// Transitions only ever move forward (pending, processing, then
/// completed or failed), except for the stale-sweep path, which returns
/// a presumed-crashed job from processing to pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns true if the status is terminal (no further transitions).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// A row from the `analysis_jobs` table.
///
/// Jobs are never deleted; completed and failed rows stay behind for
/// audit and history.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobRecord {
    pub id: i64,
    pub user_id: i64,
    pub match_id: String,
    pub status: String,
    pub error_message: Option<String>,
    /// Times this job has been reclaimed from a presumed-crashed worker.
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Parses the stored status string.
    ///
    /// # Errors
    /// Returns an error for a status value outside the known set, which
    /// means the row was written by something other than the queue.
    pub fn job_status(&self) -> Result<JobStatus, String> {
        self.status.parse()
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == JobStatus::Pending.as_str()
    }

    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.status == JobStatus::Processing.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            let parsed: JobStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("queued".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn test_record_status_helpers() {
        let record = JobRecord {
            id: 1,
            user_id: 42,
            match_id: "m-1".to_string(),
            status: "pending".to_string(),
            error_message: None,
            attempts: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(record.is_pending());
        assert!(!record.is_processing());
        assert_eq!(record.job_status().unwrap(), JobStatus::Pending);
    }
}
