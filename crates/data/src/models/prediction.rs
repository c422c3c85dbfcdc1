//! Prediction history model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resolution state of a stored prediction.
///
/// Moves from `pending` to `correct`/`incorrect` exactly once, and only
/// after the match's commence time plus the settlement buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionStatus {
    Pending,
    Correct,
    Incorrect,
}

impl PredictionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Correct => "correct",
            Self::Incorrect => "incorrect",
        }
    }
}

impl std::fmt::Display for PredictionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PredictionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "correct" => Ok(Self::Correct),
            "incorrect" => Ok(Self::Incorrect),
            other => Err(format!("unknown prediction status: {other}")),
        }
    }
}

/// A row from the `prediction_history` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PredictionRecord {
    pub id: i64,
    pub user_id: i64,
    pub match_id: String,
    pub sport_key: String,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: DateTime<Utc>,
    /// Team display name, or "Draw" for a no-pick.
    pub predicted_winner: String,
    pub confidence_score: f64,
    pub risk_level: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl PredictionRecord {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == PredictionStatus::Pending.as_str()
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !self.is_pending()
    }

    /// Earliest instant at which this prediction may be reconciled.
    #[must_use]
    pub fn settles_after(&self, buffer: chrono::Duration) -> DateTime<Utc> {
        self.commence_time + buffer
    }
}

/// Fields for inserting a fresh prediction. The row id, pending status
/// and creation timestamp come from the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrediction {
    pub user_id: i64,
    pub match_id: String,
    pub sport_key: String,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: DateTime<Utc>,
    pub predicted_winner: String,
    pub confidence_score: f64,
    pub risk_level: String,
}
