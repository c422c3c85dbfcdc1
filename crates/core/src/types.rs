//! Domain types shared across the pipeline.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single bookmaker price for one outcome of an event.
///
/// Decimal odds are strictly greater than 1.0; quotes are immutable once
/// recorded and superseded by newer quotes for the same
/// (bookmaker, event, outcome) key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsQuote {
    pub bookmaker: String,
    pub event_id: String,
    pub outcome: String,
    pub price: Decimal,
    pub observed_at: DateTime<Utc>,
}

impl OddsQuote {
    /// Creates a quote, rejecting prices at or below even money's floor.
    ///
    /// Decimal odds encode `payout = stake * price`, so a price <= 1.0
    /// would imply a guaranteed loss and is always bad upstream data.
    #[must_use]
    pub fn new(
        bookmaker: impl Into<String>,
        event_id: impl Into<String>,
        outcome: impl Into<String>,
        price: Decimal,
        observed_at: DateTime<Utc>,
    ) -> Option<Self> {
        if price <= Decimal::ONE {
            return None;
        }
        Some(Self {
            bookmaker: bookmaker.into(),
            event_id: event_id.into(),
            outcome: outcome.into(),
            price,
            observed_at,
        })
    }

    /// Implied probability encoded by this price, `1 / price`.
    #[must_use]
    pub fn implied_probability(&self) -> Decimal {
        Decimal::ONE / self.price
    }
}

/// Upcoming match metadata from the market-data collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDetails {
    pub match_id: String,
    pub sport_key: String,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: DateTime<Utc>,
}

/// Final result of a match from the results collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchWinner {
    Home,
    Away,
    Draw,
}

impl MatchWinner {
    /// Resolves the winner's display name against the match teams.
    #[must_use]
    pub fn display_name(&self, details: &MatchDetails) -> String {
        match self {
            Self::Home => details.home_team.clone(),
            Self::Away => details.away_team.clone(),
            Self::Draw => "Draw".to_string(),
        }
    }

    /// Determines the winner from a final score.
    #[must_use]
    pub fn from_scores(home_score: i32, away_score: i32) -> Self {
        match home_score.cmp(&away_score) {
            std::cmp::Ordering::Greater => Self::Home,
            std::cmp::Ordering::Less => Self::Away,
            std::cmp::Ordering::Equal => Self::Draw,
        }
    }
}

/// Settled outcome for a match, as reported by the results collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub match_id: String,
    pub winner: MatchWinner,
    pub home_score: i32,
    pub away_score: i32,
    pub completed_at: DateTime<Utc>,
}
