//! Collaborator interfaces consumed by the worker and reconciler.
//!
//! The concrete HTTP clients behind these traits (odds feed, historical
//! lookup, sentiment scraper, results feed) live outside this workspace's
//! scope; the pipeline only ever sees these narrow seams.

use crate::error::ProviderError;
use crate::types::{MatchDetails, MatchOutcome, OddsQuote};
use async_trait::async_trait;

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetches metadata for a match; `None` when the id is unknown.
    async fn fetch_match(&self, match_id: &str) -> Result<Option<MatchDetails>, ProviderError>;

    /// Fetches all current bookmaker quotes for a match.
    async fn fetch_quotes(&self, match_id: &str) -> Result<Vec<OddsQuote>, ProviderError>;
}

#[async_trait]
pub trait HistoricalContextProvider: Send + Sync {
    /// Normalized historical-performance score in [0,1] for a team.
    async fn historical_score(&self, team: &str) -> Result<f64, ProviderError>;
}

#[async_trait]
pub trait SentimentProvider: Send + Sync {
    /// Normalized sentiment score in [0,1] for a team
    /// (positive-minus-negative, rescaled).
    async fn sentiment_score(&self, team: &str) -> Result<f64, ProviderError>;
}

#[async_trait]
pub trait MatchResultsProvider: Send + Sync {
    /// Final outcome for a match, or `None` if not yet available.
    async fn fetch_outcome(&self, match_id: &str) -> Result<Option<MatchOutcome>, ProviderError>;
}
