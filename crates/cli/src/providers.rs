//! Fixture-backed collaborator providers.
//!
//! The real odds feed, historical lookup, sentiment scraper, and results
//! feed are external HTTP services wired in at deployment. For local
//! runs and demos the same four seams are served from one JSON fixture
//! bundle instead, so every pipeline path can be exercised end to end
//! without network access.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use odds_oracle_core::{
    HistoricalContextProvider, MarketDataProvider, MatchDetails, MatchOutcome, MatchResultsProvider,
    MatchWinner, OddsQuote, ProviderError, SentimentProvider,
};

#[derive(Debug, Clone, Deserialize)]
struct QuoteFixture {
    bookmaker: String,
    outcome: String,
    /// Decimal odds as a string, e.g. "2.20".
    price: Decimal,
    observed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
struct MatchFixture {
    match_id: String,
    sport_key: String,
    home_team: String,
    away_team: String,
    commence_time: DateTime<Utc>,
    #[serde(default)]
    quotes: Vec<QuoteFixture>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct TeamScores {
    historical: f64,
    sentiment: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct OutcomeFixture {
    match_id: String,
    home_score: i32,
    away_score: i32,
    completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
struct FixtureBundle {
    #[serde(default)]
    matches: Vec<MatchFixture>,
    #[serde(default)]
    teams: HashMap<String, TeamScores>,
    #[serde(default)]
    outcomes: Vec<OutcomeFixture>,
}

/// All four collaborator seams served from one fixture bundle.
pub struct FixtureProviders {
    bundle: FixtureBundle,
}

impl FixtureProviders {
    /// Loads a bundle from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture bundle {}", path.display()))?;
        let bundle: FixtureBundle = serde_json::from_str(&raw)
            .with_context(|| format!("parsing fixture bundle {}", path.display()))?;
        Ok(Arc::new(Self { bundle }))
    }

    #[cfg(test)]
    fn from_json(raw: &str) -> Result<Arc<Self>> {
        let bundle: FixtureBundle = serde_json::from_str(raw)?;
        Ok(Arc::new(Self { bundle }))
    }

    fn find_match(&self, match_id: &str) -> Option<&MatchFixture> {
        self.bundle.matches.iter().find(|m| m.match_id == match_id)
    }
}

#[async_trait]
impl MarketDataProvider for FixtureProviders {
    async fn fetch_match(&self, match_id: &str) -> Result<Option<MatchDetails>, ProviderError> {
        Ok(self.find_match(match_id).map(|m| MatchDetails {
            match_id: m.match_id.clone(),
            sport_key: m.sport_key.clone(),
            home_team: m.home_team.clone(),
            away_team: m.away_team.clone(),
            commence_time: m.commence_time,
        }))
    }

    async fn fetch_quotes(&self, match_id: &str) -> Result<Vec<OddsQuote>, ProviderError> {
        let fixture = self
            .find_match(match_id)
            .ok_or_else(|| ProviderError::NotFound(format!("match {match_id}")))?;

        let mut quotes = Vec::with_capacity(fixture.quotes.len());
        for q in &fixture.quotes {
            let observed_at = q.observed_at.unwrap_or_else(Utc::now);
            match OddsQuote::new(
                q.bookmaker.as_str(),
                match_id,
                q.outcome.as_str(),
                q.price,
                observed_at,
            ) {
                Some(quote) => quotes.push(quote),
                None => warn!(
                    match_id,
                    bookmaker = %q.bookmaker,
                    price = %q.price,
                    "Skipping fixture quote with invalid price"
                ),
            }
        }
        Ok(quotes)
    }
}

#[async_trait]
impl HistoricalContextProvider for FixtureProviders {
    async fn historical_score(&self, team: &str) -> Result<f64, ProviderError> {
        // Teams absent from the bundle score neutral rather than
        // failing the whole job.
        Ok(self.bundle.teams.get(team).map_or(0.5, |t| t.historical))
    }
}

#[async_trait]
impl SentimentProvider for FixtureProviders {
    async fn sentiment_score(&self, team: &str) -> Result<f64, ProviderError> {
        Ok(self.bundle.teams.get(team).map_or(0.5, |t| t.sentiment))
    }
}

#[async_trait]
impl MatchResultsProvider for FixtureProviders {
    async fn fetch_outcome(&self, match_id: &str) -> Result<Option<MatchOutcome>, ProviderError> {
        Ok(self
            .bundle
            .outcomes
            .iter()
            .find(|o| o.match_id == match_id)
            .map(|o| MatchOutcome {
                match_id: o.match_id.clone(),
                winner: MatchWinner::from_scores(o.home_score, o.away_score),
                home_score: o.home_score,
                away_score: o.away_score,
                completed_at: o.completed_at,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLE: &str = r#"{
        "matches": [{
            "match_id": "m-1",
            "sport_key": "soccer_epl",
            "home_team": "Alpha",
            "away_team": "Bravo",
            "commence_time": "2026-08-01T18:00:00Z",
            "quotes": [
                {"bookmaker": "bk1", "outcome": "Alpha", "price": "2.20"},
                {"bookmaker": "bk2", "outcome": "Bravo", "price": "2.30"},
                {"bookmaker": "bk1", "outcome": "Bad", "price": "0.90"}
            ]
        }],
        "teams": {
            "Alpha": {"historical": 0.7, "sentiment": 0.6}
        },
        "outcomes": [{
            "match_id": "m-1",
            "home_score": 2,
            "away_score": 1,
            "completed_at": "2026-08-01T20:00:00Z"
        }]
    }"#;

    #[tokio::test]
    async fn test_bundle_serves_all_four_seams() {
        let providers = FixtureProviders::from_json(BUNDLE).unwrap();

        let details = providers.fetch_match("m-1").await.unwrap().unwrap();
        assert_eq!(details.home_team, "Alpha");

        // The sub-1.0 price is dropped on load, not served.
        let quotes = providers.fetch_quotes("m-1").await.unwrap();
        assert_eq!(quotes.len(), 2);

        let hist = providers.historical_score("Alpha").await.unwrap();
        assert!((hist - 0.7).abs() < 1e-9);
        let neutral = providers.historical_score("Unknown").await.unwrap();
        assert!((neutral - 0.5).abs() < 1e-9);

        let outcome = providers.fetch_outcome("m-1").await.unwrap().unwrap();
        assert_eq!(outcome.winner, MatchWinner::Home);
    }

    #[tokio::test]
    async fn test_unknown_match_behaviors() {
        let providers = FixtureProviders::from_json(BUNDLE).unwrap();

        assert!(providers.fetch_match("nope").await.unwrap().is_none());
        assert!(matches!(
            providers.fetch_quotes("nope").await,
            Err(ProviderError::NotFound(_))
        ));
        assert!(providers.fetch_outcome("nope").await.unwrap().is_none());
    }
}
