//! Signal assembly for one analysis job.
//!
//! All upstream reads go through per-category TTL caches so that a batch
//! of jobs over the same fixture list hits each rate-limited feed once.
//! Provider errors pass through the cache untouched and are classified
//! by the worker afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use odds_oracle_cache::{CacheStats, TtlCache};
use odds_oracle_core::{
    CacheConfig, HistoricalContextProvider, MarketDataProvider, MatchDetails, OddsQuote,
    ProviderError, SentimentProvider,
};
use odds_oracle_scanner::BestPrice;

// =============================================================================
// Pure Signal Derivation
// =============================================================================

/// Market-implied probability of a home win, normalized over every
/// outcome with a posted price.
///
/// Works for two-way and three-way markets alike: the bookmaker vig
/// cancels out in the normalization. Returns `None` when either side
/// has no price yet.
#[must_use]
pub fn market_implied_home_probability(
    best: &HashMap<String, BestPrice>,
    home_team: &str,
    away_team: &str,
) -> Option<f64> {
    let home = best.get(home_team)?;
    best.get(away_team)?;

    let total: Decimal = best.values().map(|b| Decimal::ONE / b.price).sum();
    if total <= Decimal::ZERO {
        return None;
    }
    (Decimal::ONE / home.price / total).to_f64()
}

/// Folds a per-team score pair into a single home-oriented signal.
///
/// 0.5 means the sides are even; above favors home, below favors away.
#[must_use]
pub fn home_oriented_score(home: f64, away: f64) -> f64 {
    ((home + (1.0 - away)) / 2.0).clamp(0.0, 1.0)
}

// =============================================================================
// Cached Fetch Layer
// =============================================================================

/// Cache-fronted access to the upstream collaborators.
pub struct SignalFetcher {
    market: Arc<dyn MarketDataProvider>,
    historical: Arc<dyn HistoricalContextProvider>,
    sentiment: Arc<dyn SentimentProvider>,
    match_cache: TtlCache<MatchDetails>,
    quotes_cache: TtlCache<Vec<OddsQuote>>,
    score_cache: TtlCache<f64>,
    config: CacheConfig,
}

impl SignalFetcher {
    #[must_use]
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        historical: Arc<dyn HistoricalContextProvider>,
        sentiment: Arc<dyn SentimentProvider>,
        config: CacheConfig,
    ) -> Self {
        Self {
            market,
            historical,
            sentiment,
            match_cache: TtlCache::new(config.max_entries),
            quotes_cache: TtlCache::new(config.max_entries),
            score_cache: TtlCache::new(config.max_entries),
            config,
        }
    }

    /// Match metadata. Unknown ids surface as
    /// [`ProviderError::NotFound`] instead of being cached.
    ///
    /// # Errors
    /// Propagates the underlying provider error.
    pub async fn match_details(&self, match_id: &str) -> Result<MatchDetails> {
        let key = format!("match:{match_id}");
        self.match_cache
            .get_or_fetch(&key, self.ttl(self.config.quotes_ttl_secs), || async move {
                let details = self.market.fetch_match(match_id).await?;
                details.ok_or_else(|| {
                    ProviderError::NotFound(format!("match {match_id} unknown upstream")).into()
                })
            })
            .await
    }

    /// Current bookmaker quotes for a match.
    ///
    /// # Errors
    /// Propagates the underlying provider error.
    pub async fn quotes(&self, match_id: &str) -> Result<Vec<OddsQuote>> {
        let key = format!("quotes:{match_id}");
        self.quotes_cache
            .get_or_fetch(&key, self.ttl(self.config.quotes_ttl_secs), || async move {
                Ok(self.market.fetch_quotes(match_id).await?)
            })
            .await
    }

    /// Historical-performance score for a team. Cached longest: past
    /// results do not move intraday.
    ///
    /// # Errors
    /// Propagates the underlying provider error.
    pub async fn historical_score(&self, team: &str) -> Result<f64> {
        let key = format!("hist:{team}");
        self.score_cache
            .get_or_fetch(&key, self.ttl(self.config.historical_ttl_secs), || async move {
                Ok(self.historical.historical_score(team).await?)
            })
            .await
    }

    /// Sentiment score for a team.
    ///
    /// # Errors
    /// Propagates the underlying provider error.
    pub async fn sentiment_score(&self, team: &str) -> Result<f64> {
        let key = format!("sent:{team}");
        self.score_cache
            .get_or_fetch(&key, self.ttl(self.config.sentiment_ttl_secs), || async move {
                Ok(self.sentiment.sentiment_score(team).await?)
            })
            .await
    }

    /// Combined hit/miss counters across all three caches.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        let a = self.match_cache.stats();
        let b = self.quotes_cache.stats();
        let c = self.score_cache.stats();
        CacheStats {
            hits: a.hits + b.hits + c.hits,
            misses: a.misses + b.misses + c.misses,
            evictions: a.evictions + b.evictions + c.evictions,
        }
    }

    fn ttl(&self, secs: u64) -> Duration {
        Duration::seconds(secs.min(i64::MAX as u64) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use odds_oracle_scanner::best_prices;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // =========================================================================
    // Mock Providers
    // =========================================================================

    struct MockMarket {
        match_calls: AtomicUsize,
        quote_calls: AtomicUsize,
        quotes: Vec<OddsQuote>,
    }

    impl MockMarket {
        fn with_quotes(quotes: Vec<OddsQuote>) -> Self {
            Self {
                match_calls: AtomicUsize::new(0),
                quote_calls: AtomicUsize::new(0),
                quotes,
            }
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockMarket {
        async fn fetch_match(
            &self,
            match_id: &str,
        ) -> Result<Option<MatchDetails>, ProviderError> {
            self.match_calls.fetch_add(1, Ordering::SeqCst);
            if match_id == "missing" {
                return Ok(None);
            }
            Ok(Some(MatchDetails {
                match_id: match_id.to_string(),
                sport_key: "soccer_epl".to_string(),
                home_team: "Alpha".to_string(),
                away_team: "Bravo".to_string(),
                commence_time: Utc::now(),
            }))
        }

        async fn fetch_quotes(&self, _match_id: &str) -> Result<Vec<OddsQuote>, ProviderError> {
            self.quote_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.quotes.clone())
        }
    }

    struct MockScores {
        calls: AtomicUsize,
        score: f64,
    }

    #[async_trait]
    impl HistoricalContextProvider for MockScores {
        async fn historical_score(&self, _team: &str) -> Result<f64, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.score)
        }
    }

    #[async_trait]
    impl SentimentProvider for MockScores {
        async fn sentiment_score(&self, _team: &str) -> Result<f64, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.score)
        }
    }

    fn quote(outcome: &str, price: Decimal) -> OddsQuote {
        OddsQuote::new("book", "m-1", outcome, price, Utc::now()).unwrap()
    }

    fn fetcher(market: Arc<MockMarket>) -> SignalFetcher {
        SignalFetcher::new(
            market,
            Arc::new(MockScores {
                calls: AtomicUsize::new(0),
                score: 0.6,
            }),
            Arc::new(MockScores {
                calls: AtomicUsize::new(0),
                score: 0.4,
            }),
            CacheConfig::default(),
        )
    }

    // =========================================================================
    // Market Probability
    // =========================================================================

    #[test]
    fn test_even_two_way_market_is_half() {
        let best = best_prices(&[quote("Alpha", dec!(2.0)), quote("Bravo", dec!(2.0))]);
        let p = market_implied_home_probability(&best, "Alpha", "Bravo").unwrap();
        assert!((p - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_three_way_market_normalizes_over_draw() {
        // 1/2 + 1/4 + 1/4 = 1.0, home share = 0.5.
        let best = best_prices(&[
            quote("Alpha", dec!(2.0)),
            quote("Bravo", dec!(4.0)),
            quote("Draw", dec!(4.0)),
        ]);
        let p = market_implied_home_probability(&best, "Alpha", "Bravo").unwrap();
        assert!((p - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_vig_cancels_in_normalization() {
        // Overround market: 1/1.8 + 1/1.8 > 1, but the home share is
        // still exactly one half.
        let best = best_prices(&[quote("Alpha", dec!(1.8)), quote("Bravo", dec!(1.8))]);
        let p = market_implied_home_probability(&best, "Alpha", "Bravo").unwrap();
        assert!((p - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_missing_side_yields_none() {
        let best = best_prices(&[quote("Alpha", dec!(2.0))]);
        assert!(market_implied_home_probability(&best, "Alpha", "Bravo").is_none());
    }

    #[test]
    fn test_home_oriented_score() {
        assert!((home_oriented_score(0.5, 0.5) - 0.5).abs() < 1e-9);
        assert!((home_oriented_score(0.8, 0.2) - 0.8).abs() < 1e-9);
        assert!(home_oriented_score(1.0, 0.0) <= 1.0);
    }

    // =========================================================================
    // Cached Fetches
    // =========================================================================

    #[tokio::test]
    async fn test_repeated_quote_reads_hit_upstream_once() {
        let market = Arc::new(MockMarket::with_quotes(vec![quote("Alpha", dec!(2.1))]));
        let signals = fetcher(Arc::clone(&market));

        signals.quotes("m-1").await.unwrap();
        signals.quotes("m-1").await.unwrap();
        signals.quotes("m-1").await.unwrap();

        assert_eq!(market.quote_calls.load(Ordering::SeqCst), 1);
        assert_eq!(signals.cache_stats().hits, 2);
    }

    #[tokio::test]
    async fn test_unknown_match_is_not_cached() {
        let market = Arc::new(MockMarket::with_quotes(Vec::new()));
        let signals = fetcher(Arc::clone(&market));

        for _ in 0..2 {
            let err = signals.match_details("missing").await.unwrap_err();
            let provider = err.downcast_ref::<ProviderError>().unwrap();
            assert!(matches!(provider, ProviderError::NotFound(_)));
        }
        // Negative lookups must retry upstream every time.
        assert_eq!(market.match_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_score_categories_use_distinct_keys() {
        let market = Arc::new(MockMarket::with_quotes(Vec::new()));
        let signals = fetcher(market);

        let hist = signals.historical_score("Alpha").await.unwrap();
        let sent = signals.sentiment_score("Alpha").await.unwrap();
        assert!((hist - 0.6).abs() < 1e-9);
        assert!((sent - 0.4).abs() < 1e-9);
    }
}
