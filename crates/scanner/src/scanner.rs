//! Arbitrage detection over one event's bookmaker quotes.
//!
//! An arbitrage exists when the implied probabilities of the best
//! available price per outcome sum to less than one:
//!
//! ```text
//! Team A best: 2.20 @ BookX   implied 0.4545
//! Team B best: 2.30 @ BookY   implied 0.4348
//! sum = 0.8893 < 1  =>  margin 0.1107 (11.07% risk-free)
//! ```
//!
//! Detection is a pure max-reduction plus a sum; no state, no I/O. Stake
//! splitting proportional to implied probability makes the payout equal
//! across outcomes.

use chrono::{DateTime, Utc};
use odds_oracle_core::OddsQuote;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

// =============================================================================
// Best-Price Reduction
// =============================================================================

/// The best available price for one outcome across all bookmakers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestPrice {
    pub bookmaker: String,
    pub price: Decimal,
    pub observed_at: DateTime<Utc>,
}

/// Reduces quotes to the best (highest) price per outcome.
///
/// Ties on price are broken by recency: the most recently observed quote
/// wins, so the selection is deterministic for any input ordering.
#[must_use]
pub fn best_prices(quotes: &[OddsQuote]) -> HashMap<String, BestPrice> {
    let mut best: HashMap<String, BestPrice> = HashMap::new();

    for quote in quotes {
        let candidate = BestPrice {
            bookmaker: quote.bookmaker.clone(),
            price: quote.price,
            observed_at: quote.observed_at,
        };

        match best.get(&quote.outcome) {
            Some(current)
                if quote.price < current.price
                    || (quote.price == current.price
                        && quote.observed_at <= current.observed_at) => {}
            _ => {
                best.insert(quote.outcome.clone(), candidate);
            }
        }
    }

    best
}

// =============================================================================
// Arbitrage Opportunity
// =============================================================================

/// A detected pricing inefficiency for one event.
///
/// Computed transiently and reported; never persisted by the scanner
/// itself, and never acted on: this system detects, it does not trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    pub event_id: String,
    /// Best price per outcome backing the opportunity.
    pub best_prices: HashMap<String, BestPrice>,
    /// Sum of `1/price` across all outcomes; below one by definition.
    pub implied_probability_sum: Decimal,
    /// Guaranteed-profit fraction, `1 - implied_probability_sum`.
    pub margin: Decimal,
}

impl ArbitrageOpportunity {
    /// Margin as a percentage.
    #[must_use]
    pub fn profit_pct(&self) -> Decimal {
        self.margin * Decimal::from(100)
    }

    /// Splits `bankroll` across outcomes proportionally to implied
    /// probability, equalizing the payout whichever outcome lands.
    #[must_use]
    pub fn stake_allocation(&self, bankroll: Decimal) -> HashMap<String, Decimal> {
        self.best_prices
            .iter()
            .map(|(outcome, best)| {
                let implied = Decimal::ONE / best.price;
                (
                    outcome.clone(),
                    bankroll * implied / self.implied_probability_sum,
                )
            })
            .collect()
    }

    /// The payout received regardless of outcome when staking
    /// `bankroll` per [`Self::stake_allocation`].
    #[must_use]
    pub fn guaranteed_payout(&self, bankroll: Decimal) -> Decimal {
        if self.implied_probability_sum.is_zero() {
            return Decimal::ZERO;
        }
        bankroll / self.implied_probability_sum
    }
}

// =============================================================================
// Scanner
// =============================================================================

/// Scans one event's quotes for an arbitrage opportunity.
///
/// Returns `None` when no opportunity exists, and also when the event is
/// not evaluable: fewer than two distinct priced outcomes is a data gap,
/// not an error.
#[must_use]
pub fn scan(event_id: &str, quotes: &[OddsQuote]) -> Option<ArbitrageOpportunity> {
    let best = best_prices(quotes);

    if best.len() < 2 {
        return None;
    }

    let implied_sum: Decimal = best.values().map(|b| Decimal::ONE / b.price).sum();

    if implied_sum >= Decimal::ONE {
        return None;
    }

    let opportunity = ArbitrageOpportunity {
        event_id: event_id.to_string(),
        margin: Decimal::ONE - implied_sum,
        implied_probability_sum: implied_sum,
        best_prices: best,
    };

    info!(
        event_id,
        implied_sum = %opportunity.implied_probability_sum,
        margin_pct = %opportunity.profit_pct(),
        "Arbitrage opportunity detected"
    );

    Some(opportunity)
}

/// Scans a batch of events, returning opportunities sorted by margin
/// descending (best first).
#[must_use]
pub fn scan_events(events: &[(String, Vec<OddsQuote>)]) -> Vec<ArbitrageOpportunity> {
    let mut opportunities: Vec<ArbitrageOpportunity> = events
        .iter()
        .filter_map(|(event_id, quotes)| scan(event_id, quotes))
        .collect();

    opportunities.sort_by(|a, b| b.margin.cmp(&a.margin));
    opportunities
}
