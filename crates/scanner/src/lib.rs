//! Multi-bookmaker arbitrage detection.
//!
//! Pure functions over [`odds_oracle_core::OddsQuote`] sets: reduce to
//! the best price per outcome, sum implied probabilities, report an
//! [`ArbitrageOpportunity`] when the sum drops below one. Detection
//! only; nothing here places orders.

pub mod scanner;

pub use scanner::{best_prices, scan, scan_events, ArbitrageOpportunity, BestPrice};
