//! Prediction synthesis from normalized market, historical and sentiment
//! signals.
//!
//! The whole crate is a pure scoring function plus its policy constants:
//! no I/O, no clock, deterministic for a given [`SignalSet`] and config.

pub mod synthesizer;

pub use synthesizer::{Pick, Prediction, RiskLevel, SignalError, SignalSet, Synthesizer};
