//! Prediction synthesis.
//!
//! Blends three independently normalized signals for one match (the
//! market-implied probability of a home win, a historical-performance
//! score and a sentiment score) into a single confidence score with a
//! pick and a risk band. The blend is a fixed weighted sum
//! (0.5 market / 0.3 historical / 0.2 sentiment by default); all the
//! interesting policy lives in the bands around it.

use odds_oracle_core::SynthesizerConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

// =============================================================================
// Inputs
// =============================================================================

/// The three normalized signals for one match, all in [0,1] and all
/// oriented toward the home side (1.0 = home strongly favored).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalSet {
    pub market: f64,
    pub historical: f64,
    pub sentiment: f64,
}

impl SignalSet {
    #[must_use]
    pub fn new(market: f64, historical: f64, sentiment: f64) -> Self {
        Self {
            market,
            historical,
            sentiment,
        }
    }

    /// Population variance across the three signals; the synthesizer's
    /// disagreement measure.
    #[must_use]
    pub fn variance(&self) -> f64 {
        let values = [self.market, self.historical, self.sentiment];
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
    }

    fn validate(&self) -> Result<(), SignalError> {
        for (name, value) in [
            ("market", self.market),
            ("historical", self.historical),
            ("sentiment", self.sentiment),
        ] {
            if !(0.0..=1.0).contains(&value) || value.is_nan() {
                return Err(SignalError::OutOfRange {
                    signal: name,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Contract violations on synthesizer input.
///
/// Signals outside [0,1] mean a collaborator's normalization is broken;
/// clamping would hide that, so we fail loudly instead.
#[derive(Error, Debug, PartialEq)]
pub enum SignalError {
    #[error("{signal} signal {value} is outside [0,1]; upstream normalization is broken")]
    OutOfRange { signal: &'static str, value: f64 },

    #[error("synthesizer weights sum to {sum}, expected 1.0")]
    BadWeights { sum: f64 },
}

// =============================================================================
// Outputs
// =============================================================================

/// The side a prediction favors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pick {
    Home,
    Away,
    /// Confidence landed inside the epsilon band around 0.5; calling a
    /// near-tie for either side would be overconfident.
    Draw,
}

impl Pick {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Away => "away",
            Self::Draw => "draw",
        }
    }
}

impl std::fmt::Display for Pick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Risk band for a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown risk level: {other}")),
        }
    }
}

/// A synthesized prediction for one match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub pick: Pick,
    /// Blended confidence in a home win, clamped to [0,1].
    pub confidence_score: f64,
    pub risk_level: RiskLevel,
}

// =============================================================================
// Synthesizer
// =============================================================================

/// Scores signal sets against a fixed weight/band configuration.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    config: SynthesizerConfig,
}

impl Synthesizer {
    /// Creates a synthesizer, validating that the weights sum to one.
    ///
    /// # Errors
    /// Returns [`SignalError::BadWeights`] for a config whose weights do
    /// not sum to 1 within floating-point tolerance.
    pub fn new(config: SynthesizerConfig) -> Result<Self, SignalError> {
        let sum = config.market_weight + config.historical_weight + config.sentiment_weight;
        if (sum - 1.0).abs() > 1e-9 {
            return Err(SignalError::BadWeights { sum });
        }
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &SynthesizerConfig {
        &self.config
    }

    /// Synthesizes a prediction from one match's signals.
    ///
    /// # Errors
    /// Returns [`SignalError::OutOfRange`] when any signal leaves [0,1];
    /// inputs are a caller contract and are never clamped silently.
    pub fn synthesize(&self, signals: SignalSet) -> Result<Prediction, SignalError> {
        signals.validate()?;

        let confidence = (self.config.market_weight * signals.market
            + self.config.historical_weight * signals.historical
            + self.config.sentiment_weight * signals.sentiment)
            .clamp(0.0, 1.0);

        let pick = if confidence > 0.5 + self.config.draw_epsilon {
            Pick::Home
        } else if confidence < 0.5 - self.config.draw_epsilon {
            Pick::Away
        } else {
            Pick::Draw
        };

        let variance = signals.variance();
        let risk_level = if variance > self.config.disagreement_threshold {
            RiskLevel::High
        } else if confidence >= 0.5 + self.config.outer_band
            || confidence <= 0.5 - self.config.outer_band
        {
            RiskLevel::Low
        } else {
            RiskLevel::Medium
        };

        debug!(
            market = signals.market,
            historical = signals.historical,
            sentiment = signals.sentiment,
            confidence,
            variance,
            pick = %pick,
            risk = %risk_level,
            "Synthesized prediction"
        );

        Ok(Prediction {
            pick,
            confidence_score: confidence,
            risk_level,
        })
    }
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self {
            config: SynthesizerConfig::default(),
        }
    }
}
