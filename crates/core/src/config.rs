use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub worker: WorkerConfig,
    pub reconciler: ReconcilerConfig,
    pub cache: CacheConfig,
    pub synthesizer: SynthesizerConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Batch-pass settings for the analysis worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Jobs stuck in `processing` longer than this are presumed crashed.
    pub stale_timeout_secs: u64,
    /// Wall-clock budget for a single worker pass.
    pub pass_budget_secs: u64,
    /// Time budget for one job's external fetches and derivation.
    pub job_budget_secs: u64,
    /// Transient failures allowed before a job is marked failed for good.
    pub max_attempts: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Grace period after `commence_time` before outcomes are queried.
    pub settlement_buffer_secs: u64,
}

/// Per-category TTLs for the upstream cache, plus a size bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub quotes_ttl_secs: u64,
    pub sentiment_ttl_secs: u64,
    pub historical_ttl_secs: u64,
    pub max_entries: usize,
}

/// Scoring weights and bands for the prediction synthesizer.
///
/// Weights must sum to 1; the synthesizer rejects configs that don't.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizerConfig {
    pub market_weight: f64,
    pub historical_weight: f64,
    pub sentiment_weight: f64,
    /// Half-width of the no-pick band around 0.5.
    pub draw_epsilon: f64,
    /// Confidence at or beyond 0.5 +/- this distance is low risk.
    pub outer_band: f64,
    /// Signal variance above this is high risk regardless of score.
    pub disagreement_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// User ids allowed to perform administrative operations.
    pub admin_user_ids: Vec<i64>,
    /// Shared secret admins must present alongside their id.
    pub admin_secret: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/odds_oracle".to_string(),
                max_connections: 10,
            },
            worker: WorkerConfig::default(),
            reconciler: ReconcilerConfig::default(),
            cache: CacheConfig::default(),
            synthesizer: SynthesizerConfig::default(),
            admin: AdminConfig {
                admin_user_ids: Vec::new(),
                admin_secret: String::new(),
            },
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            stale_timeout_secs: 600,
            pass_budget_secs: 120,
            job_budget_secs: 30,
            max_attempts: 3,
        }
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        // Three hours: long enough for most matches to finish and the
        // results feed to publish a final score.
        Self {
            settlement_buffer_secs: 3 * 3600,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            quotes_ttl_secs: 600,
            sentiment_ttl_secs: 1800,
            historical_ttl_secs: 86400,
            max_entries: 1024,
        }
    }
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            market_weight: 0.5,
            historical_weight: 0.3,
            sentiment_weight: 0.2,
            draw_epsilon: 0.02,
            outer_band: 0.15,
            disagreement_threshold: 0.01,
        }
    }
}
