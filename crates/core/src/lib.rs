pub mod auth;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod traits;
pub mod types;

pub use auth::{authorize_admin, AdminDecision};
pub use config::{
    AdminConfig, AppConfig, CacheConfig, DatabaseConfig, ReconcilerConfig, SynthesizerConfig,
    WorkerConfig,
};
pub use config_loader::{ConfigHandle, ConfigLoader};
pub use error::{JobFailure, ProviderError};
pub use traits::{
    HistoricalContextProvider, MarketDataProvider, MatchResultsProvider, SentimentProvider,
};
pub use types::{MatchDetails, MatchOutcome, MatchWinner, OddsQuote};
