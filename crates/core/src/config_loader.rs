//! Configuration loading and explicit reload.
//!
//! Settings are read once into an immutable [`AppConfig`] snapshot and
//! handed to components at construction. There are no ambient mutable
//! globals: processes that want fresh settings call
//! [`ConfigHandle::reload`] and rebuild from the returned snapshot.

use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Json, Toml},
    Figment,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads application configuration by merging TOML, environment variables, and JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> Result<AppConfig> {
        Self::load_from("config/Config.toml")
    }

    /// Loads configuration from a specific TOML file path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_from(path: &str) -> Result<AppConfig> {
        let config: AppConfig = Figment::from(figment::providers::Serialized::defaults(
            AppConfig::default(),
        ))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ORACLE_").split("__"))
        .join(Json::file("config/Config.json"))
        .extract()?;

        Ok(config)
    }
}

/// Shared, reloadable configuration snapshot.
///
/// `current()` is cheap (Arc clone); `reload()` re-reads the sources and
/// swaps the snapshot, returning the new value so callers can observe
/// what changed.
pub struct ConfigHandle {
    path: String,
    inner: RwLock<Arc<AppConfig>>,
}

impl ConfigHandle {
    /// Loads the initial snapshot from `path`.
    ///
    /// # Errors
    /// Returns an error if the initial load fails.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let config = ConfigLoader::load_from(&path)?;
        Ok(Self {
            path,
            inner: RwLock::new(Arc::new(config)),
        })
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<AppConfig> {
        self.inner.read().clone()
    }

    /// Re-reads configuration sources and swaps in a new snapshot.
    ///
    /// # Errors
    /// Returns an error if the reload fails; the previous snapshot stays
    /// in effect.
    pub fn reload(&self) -> Result<Arc<AppConfig>> {
        let fresh = Arc::new(ConfigLoader::load_from(&self.path)?);
        *self.inner.write() = fresh.clone();
        info!(path = %self.path, "Configuration reloaded");
        Ok(fresh)
    }
}
