use anyhow::Result;
use odds_oracle_core::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::schema;

/// Shared Postgres connection pool for all repositories.
pub struct DatabaseClient {
    pool: PgPool,
}

impl DatabaseClient {
    /// Creates a new database client connected to the configured `PostgreSQL` database.
    ///
    /// # Errors
    /// Returns an error if the database connection cannot be established.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        Ok(Self { pool })
    }

    /// Applies the schema (idempotent).
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        schema::ensure_schema(&self.pool).await
    }

    /// Returns a clone of the underlying pool for repository construction.
    #[must_use]
    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }
}
