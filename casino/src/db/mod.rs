//! Database module providing PostgreSQL connection pooling and the account
//! store seam used by the reconciler.
//!
//! The schema lives in `migrations/001_roulette_schema.sql` and is applied
//! with [`Database::apply_schema`].

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Idempotent schema for balances, rounds, bet history and daily stats
pub const SCHEMA: &str = include_str!("../../migrations/001_roulette_schema.sql");

pub mod config;
pub mod memory;
pub mod repository;
pub mod timeouts;

pub use config::DatabaseConfig;
pub use memory::{FailPoint, MemoryAccountStore};
pub use repository::{AccountStore, PgAccountStore, UnitOfWork};

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    transaction_timeout: Duration,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use casino::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), sqlx::Error> {
    ///     let config = DatabaseConfig::from_env();
    ///     let db = Database::new(&config).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self {
            pool,
            transaction_timeout: config.transaction_timeout(),
        })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Account store on top of this pool, bounded by the configured
    /// transaction timeout
    pub fn account_store(&self) -> PgAccountStore {
        PgAccountStore::with_timeout(self.pool.clone(), self.transaction_timeout)
    }

    /// Create any missing tables and indexes
    pub async fn apply_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if the database connection is healthy
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}
