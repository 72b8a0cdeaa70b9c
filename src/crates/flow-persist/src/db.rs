//! Database connection management
//!
//! Thin wrapper around the SQLite pool shared by every component.

use crate::config::DatabaseConfig;
use crate::error::PersistResult;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;
use tracing::{debug, info};

/// Type alias for the database connection pool
pub type DatabasePool = SqlitePool;

/// Database connection wrapper
#[derive(Clone, Debug)]
pub struct Database {
    pool: Arc<DatabasePool>,
}

impl Database {
    /// Connect with the default pool size
    ///
    /// # Arguments
    /// * `database_url` - SQLite connection string (e.g., "sqlite:flow.db?mode=rwc")
    pub async fn new(database_url: &str) -> PersistResult<Self> {
        Self::with_max_connections(database_url, 5).await
    }

    /// Connect with a custom pool size
    pub async fn with_max_connections(database_url: &str, max_connections: u32) -> PersistResult<Self> {
        debug!(url = %database_url, max_connections, "Connecting to database");

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Database connection established");
        Ok(Self::from_pool(pool))
    }

    /// Connect using the `[database]` section of the configuration
    pub async fn from_config(config: &DatabaseConfig) -> PersistResult<Self> {
        Self::with_max_connections(&config.url, config.max_connections).await
    }

    /// Private in-memory database
    ///
    /// Every SQLite connection to `:memory:` opens its own database, so the
    /// pool is pinned to one connection that is never recycled.
    pub async fn in_memory() -> PersistResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: DatabasePool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Perform a health check by running a simple query
    pub async fn health_check(&self) -> PersistResult<()> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }

    /// Close the connection pool
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection closed");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}
