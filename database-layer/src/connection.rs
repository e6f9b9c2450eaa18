// Database connection management
use crate::error::{DatabaseError, DatabaseResult};
use crate::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DatabasePool {
    pool: Arc<PgPool>,
}

impl DatabasePool {
    fn options(config: &DatabaseConfig) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
    }

    /// Create a pool and open its first connection immediately
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::ConnectionFailed`] when the database cannot be reached.
    pub async fn connect(config: &DatabaseConfig) -> DatabaseResult<Self> {
        let pool = Self::options(config)
            .connect(&config.connection_string)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        info!("Database connection pool created successfully");

        Ok(Self::from_pool(pool))
    }

    /// Create a pool that connects on first use, so the process can start
    /// while the database is down
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::ConfigurationError`] when the connection string is malformed.
    pub fn connect_lazy(config: &DatabaseConfig) -> DatabaseResult<Self> {
        let pool = Self::options(config)
            .connect_lazy(&config.connection_string)
            .map_err(|e| DatabaseError::ConfigurationError(e.to_string()))?;

        info!("Database connection pool configured (lazy)");

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Get the underlying PgPool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check if the pool is healthy
    pub async fn is_healthy(&self) -> bool {
        match sqlx::query("SELECT 1").fetch_one(self.pool.as_ref()).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Database health check failed: {}", e);
                false
            }
        }
    }

    /// Close the pool
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}

impl std::fmt::Debug for DatabasePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabasePool")
            .field("size", &self.pool.size())
            .field("closed", &self.pool.is_closed())
            .finish()
    }
}
