//! Database layer for the fulfillment platform
//!
//! Wraps the PostgreSQL pool used by every primary store and classifies
//! `sqlx` failures so callers can tell a constraint violation (a caller
//! error) from an unreachable or mismatched database (a reason to degrade).
//!
//! # Example
//!
//! ```rust,no_run
//! use database_layer::{DatabaseConfig, DatabasePool};
//!
//! # async fn run() -> Result<(), database_layer::DatabaseError> {
//! let config = DatabaseConfig::new("postgresql://localhost/fulfillment");
//! // Lazy pools never touch the network until the first query
//! let db = DatabasePool::connect_lazy(&config)?;
//! if !db.is_healthy().await {
//!     tracing::warn!("primary store is down; fallback stores will answer");
//! }
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;

pub use connection::*;
pub use error::*;

use std::time::Duration;

/// Database configuration structure
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Connection string
    pub connection_string: String,
    pub max_connections: u32,
    /// How long a query waits for a pooled connection before failing
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            max_connections: 20,
            acquire_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}
