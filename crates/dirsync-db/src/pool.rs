//! Connection pool wrapper.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::DbError;

/// Default maximum connections when none is configured.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct DbPool {
    inner: PgPool,
}

impl DbPool {
    /// Connect with the default pool size.
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        Self::connect_with(database_url, DEFAULT_MAX_CONNECTIONS).await
    }

    /// Connect with an explicit pool size.
    pub async fn connect_with(database_url: &str, max_connections: u32) -> Result<Self, DbError> {
        let inner = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(DbError::ConnectionFailed)?;

        tracing::info!(max_connections, "Database pool connected");
        Ok(Self { inner })
    }

    /// The underlying `sqlx` pool.
    pub fn inner(&self) -> &PgPool {
        &self.inner
    }

    /// Close every connection.
    pub async fn close(&self) {
        self.inner.close().await;
    }
}
