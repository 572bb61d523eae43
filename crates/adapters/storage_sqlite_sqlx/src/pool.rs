//! `SQLite` connection pool setup.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::StorageError;
use crate::reading_store::SqliteReadingStore;

/// Configuration for the `SQLite` storage adapter.
#[derive(Debug, Clone)]
pub struct Config {
    /// `SQLite` connection URL (e.g. `sqlite:sensorhub.db` or `sqlite::memory:`).
    pub database_url: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// How long a caller waits for a free connection before failing.
    pub acquire_timeout: Duration,
}

impl Config {
    /// Configuration with default pool sizing for `database_url`.
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
        }
    }

    /// Build a [`Database`] from this configuration.
    ///
    /// Creates the connection pool and the database file if missing. The
    /// schema is created separately through
    /// [`ReadingStore::ensure_schema`](sensorhub_app::ports::ReadingStore::ensure_schema).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the connection fails.
    pub async fn build(self) -> Result<Database, StorageError> {
        Database::initialize(&self).await
    }
}

/// Holds the `SQLite` connection pool and provides access to it.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the connection fails.
    async fn initialize(config: &Config) -> Result<Self, StorageError> {
        let options =
            SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?;

        tracing::info!(url = %config.database_url, "connected to database");

        Ok(Self { pool })
    }

    /// Borrow the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// A reading store sharing this database's pool.
    #[must_use]
    pub fn reading_store(&self) -> SqliteReadingStore {
        SqliteReadingStore::new(self.pool.clone())
    }

    /// Close every pooled connection, waiting for checked-out ones to return.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("disconnected from database");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensorhub_app::ports::ReadingStore;

    async fn table_names(db: &Database) -> Vec<String> {
        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .unwrap();
        tables.into_iter().map(|row| row.0).collect()
    }

    #[tokio::test]
    async fn should_create_pool_without_schema_when_using_memory_db() {
        let db = Config::new("sqlite::memory:").build().await.unwrap();
        assert!(table_names(&db).await.is_empty());
    }

    #[tokio::test]
    async fn should_create_schema_through_reading_store() {
        let db = Config::new("sqlite::memory:").build().await.unwrap();
        let store = db.reading_store();

        store.ensure_schema().await.unwrap();
        store.ensure_schema().await.unwrap();

        assert_eq!(table_names(&db).await, vec!["readings".to_string()]);
    }

    #[tokio::test]
    async fn should_fail_when_database_file_cannot_be_created() {
        let result = Config::new("sqlite:/nonexistent-sensorhub-dir/nested/sensorhub.db").build().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn should_reject_queries_after_close() {
        let db = Config::new("sqlite::memory:").build().await.unwrap();
        db.close().await;
        let result = sqlx::query("SELECT 1").execute(db.pool()).await;
        assert!(result.is_err());
    }
}
