//! Storage-specific error type wrapping sqlx errors.

use sensorhub_domain::error::SensorHubError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// A stored timestamp could not be parsed back.
    #[error("corrupt timestamp in row: {0}")]
    Timestamp(String),
}

impl From<StorageError> for SensorHubError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
