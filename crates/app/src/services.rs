//! Application services: use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod ingestion;
pub mod query;

use std::future::Future;
use std::time::Duration;

use sensorhub_domain::error::SensorHubError;

/// Default bound on a single storage call issued by a service.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a storage call, failing with [`SensorHubError::DeadlineExceeded`] if
/// it does not finish within `limit`.
///
/// The inner future is dropped on expiry, which cancels the call.
pub(crate) async fn with_deadline<T, F>(limit: Duration, fut: F) -> Result<T, SensorHubError>
where
    F: Future<Output = Result<T, SensorHubError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| SensorHubError::DeadlineExceeded)?
}
