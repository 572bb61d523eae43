//! Reading store port: append-only persistence for telemetry readings.

use std::future::Future;
use std::sync::Arc;

use sensorhub_domain::aggregate::Aggregate;
use sensorhub_domain::error::SensorHubError;
use sensorhub_domain::reading::Reading;
use sensorhub_domain::time::Timestamp;

/// Durable, append-only store of [`Reading`]s.
///
/// Implementations own the backing table exclusively. There is no update or
/// delete: concurrent writers only ever append, so no application-level
/// locking is required.
pub trait ReadingStore {
    /// Create the backing table if it does not exist.
    ///
    /// Must be idempotent and safe to call concurrently.
    fn ensure_schema(&self) -> impl Future<Output = Result<(), SensorHubError>> + Send;

    /// Append one reading.
    fn insert(
        &self,
        reading: Reading,
    ) -> impl Future<Output = Result<Reading, SensorHubError>> + Send;

    /// For each distinct device, the reading with the greatest timestamp.
    ///
    /// Exactly equal timestamps resolve to the most recently inserted row.
    fn latest_per_device(
        &self,
    ) -> impl Future<Output = Result<Vec<Reading>, SensorHubError>> + Send;

    /// All readings for `device_id` with `start <= timestamp <= end`,
    /// oldest first.
    fn history(
        &self,
        device_id: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> impl Future<Output = Result<Vec<Reading>, SensorHubError>> + Send;

    /// Rounded averages for `device_id` over `start <= timestamp <= end`.
    ///
    /// An empty window yields [`Aggregate::empty`].
    fn average(
        &self,
        device_id: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> impl Future<Output = Result<Aggregate, SensorHubError>> + Send;
}

impl<T: ReadingStore + Send + Sync> ReadingStore for Arc<T> {
    fn ensure_schema(&self) -> impl Future<Output = Result<(), SensorHubError>> + Send {
        (**self).ensure_schema()
    }

    fn insert(
        &self,
        reading: Reading,
    ) -> impl Future<Output = Result<Reading, SensorHubError>> + Send {
        (**self).insert(reading)
    }

    fn latest_per_device(
        &self,
    ) -> impl Future<Output = Result<Vec<Reading>, SensorHubError>> + Send {
        (**self).latest_per_device()
    }

    fn history(
        &self,
        device_id: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> impl Future<Output = Result<Vec<Reading>, SensorHubError>> + Send {
        (**self).history(device_id, start, end)
    }

    fn average(
        &self,
        device_id: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> impl Future<Output = Result<Aggregate, SensorHubError>> + Send {
        (**self).average(device_id, start, end)
    }
}
