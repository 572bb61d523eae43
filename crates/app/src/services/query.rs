//! Query service: turns caller-supplied parameters into typed store reads.

use std::time::Duration;

use sensorhub_domain::aggregate::Aggregate;
use sensorhub_domain::error::{ClientInputError, SensorHubError};
use sensorhub_domain::reading::Reading;
use sensorhub_domain::time::{self, Timestamp};

use super::{DEFAULT_STORE_TIMEOUT, with_deadline};
use crate::ports::ReadingStore;

/// A validated `(device_id, [start, end])` window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub device_id: String,
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeWindow {
    /// Parse raw request parameters.
    ///
    /// Empty strings are treated as missing.
    ///
    /// # Errors
    ///
    /// Returns [`ClientInputError`] when a parameter is missing, a timestamp
    /// is not RFC 3339, or `start` is after `end`.
    pub fn parse(device_id: &str, start: &str, end: &str) -> Result<Self, ClientInputError> {
        if device_id.is_empty() {
            return Err(ClientInputError::MissingParameter("device_id"));
        }
        let start = parse_bound("start", start)?;
        let end = parse_bound("end", end)?;
        if start > end {
            return Err(ClientInputError::InvertedRange);
        }
        Ok(Self {
            device_id: device_id.to_owned(),
            start,
            end,
        })
    }
}

fn parse_bound(field: &'static str, value: &str) -> Result<Timestamp, ClientInputError> {
    if value.is_empty() {
        return Err(ClientInputError::MissingParameter(field));
    }
    time::parse_rfc3339(value).map_err(|_| ClientInputError::InvalidTimestamp {
        field,
        value: value.to_owned(),
    })
}

/// Read-only façade over a [`ReadingStore`].
pub struct QueryService<S> {
    store: S,
    timeout: Duration,
}

impl<S: ReadingStore + Send + Sync> QueryService<S> {
    /// Create a new service backed by the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Bound each store call by `timeout` instead of the default.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Latest reading per device, optionally narrowed to one device.
    ///
    /// # Errors
    ///
    /// Returns a storage error from the store, or
    /// [`SensorHubError::DeadlineExceeded`] if it does not answer in time.
    pub async fn latest(&self, device_id: Option<&str>) -> Result<Vec<Reading>, SensorHubError> {
        let mut readings = with_deadline(self.timeout, self.store.latest_per_device()).await?;
        if let Some(device_id) = device_id.filter(|id| !id.is_empty()) {
            readings.retain(|reading| reading.device_id == device_id);
        }
        Ok(readings)
    }

    /// Readings for a device inside a closed time window.
    ///
    /// # Errors
    ///
    /// Returns [`SensorHubError::ClientInput`] for malformed parameters
    /// (before touching the store), otherwise a storage or deadline error.
    pub async fn history(
        &self,
        device_id: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<Reading>, SensorHubError> {
        let window = TimeWindow::parse(device_id, start, end)?;
        with_deadline(
            self.timeout,
            self.store
                .history(&window.device_id, window.start, window.end),
        )
        .await
    }

    /// Rounded averages for a device inside a closed time window.
    ///
    /// # Errors
    ///
    /// Returns [`SensorHubError::ClientInput`] for malformed parameters
    /// (before touching the store), otherwise a storage or deadline error.
    pub async fn average(
        &self,
        device_id: &str,
        start: &str,
        end: &str,
    ) -> Result<Aggregate, SensorHubError> {
        let window = TimeWindow::parse(device_id, start, end)?;
        with_deadline(
            self.timeout,
            self.store
                .average(&window.device_id, window.start, window.end),
        )
        .await
    }
}
