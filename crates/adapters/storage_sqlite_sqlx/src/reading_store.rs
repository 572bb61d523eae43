//! `SQLite` implementation of [`ReadingStore`] and [`HealthProbe`].

use std::time::Duration;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use sensorhub_app::ports::{HealthProbe, HealthReport, PoolStats, ReadingStore};
use sensorhub_domain::aggregate::Aggregate;
use sensorhub_domain::error::SensorHubError;
use sensorhub_domain::reading::Reading;
use sensorhub_domain::time::{Timestamp, parse_rfc3339, to_sortable_rfc3339};

use crate::error::StorageError;

/// Wrapper for converting database rows into domain types without polluting
/// domain structs with database concerns.
struct Wrapper(Reading);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let timestamp_str: String = row.try_get("timestamp")?;
        let timestamp = parse_rfc3339(&timestamp_str).map_err(|_| {
            sqlx::Error::Decode(Box::new(StorageError::Timestamp(timestamp_str.clone())))
        })?;

        Ok(Self(Reading {
            device_id: row.try_get("device_id")?,
            humidity: row.try_get("humidity")?,
            temperature: row.try_get("temperature")?,
            timestamp,
        }))
    }
}

const CREATE_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS readings (
        device_id   TEXT NOT NULL,
        humidity    REAL NOT NULL,
        temperature REAL NOT NULL,
        timestamp   TEXT NOT NULL
    )
";

const CREATE_INDEX: &str = r"
    CREATE INDEX IF NOT EXISTS idx_readings_device_timestamp
    ON readings (device_id, timestamp)
";

const INSERT: &str = r"
    INSERT INTO readings (device_id, humidity, temperature, timestamp)
    VALUES (?, ?, ?, ?)
";

const SELECT_LATEST_PER_DEVICE: &str = r"
    SELECT device_id, humidity, temperature, timestamp FROM (
        SELECT device_id, humidity, temperature, timestamp,
               ROW_NUMBER() OVER (
                   PARTITION BY device_id
                   ORDER BY timestamp DESC, rowid DESC
               ) AS row_num
        FROM readings
    )
    WHERE row_num = 1
    ORDER BY device_id ASC
";

const SELECT_IN_RANGE: &str = r"
    SELECT device_id, humidity, temperature, timestamp FROM readings
    WHERE device_id = ? AND timestamp >= ? AND timestamp <= ?
    ORDER BY timestamp ASC, rowid ASC
";

const SELECT_AVERAGE_IN_RANGE: &str = r"
    SELECT AVG(humidity) AS average_humidity, AVG(temperature) AS average_temperature
    FROM readings
    WHERE device_id = ? AND timestamp >= ? AND timestamp <= ?
";

const PING: &str = "SELECT 1";

const PING_TIMEOUT: Duration = Duration::from_secs(1);

/// `SQLite`-backed reading store.
///
/// Cloning is cheap: clones share the same connection pool.
#[derive(Clone)]
pub struct SqliteReadingStore {
    pool: SqlitePool,
}

impl SqliteReadingStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn pool_stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: u32::try_from(self.pool.num_idle()).unwrap_or(u32::MAX),
            max_connections: self.pool.options().get_max_connections(),
        }
    }
}

impl ReadingStore for SqliteReadingStore {
    async fn ensure_schema(&self) -> Result<(), SensorHubError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        sqlx::query(CREATE_INDEX)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        tracing::debug!("readings schema ensured");
        Ok(())
    }

    async fn insert(&self, reading: Reading) -> Result<Reading, SensorHubError> {
        sqlx::query(INSERT)
            .bind(&reading.device_id)
            .bind(reading.humidity)
            .bind(reading.temperature)
            .bind(to_sortable_rfc3339(reading.timestamp))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(reading)
    }

    async fn latest_per_device(&self) -> Result<Vec<Reading>, SensorHubError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_LATEST_PER_DEVICE)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn history(
        &self,
        device_id: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<Reading>, SensorHubError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_IN_RANGE)
            .bind(device_id)
            .bind(to_sortable_rfc3339(start))
            .bind(to_sortable_rfc3339(end))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn average(
        &self,
        device_id: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Aggregate, SensorHubError> {
        let row = sqlx::query(SELECT_AVERAGE_IN_RANGE)
            .bind(device_id)
            .bind(to_sortable_rfc3339(start))
            .bind(to_sortable_rfc3339(end))
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::from)?;

        let humidity: Option<f64> = row
            .try_get("average_humidity")
            .map_err(StorageError::from)?;
        let temperature: Option<f64> = row
            .try_get("average_temperature")
            .map_err(StorageError::from)?;

        Ok(Aggregate::from_means(humidity, temperature))
    }
}

impl HealthProbe for SqliteReadingStore {
    async fn health(&self) -> HealthReport {
        let ping = tokio::time::timeout(PING_TIMEOUT, sqlx::query(PING).execute(&self.pool)).await;
        match ping {
            Ok(Ok(_)) => HealthReport::up(self.pool_stats()),
            Ok(Err(err)) => {
                tracing::error!(error = %err, "health check failed");
                HealthReport::down(self.pool_stats(), err)
            }
            Err(_) => {
                tracing::error!("health check timed out");
                HealthReport::down(self.pool_stats(), "ping timed out")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;
    use chrono::{Duration, Utc};

    async fn setup() -> SqliteReadingStore {
        let store = Config::new("sqlite::memory:")
            .build()
            .await
            .unwrap()
            .reading_store();
        store.ensure_schema().await.unwrap();
        store
    }

    fn reading(device_id: &str, timestamp: Timestamp, humidity: f64, temperature: f64) -> Reading {
        Reading {
            device_id: device_id.to_string(),
            humidity,
            temperature,
            timestamp,
        }
    }

    fn at(value: &str) -> Timestamp {
        parse_rfc3339(value).unwrap()
    }

    #[tokio::test]
    async fn should_ensure_schema_repeatedly_without_error() {
        let store = setup().await;
        store.ensure_schema().await.unwrap();
        store.ensure_schema().await.unwrap();
    }

    #[tokio::test]
    async fn should_ensure_schema_concurrently_without_error() {
        let store = setup().await;
        let (a, b, c) = tokio::join!(
            store.ensure_schema(),
            store.ensure_schema(),
            store.ensure_schema()
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();
    }

    #[tokio::test]
    async fn should_insert_and_return_latest_when_single_reading() {
        let store = setup().await;
        let r = reading("d1", at("2024-01-01T00:00:00Z"), 55.2, 21.0);

        store.insert(r.clone()).await.unwrap();
        let latest = store.latest_per_device().await.unwrap();

        assert_eq!(latest, vec![r]);
    }

    #[tokio::test]
    async fn should_return_one_entry_per_device_with_max_timestamp() {
        let store = setup().await;
        let base = Utc::now();

        // Inserted out of chronological order on purpose.
        store.insert(reading("d1", base + Duration::hours(2), 3.0, 3.0)).await.unwrap();
        store.insert(reading("d1", base, 1.0, 1.0)).await.unwrap();
        store.insert(reading("d2", base, 10.0, 10.0)).await.unwrap();
        store.insert(reading("d1", base + Duration::hours(1), 2.0, 2.0)).await.unwrap();

        let latest = store.latest_per_device().await.unwrap();

        assert_eq!(latest.len(), 2);
        let d1 = latest.iter().find(|r| r.device_id == "d1").unwrap();
        assert_eq!(d1.humidity, 3.0);
        assert_eq!(d1.timestamp, base + Duration::hours(2));
        let d2 = latest.iter().find(|r| r.device_id == "d2").unwrap();
        assert_eq!(d2.humidity, 10.0);
    }

    #[tokio::test]
    async fn should_prefer_last_inserted_when_timestamps_tie() {
        let store = setup().await;
        let ts = at("2024-01-01T00:00:00Z");
        store.insert(reading("d1", ts, 1.0, 1.0)).await.unwrap();
        store.insert(reading("d1", ts, 2.0, 2.0)).await.unwrap();

        let latest = store.latest_per_device().await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].humidity, 2.0);
    }

    #[tokio::test]
    async fn should_return_empty_latest_when_table_empty() {
        let store = setup().await;
        assert!(store.latest_per_device().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_include_readings_on_window_boundaries() {
        let store = setup().await;
        let t0 = at("2024-01-01T00:00:00Z");
        let t1 = at("2024-01-01T01:00:00Z");

        store.insert(reading("d1", t0 - Duration::nanoseconds(1), 1.0, 1.0)).await.unwrap();
        store.insert(reading("d1", t0, 2.0, 2.0)).await.unwrap();
        store.insert(reading("d1", t0 + Duration::minutes(30), 3.0, 3.0)).await.unwrap();
        store.insert(reading("d1", t1, 4.0, 4.0)).await.unwrap();
        store.insert(reading("d1", t1 + Duration::nanoseconds(1), 5.0, 5.0)).await.unwrap();

        let history = store.history("d1", t0, t1).await.unwrap();

        let humidities: Vec<f64> = history.iter().map(|r| r.humidity).collect();
        assert_eq!(humidities, vec![2.0, 3.0, 4.0]);
    }

    #[tokio::test]
    async fn should_order_history_by_timestamp_ascending() {
        let store = setup().await;
        let base = at("2024-06-01T12:00:00Z");
        store.insert(reading("d1", base + Duration::hours(2), 3.0, 3.0)).await.unwrap();
        store.insert(reading("d1", base, 1.0, 1.0)).await.unwrap();
        store.insert(reading("d1", base + Duration::hours(1), 2.0, 2.0)).await.unwrap();

        let history = store
            .history("d1", base, base + Duration::hours(2))
            .await
            .unwrap();

        let timestamps: Vec<Timestamp> = history.iter().map(|r| r.timestamp).collect();
        assert_eq!(
            timestamps,
            vec![base, base + Duration::hours(1), base + Duration::hours(2)]
        );
    }

    #[tokio::test]
    async fn should_filter_history_by_device_id() {
        let store = setup().await;
        let ts = at("2024-01-01T00:00:00Z");
        store.insert(reading("d1", ts, 1.0, 1.0)).await.unwrap();
        store.insert(reading("d2", ts, 2.0, 2.0)).await.unwrap();

        let history = store.history("d2", ts, ts).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].device_id, "d2");
    }

    #[tokio::test]
    async fn should_compare_timestamps_chronologically_across_offsets() {
        let store = setup().await;
        // 23:30 at -02:00 is 01:30Z the next day.
        store
            .insert(reading("d1", at("2024-01-01T23:30:00-02:00"), 1.0, 1.0))
            .await
            .unwrap();

        let history = store
            .history("d1", at("2024-01-02T01:00:00Z"), at("2024-01-02T02:00:00Z"))
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn should_average_and_round_to_two_decimals() {
        let store = setup().await;
        let t0 = at("2024-01-01T00:00:00Z");
        let t1 = at("2024-01-01T00:10:00Z");
        store.insert(reading("d1", t0, 55.123, 21.005)).await.unwrap();
        store.insert(reading("d1", t1, 60.0, 22.0)).await.unwrap();

        let avg = store.average("d1", t0, t1).await.unwrap();

        assert_eq!(avg.average_humidity, Some(57.56));
        assert_eq!(avg.average_temperature, Some(21.5));
    }

    #[tokio::test]
    async fn should_round_half_hundredth_average_up() {
        let store = setup().await;
        let t0 = at("2024-01-01T00:00:00Z");
        let t1 = at("2024-01-01T00:10:00Z");
        store.insert(reading("d1", t0, 1.0, 20.0)).await.unwrap();
        store.insert(reading("d1", t1, 1.01, 21.75)).await.unwrap();

        let avg = store.average("d1", t0, t1).await.unwrap();

        assert_eq!(avg.average_humidity, Some(1.01));
        assert_eq!(avg.average_temperature, Some(20.88));
    }

    #[tokio::test]
    async fn should_return_no_data_aggregate_when_window_empty() {
        let store = setup().await;
        store
            .insert(reading("d1", at("2024-01-01T00:00:00Z"), 1.0, 1.0))
            .await
            .unwrap();

        let avg = store
            .average("d1", at("2025-01-01T00:00:00Z"), at("2025-01-02T00:00:00Z"))
            .await
            .unwrap();

        assert!(avg.is_empty());
        assert_eq!(avg, Aggregate::empty());
    }

    #[tokio::test]
    async fn should_keep_every_concurrent_insert_for_same_device() {
        let store = setup().await;
        let base = at("2024-01-01T00:00:00Z");
        let producers = 16_i64;

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..producers {
            let store = store.clone();
            tasks.spawn(async move {
                store
                    .insert(reading("d1", base + Duration::seconds(i), 40.0, 20.0))
                    .await
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        let history = store
            .history("d1", base, base + Duration::seconds(producers))
            .await
            .unwrap();
        assert_eq!(history.len(), 16);
    }

    #[tokio::test]
    async fn should_report_up_when_pool_is_reachable() {
        let store = setup().await;
        let report = store.health().await;
        assert!(report.is_up());
        assert!(report.pool.max_connections >= 1);
    }

    #[tokio::test]
    async fn should_report_down_when_pool_is_closed() {
        let store = setup().await;
        store.pool.close().await;
        let report = store.health().await;
        assert!(!report.is_up());
        assert!(report.message.starts_with("db down:"));
    }

    #[tokio::test]
    async fn should_surface_storage_error_when_pool_is_closed() {
        let store = setup().await;
        store.pool.close().await;
        let result = store
            .insert(reading("d1", at("2024-01-01T00:00:00Z"), 1.0, 1.0))
            .await;
        assert!(matches!(result, Err(SensorHubError::Storage(_))));
    }
}
