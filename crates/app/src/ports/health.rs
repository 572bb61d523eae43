//! Health port: store reachability and connection pool statistics.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;

/// Whether the backing store answered the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Connection pool counters at probe time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Open connections (idle and in use).
    pub size: u32,
    /// Idle connections.
    pub idle: u32,
    /// Configured upper bound.
    pub max_connections: u32,
}

impl PoolStats {
    /// Connections currently checked out.
    #[must_use]
    pub fn in_use(&self) -> u32 {
        self.size.saturating_sub(self.idle)
    }

    /// Whether more than 80% of the allowed connections are checked out.
    #[must_use]
    pub fn is_heavily_loaded(&self) -> bool {
        self.max_connections > 0 && self.in_use() * 5 > self.max_connections * 4
    }
}

/// Result of a health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub message: String,
    pub pool: PoolStats,
}

impl HealthReport {
    /// Build a report for a store that answered, flagging heavy load.
    #[must_use]
    pub fn up(pool: PoolStats) -> Self {
        let message = if pool.is_heavily_loaded() {
            "The database is experiencing heavy load."
        } else {
            "It's healthy"
        };
        Self {
            status: HealthStatus::Up,
            message: message.to_string(),
            pool,
        }
    }

    /// Build a report for a store that failed the probe.
    #[must_use]
    pub fn down(pool: PoolStats, reason: impl std::fmt::Display) -> Self {
        Self {
            status: HealthStatus::Down,
            message: format!("db down: {reason}"),
            pool,
        }
    }

    #[must_use]
    pub fn is_up(&self) -> bool {
        self.status == HealthStatus::Up
    }
}

/// Reports whether the backing store is reachable.
pub trait HealthProbe {
    /// Ping the store within a short, implementation-defined timeout.
    ///
    /// Never fails: an unreachable store is reported as
    /// [`HealthStatus::Down`].
    fn health(&self) -> impl Future<Output = HealthReport> + Send;
}

impl<T: HealthProbe + Send + Sync> HealthProbe for Arc<T> {
    fn health(&self) -> impl Future<Output = HealthReport> + Send {
        (**self).health()
    }
}
