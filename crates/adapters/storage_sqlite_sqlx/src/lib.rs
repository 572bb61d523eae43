//! # sensorhub-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `ReadingStore` and `HealthProbe` ports defined in
//!   `sensorhub-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Create the `readings` table idempotently at startup
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `sensorhub-app` (for port traits) and `sensorhub-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod error;
mod pool;
mod reading_store;

pub use error::StorageError;
pub use pool::{Config, Database};
pub use reading_store::SqliteReadingStore;
