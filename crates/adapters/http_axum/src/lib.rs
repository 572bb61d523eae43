//! # sensorhub-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a small read-only **JSON API** over stored telemetry
//!   (`/api/data/latest`, `/api/data/history`, `/api/data/average`)
//! - Serve `/health` with store reachability and pool statistics
//! - Map query-string parameters into [`QueryService`] calls (driving adapter)
//! - Map application errors into HTTP status codes and `{"error": ...}` bodies
//!
//! ## Dependency rule
//! Depends on `sensorhub-app` (for port traits and services) and
//! `sensorhub-domain` (for domain types used in response mapping). Never leaks
//! axum types into the domain.
//!
//! [`QueryService`]: sensorhub_app::services::query::QueryService

pub mod api;
pub mod error;
pub mod router;
pub mod state;
