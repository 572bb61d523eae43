//! # sensorhub-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `ReadingStore`: append readings and run the three read queries
//!   - `HealthProbe`: report store reachability and pool statistics
//! - Define **driving/inbound** use-cases:
//!   - `IngestionHandler`: decode, validate, and persist inbound messages
//!   - `QueryService`: parse caller parameters and run read queries
//! - Orchestrate domain objects without knowing *how* persistence or IO works
//!
//! ## Dependency rule
//! Depends on `sensorhub-domain` only (plus `tokio::sync`/`tokio::time`).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod ports;
pub mod services;
