//! # sensorhub-domain
//!
//! Pure domain model for the sensorhub telemetry pipeline.
//!
//! ## Responsibilities
//! - Foundational types: error conventions, timestamps
//! - Define **Readings** (one humidity/temperature sample from a device)
//! - Define **Aggregates** (rounded averages over a device and time window)
//! - Decode inbound payloads and enforce the acceptance predicate
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod time;

pub mod aggregate;
pub mod reading;
