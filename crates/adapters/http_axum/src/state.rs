//! Shared application state for axum handlers.

use std::sync::Arc;

use sensorhub_app::ports::{HealthProbe, ReadingStore};
use sensorhub_app::services::query::QueryService;

/// Application state shared across all axum handlers.
///
/// Generic over the reading store and the health probe to avoid dynamic
/// dispatch. `Clone` is implemented manually so the underlying types do not
/// need to be `Clone`; only the `Arc` wrappers are cloned.
pub struct AppState<S, H> {
    /// Read-only query service.
    pub query_service: Arc<QueryService<S>>,
    /// Store reachability probe for `/health`.
    pub health_probe: Arc<H>,
}

impl<S, H> Clone for AppState<S, H> {
    fn clone(&self) -> Self {
        Self {
            query_service: Arc::clone(&self.query_service),
            health_probe: Arc::clone(&self.health_probe),
        }
    }
}

impl<S, H> AppState<S, H>
where
    S: ReadingStore + Send + Sync + 'static,
    H: HealthProbe + Send + Sync + 'static,
{
    /// Create a new application state from service instances.
    pub fn new(query_service: QueryService<S>, health_probe: H) -> Self {
        Self {
            query_service: Arc::new(query_service),
            health_probe: Arc::new(health_probe),
        }
    }
}
