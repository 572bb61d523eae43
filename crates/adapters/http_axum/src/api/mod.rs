//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod readings;

use axum::Router;
use axum::routing::get;

use sensorhub_app::ports::{HealthProbe, ReadingStore};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<S, H>() -> Router<AppState<S, H>>
where
    S: ReadingStore + Send + Sync + 'static,
    H: HealthProbe + Send + Sync + 'static,
{
    Router::new()
        .route("/data/latest", get(readings::latest::<S, H>))
        .route("/data/history", get(readings::history::<S, H>))
        .route("/data/average", get(readings::average::<S, H>))
}
