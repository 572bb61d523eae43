//! Axum router assembly.

use axum::extract::State;
use axum::http::{HeaderName, Method, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use sensorhub_app::ports::{HealthProbe, ReadingStore};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests API routes under `/api` and serves `/health` at the root.
/// Includes a [`TraceLayer`] that logs each HTTP request/response at the
/// `DEBUG` level, and a permissive [`CorsLayer`] for browser dashboards.
pub fn build<S, H>(state: AppState<S, H>) -> Router
where
    S: ReadingStore + Send + Sync + 'static,
    H: HealthProbe + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check::<S, H>))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
}

/// `GET /health`: 200 when the store answers, 503 otherwise.
async fn health_check<S, H>(State(state): State<AppState<S, H>>) -> impl IntoResponse
where
    S: ReadingStore + Send + Sync + 'static,
    H: HealthProbe + Send + Sync + 'static,
{
    let report = state.health_probe.health().await;
    let status = if report.is_up() {
        StatusCode::OK
    } else {
        tracing::warn!(message = %report.message, "health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}
