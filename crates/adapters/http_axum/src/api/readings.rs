//! JSON REST handlers for stored readings.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use sensorhub_app::ports::{HealthProbe, ReadingStore};
use sensorhub_domain::aggregate::Aggregate;
use sensorhub_domain::reading::Reading;

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for the latest endpoint.
#[derive(Deserialize)]
pub struct LatestQuery {
    /// Narrow the result to one device.
    pub device_id: Option<String>,
}

/// Query parameters for the windowed endpoints.
///
/// Every field is required; a missing field is reported by the query
/// service rather than by the extractor so the error body stays uniform.
#[derive(Deserialize)]
pub struct WindowQuery {
    pub device_id: Option<String>,
    /// Start of the window (RFC 3339, inclusive).
    pub start: Option<String>,
    /// End of the window (RFC 3339, inclusive).
    pub end: Option<String>,
}

impl WindowQuery {
    fn parts(&self) -> (&str, &str, &str) {
        (
            self.device_id.as_deref().unwrap_or_default(),
            self.start.as_deref().unwrap_or_default(),
            self.end.as_deref().unwrap_or_default(),
        )
    }
}

/// Possible responses from the list endpoints.
pub enum ListResponse {
    /// 200 OK with a JSON array of readings.
    Ok(Json<Vec<Reading>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the average endpoint.
pub enum AverageResponse {
    Ok(Json<Aggregate>),
}

impl IntoResponse for AverageResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/data/latest?device_id=`
pub async fn latest<S, H>(
    State(state): State<AppState<S, H>>,
    Query(params): Query<LatestQuery>,
) -> Result<ListResponse, ApiError>
where
    S: ReadingStore + Send + Sync + 'static,
    H: HealthProbe + Send + Sync + 'static,
{
    let readings = state
        .query_service
        .latest(params.device_id.as_deref())
        .await?;
    Ok(ListResponse::Ok(Json(readings)))
}

/// `GET /api/data/history?device_id=&start=&end=`
pub async fn history<S, H>(
    State(state): State<AppState<S, H>>,
    Query(params): Query<WindowQuery>,
) -> Result<ListResponse, ApiError>
where
    S: ReadingStore + Send + Sync + 'static,
    H: HealthProbe + Send + Sync + 'static,
{
    let (device_id, start, end) = params.parts();
    let readings = state.query_service.history(device_id, start, end).await?;
    Ok(ListResponse::Ok(Json(readings)))
}

/// `GET /api/data/average?device_id=&start=&end=`
pub async fn average<S, H>(
    State(state): State<AppState<S, H>>,
    Query(params): Query<WindowQuery>,
) -> Result<AverageResponse, ApiError>
where
    S: ReadingStore + Send + Sync + 'static,
    H: HealthProbe + Send + Sync + 'static,
{
    let (device_id, start, end) = params.parts();
    let aggregate = state.query_service.average(device_id, start, end).await?;
    Ok(AverageResponse::Ok(Json(aggregate)))
}
