//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use sensorhub_domain::error::SensorHubError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`SensorHubError`] to an HTTP response with appropriate status code.
pub struct ApiError(SensorHubError);

impl From<SensorHubError> for ApiError {
    fn from(err: SensorHubError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match &self.0 {
            SensorHubError::ClientInput(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            SensorHubError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            SensorHubError::Decode(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            SensorHubError::DeadlineExceeded => (
                StatusCode::GATEWAY_TIMEOUT,
                "the database did not answer in time".to_string(),
            ),
            SensorHubError::Cancelled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "request cancelled".to_string(),
            ),
            SensorHubError::Storage(err) => {
                tracing::error!(error = %err, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
