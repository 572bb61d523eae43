//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`SensorHubError`] via `#[from]` so that port boundaries carry a single
//! error type.

/// Top-level error crossing port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum SensorHubError {
    /// An inbound payload could not be decoded into a reading.
    #[error("decode error")]
    Decode(#[from] DecodeError),

    /// A well-formed reading failed the acceptance predicate.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// Query parameters supplied by a caller were malformed.
    #[error("invalid client input")]
    ClientInput(#[from] ClientInputError),

    /// The backing store could not complete the operation.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The operation was aborted before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// The operation did not complete within its deadline.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Failure to turn a raw payload into a [`Reading`](crate::reading::Reading).
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The payload was not valid JSON for a reading (including a missing
    /// or malformed `timestamp`).
    #[error("malformed reading payload")]
    Json(#[from] serde_json::Error),
}

/// Reasons a decoded reading is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("device_id must not be empty")]
    EmptyDeviceId,

    #[error("humidity must be non-zero")]
    ZeroHumidity,

    #[error("temperature must be non-zero")]
    ZeroTemperature,

    #[error("timestamp must be set")]
    UnsetTimestamp,
}

/// Malformed query parameters, reported before any storage access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientInputError {
    #[error("missing required parameter `{0}`")]
    MissingParameter(&'static str),

    #[error("invalid {field} date format: {value}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("start must not be after end")]
    InvertedRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_validation_error_into_top_level_error() {
        let err: SensorHubError = ValidationError::EmptyDeviceId.into();
        assert!(matches!(
            err,
            SensorHubError::Validation(ValidationError::EmptyDeviceId)
        ));
    }

    #[test]
    fn should_describe_invalid_timestamp_with_field_and_value() {
        let err = ClientInputError::InvalidTimestamp {
            field: "start",
            value: "yesterday".to_string(),
        };
        assert_eq!(err.to_string(), "invalid start date format: yesterday");
    }

    #[test]
    fn should_expose_source_of_storage_error() {
        let io = std::io::Error::other("disk gone");
        let err = SensorHubError::Storage(Box::new(io));
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "disk gone");
    }
}
