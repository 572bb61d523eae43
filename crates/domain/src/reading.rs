//! Reading: one telemetry sample reported by a device.

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, ValidationError};
use crate::time::{self, Timestamp};

/// A single humidity/temperature sample.
///
/// Readings are append-only: once persisted they are never updated or
/// deleted.
///
/// `device_id`, `humidity` and `temperature` decode to their zero value when
/// absent from a payload so that [`validate`](Self::validate) reports them;
/// a missing `timestamp` is a decode failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub humidity: f64,
    #[serde(default)]
    pub temperature: f64,
    pub timestamp: Timestamp,
}

impl Reading {
    /// Decode a JSON payload into a reading without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Json`] when the payload is not a JSON object of
    /// the expected shape or the `timestamp` is missing or not RFC 3339.
    pub fn from_json(payload: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Check the acceptance predicate.
    ///
    /// A reading of exactly `0.0` humidity or temperature is refused: zero is
    /// indistinguishable from an absent field in the wire format, so genuine
    /// zero readings are rejected too.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered, checked in field
    /// order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.device_id.is_empty() {
            return Err(ValidationError::EmptyDeviceId);
        }
        if self.humidity == 0.0 {
            return Err(ValidationError::ZeroHumidity);
        }
        if self.temperature == 0.0 {
            return Err(ValidationError::ZeroTemperature);
        }
        if time::is_unset(self.timestamp) {
            return Err(ValidationError::UnsetTimestamp);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_rfc3339;

    fn valid() -> Reading {
        Reading {
            device_id: "d1".to_string(),
            humidity: 55.2,
            temperature: 21.0,
            timestamp: parse_rfc3339("2024-01-01T00:00:00Z").unwrap(),
        }
    }

    #[test]
    fn should_decode_complete_payload() {
        let payload = br#"{"device_id":"d1","humidity":55.2,"temperature":21.0,"timestamp":"2024-01-01T00:00:00Z"}"#;
        let reading = Reading::from_json(payload).unwrap();
        assert_eq!(reading, valid());
    }

    #[test]
    fn should_fail_decoding_when_timestamp_missing() {
        let payload = br#"{"device_id":"d1","humidity":55.2,"temperature":21.0}"#;
        assert!(Reading::from_json(payload).is_err());
    }

    #[test]
    fn should_fail_decoding_when_timestamp_not_rfc3339() {
        let payload = br#"{"device_id":"d1","humidity":1,"temperature":1,"timestamp":"01/01/2024"}"#;
        assert!(Reading::from_json(payload).is_err());
    }

    #[test]
    fn should_fail_decoding_when_field_has_wrong_type() {
        let payload = br#"{"device_id":"d1","humidity":"wet","temperature":1,"timestamp":"2024-01-01T00:00:00Z"}"#;
        assert!(Reading::from_json(payload).is_err());
    }

    #[test]
    fn should_default_missing_measurements_to_zero() {
        let payload = br#"{"device_id":"d1","timestamp":"2024-01-01T00:00:00Z"}"#;
        let reading = Reading::from_json(payload).unwrap();
        assert_eq!(reading.humidity, 0.0);
        assert_eq!(reading.validate(), Err(ValidationError::ZeroHumidity));
    }

    #[test]
    fn should_accept_valid_reading() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn should_accept_negative_temperature() {
        let mut reading = valid();
        reading.temperature = -12.5;
        assert!(reading.validate().is_ok());
    }

    #[test]
    fn should_reject_empty_device_id() {
        let mut reading = valid();
        reading.device_id = String::new();
        assert_eq!(reading.validate(), Err(ValidationError::EmptyDeviceId));
    }

    #[test]
    fn should_reject_zero_temperature() {
        let mut reading = valid();
        reading.temperature = 0.0;
        assert_eq!(reading.validate(), Err(ValidationError::ZeroTemperature));
    }

    #[test]
    fn should_reject_unset_timestamp() {
        let mut reading = valid();
        reading.timestamp = parse_rfc3339("0001-01-01T00:00:00Z").unwrap();
        assert_eq!(reading.validate(), Err(ValidationError::UnsetTimestamp));
    }

    #[test]
    fn should_serialize_with_wire_field_names() {
        let json = serde_json::to_value(valid()).unwrap();
        assert_eq!(json["device_id"], "d1");
        assert_eq!(json["humidity"], 55.2);
        assert_eq!(json["temperature"], 21.0);
        assert_eq!(json["timestamp"], "2024-01-01T00:00:00Z");
    }
}
