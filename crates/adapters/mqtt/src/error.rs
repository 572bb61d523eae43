//! MQTT adapter error types.

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// `start` was called on a subscriber that is already running.
    #[error("MQTT subscriber already started")]
    AlreadyStarted,

    /// The configured topic filter is empty.
    #[error("MQTT topic must not be empty")]
    EmptyTopic,

    /// The rumqttc client returned an error.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),
}
