//! MQTT subscriber configuration.

use std::time::Duration;

use rumqttc::{MqttOptions, QoS};
use serde::Deserialize;

/// Configuration for the MQTT telemetry subscriber.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Whether to connect to the broker at all.
    pub enabled: bool,
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Topic filter carrying telemetry payloads.
    pub topic: String,
    /// Subscription quality of service (0, 1 or 2).
    pub qos: u8,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Delay before the next connection attempt after an error, in seconds.
    pub reconnect_delay_secs: u16,
    /// Capacity of the queue between the broker connection and the
    /// ingestion consumer.
    pub queue_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "sensorhub".to_string(),
            topic: "sensors/telemetry".to_string(),
            qos: 1,
            keep_alive_secs: 30,
            reconnect_delay_secs: 5,
            queue_capacity: 256,
        }
    }
}

impl MqttConfig {
    /// Subscription QoS; values above 2 are clamped to exactly-once.
    #[must_use]
    pub fn qos(&self) -> QoS {
        match self.qos {
            0 => QoS::AtMostOnce,
            1 => QoS::AtLeastOnce,
            _ => QoS::ExactlyOnce,
        }
    }

    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(u64::from(self.reconnect_delay_secs))
    }

    /// Client options for `rumqttc`.
    #[must_use]
    pub fn mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.broker_host, self.broker_port);
        options.set_keep_alive(Duration::from_secs(u64::from(self.keep_alive_secs)));
        options
    }
}
