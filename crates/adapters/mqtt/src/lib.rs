//! # sensorhub-adapter-mqtt
//!
//! MQTT adapter: subscribes to the telemetry topic and feeds every publish
//! into the ingestion queue.
//!
//! ## How it works
//! - A background task owns the `rumqttc` event loop.
//! - On every `ConnAck` (first connect and each reconnect) the task
//!   re-subscribes to the configured topic, since sessions are clean.
//! - Each incoming `Publish` is forwarded as an [`InboundMessage`] into a
//!   bounded `mpsc` queue. When the queue is full the event loop waits,
//!   pushing backpressure onto the broker connection.
//! - Connection errors are logged and retried after a fixed delay.
//!
//! ## Dependency rule
//! Depends on `sensorhub-app` only.

mod config;
mod error;

pub use config::MqttConfig;
pub use error::MqttError;

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Outgoing, Packet, Publish, QoS};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use sensorhub_app::services::ingestion::InboundMessage;

/// Capacity of the rumqttc request channel (subscribe/disconnect requests).
const REQUEST_CAPACITY: usize = 10;

/// Upper bound on flushing a disconnect or waiting for the loop to exit.
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Subscribes to one telemetry topic and forwards publishes to a queue.
pub struct MqttSubscriber {
    config: MqttConfig,
    stop_tx: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl MqttSubscriber {
    /// Create a subscriber; nothing connects until [`start`](Self::start).
    #[must_use]
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            stop_tx: None,
            handle: None,
        }
    }

    /// Whether the background event loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Spawn the event loop task, forwarding publishes into `queue`.
    ///
    /// Returns immediately; connecting happens in the background.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::AlreadyStarted`] if called twice, or
    /// [`MqttError::EmptyTopic`] if no topic is configured.
    pub fn start(&mut self, queue: mpsc::Sender<InboundMessage>) -> Result<(), MqttError> {
        if self.handle.is_some() {
            return Err(MqttError::AlreadyStarted);
        }
        if self.config.topic.is_empty() {
            return Err(MqttError::EmptyTopic);
        }

        let (client, eventloop) = AsyncClient::new(self.config.mqtt_options(), REQUEST_CAPACITY);
        let (stop_tx, stop_rx) = watch::channel(false);

        tracing::info!(
            broker = %self.config.broker_host,
            port = self.config.broker_port,
            topic = %self.config.topic,
            "starting MQTT subscriber"
        );

        let task = EventLoopTask {
            client,
            eventloop,
            topic: self.config.topic.clone(),
            qos: self.config.qos(),
            reconnect_delay: self.config.reconnect_delay(),
            queue,
        };
        self.handle = Some(tokio::spawn(task.run(stop_rx)));
        self.stop_tx = Some(stop_tx);
        Ok(())
    }

    /// Disconnect from the broker and stop the event loop.
    ///
    /// Dropping the loop also drops its queue sender, letting the ingestion
    /// consumer drain and exit.
    pub async fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        if let Some(mut handle) = self.handle.take() {
            if tokio::time::timeout(STOP_TIMEOUT, &mut handle).await.is_err() {
                handle.abort();
                tracing::debug!("MQTT event loop aborted");
            }
            tracing::info!("MQTT subscriber stopped");
        }
    }
}

struct EventLoopTask {
    client: AsyncClient,
    eventloop: EventLoop,
    topic: String,
    qos: QoS,
    reconnect_delay: Duration,
    queue: mpsc::Sender<InboundMessage>,
}

impl EventLoopTask {
    async fn run(mut self, mut stop_rx: watch::Receiver<bool>) {
        loop {
            let event = tokio::select! {
                event = self.eventloop.poll() => event,
                Ok(()) = stop_rx.changed() => break,
            };

            match event {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    tracing::info!(code = ?ack.code, "connected to MQTT broker");
                    match self.subscribe() {
                        Ok(()) => tracing::info!(topic = %self.topic, "subscribing"),
                        Err(err) => {
                            tracing::error!(topic = %self.topic, error = %err, "failed to subscribe");
                        }
                    }
                }
                Ok(Event::Incoming(Packet::SubAck(ack))) => {
                    tracing::debug!(codes = ?ack.return_codes, "subscription acknowledged");
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message = to_inbound(&publish);
                    tracing::debug!(topic = %message.topic, bytes = message.payload.len(), "message received");
                    if self.queue.send(message).await.is_err() {
                        tracing::info!("ingestion queue closed, stopping MQTT event loop");
                        break;
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "MQTT connection lost, reconnecting");
                    tokio::select! {
                        () = tokio::time::sleep(self.reconnect_delay) => {}
                        Ok(()) = stop_rx.changed() => break,
                    }
                }
            }
        }

        self.disconnect().await;
    }

    fn subscribe(&self) -> Result<(), MqttError> {
        self.client
            .try_subscribe(&self.topic, self.qos)
            .map_err(MqttError::Client)
    }

    /// Send DISCONNECT and poll until it is flushed, within [`STOP_TIMEOUT`].
    async fn disconnect(&mut self) {
        if let Err(err) = self.client.try_disconnect() {
            tracing::debug!(error = %err, "error disconnecting MQTT client");
            return;
        }
        let eventloop = &mut self.eventloop;
        let flush = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        if tokio::time::timeout(STOP_TIMEOUT, flush).await.is_err() {
            tracing::debug!("timed out flushing MQTT disconnect");
        }
    }
}

/// Copy a broker publish into an owned [`InboundMessage`].
fn to_inbound(publish: &Publish) -> InboundMessage {
    let topic = String::from_utf8_lossy(publish.topic.as_ref()).into_owned();
    InboundMessage::new(topic, publish.payload.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> MqttConfig {
        MqttConfig {
            broker_host: "127.0.0.1".to_string(),
            broker_port: 1,
            reconnect_delay_secs: 1,
            ..MqttConfig::default()
        }
    }

    #[test]
    fn should_convert_publish_into_inbound_message() {
        let payload = br#"{"device_id":"d1"}"#.to_vec();
        let publish = Publish::new("sensors/telemetry", QoS::AtLeastOnce, payload.clone());

        let message = to_inbound(&publish);

        assert_eq!(message.topic, "sensors/telemetry");
        assert_eq!(message.payload, payload);
    }

    #[test]
    fn should_create_subscriber_without_connecting() {
        let subscriber = MqttSubscriber::new(MqttConfig::default());
        assert!(!subscriber.is_running());
    }

    #[tokio::test]
    async fn should_reject_empty_topic() {
        let mut subscriber = MqttSubscriber::new(MqttConfig {
            topic: String::new(),
            ..unreachable_config()
        });
        let (tx, _rx) = mpsc::channel(1);
        assert!(matches!(subscriber.start(tx), Err(MqttError::EmptyTopic)));
        assert!(!subscriber.is_running());
    }

    #[tokio::test]
    async fn should_reject_second_start() {
        let mut subscriber = MqttSubscriber::new(unreachable_config());
        let (tx, _rx) = mpsc::channel(1);

        subscriber.start(tx.clone()).unwrap();
        assert!(subscriber.is_running());
        assert!(matches!(subscriber.start(tx), Err(MqttError::AlreadyStarted)));

        subscriber.stop().await;
        assert!(!subscriber.is_running());
    }

    #[tokio::test]
    async fn should_stop_without_error_when_never_started() {
        let mut subscriber = MqttSubscriber::new(MqttConfig::default());
        subscriber.stop().await;
        assert!(!subscriber.is_running());
    }

    #[tokio::test]
    async fn should_release_queue_sender_when_stopped() {
        let mut subscriber = MqttSubscriber::new(unreachable_config());
        let (tx, mut rx) = mpsc::channel(1);

        subscriber.start(tx).unwrap();
        subscriber.stop().await;

        assert!(rx.recv().await.is_none());
    }
}
