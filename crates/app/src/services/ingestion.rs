//! Ingestion handler: bridges one inbound messaging topic to the reading store.
//!
//! The messaging adapter pushes [`InboundMessage`]s into a bounded
//! [`mpsc`] queue. A single consumption task ([`IngestionHandler::run`])
//! drains it, so inserts happen in delivery order and a full queue applies
//! backpressure to the broker connection instead of spawning unbounded work.
//!
//! Every delivery is fire-and-forget: failures are logged and the message is
//! dropped. Nothing is retried, requeued, or acknowledged back to the
//! producer.

use std::time::Duration;

use tokio::sync::{mpsc, watch};

use sensorhub_domain::error::{SensorHubError, ValidationError};
use sensorhub_domain::reading::Reading;

use super::{DEFAULT_STORE_TIMEOUT, with_deadline};
use crate::ports::ReadingStore;

/// A raw message as delivered by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Decoded, validated, and persisted.
    Stored(Reading),
    /// Arrived on a topic the handler does not own.
    UnknownTopic,
    /// Payload could not be decoded.
    Undecodable,
    /// Decoded but refused by the acceptance predicate.
    Invalid(ValidationError),
    /// Valid, but the store failed, timed out, or shutdown interrupted it.
    Dropped,
}

/// Per-outcome counters returned when the consumption loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub stored: u64,
    pub unknown_topic: u64,
    pub undecodable: u64,
    pub invalid: u64,
    pub dropped: u64,
}

impl IngestStats {
    fn record(&mut self, outcome: &IngestOutcome) {
        match outcome {
            IngestOutcome::Stored(_) => self.stored += 1,
            IngestOutcome::UnknownTopic => self.unknown_topic += 1,
            IngestOutcome::Undecodable => self.undecodable += 1,
            IngestOutcome::Invalid(_) => self.invalid += 1,
            IngestOutcome::Dropped => self.dropped += 1,
        }
    }

    /// Total number of messages seen.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.stored + self.unknown_topic + self.undecodable + self.invalid + self.dropped
    }
}

/// Decodes, validates, and persists readings from one topic filter.
pub struct IngestionHandler<S> {
    store: S,
    topic_filter: String,
    store_timeout: Duration,
}

impl<S: ReadingStore + Send + Sync> IngestionHandler<S> {
    /// Create a handler accepting messages whose topic matches `topic_filter`
    /// (MQTT filter syntax).
    pub fn new(store: S, topic_filter: impl Into<String>) -> Self {
        Self {
            store,
            topic_filter: topic_filter.into(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Bound each insert by `timeout` instead of the default.
    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Process one message. Never fails: every problem is logged and
    /// reported through the returned [`IngestOutcome`].
    pub async fn handle(&self, message: &InboundMessage) -> IngestOutcome {
        if !topic_matches(&self.topic_filter, &message.topic) {
            tracing::warn!(topic = %message.topic, "unknown topic");
            return IngestOutcome::UnknownTopic;
        }

        let reading = match Reading::from_json(&message.payload) {
            Ok(reading) => reading,
            Err(err) => {
                tracing::warn!(topic = %message.topic, error = %err, "failed to decode reading");
                return IngestOutcome::Undecodable;
            }
        };

        if let Err(err) = reading.validate() {
            tracing::warn!(
                topic = %message.topic,
                device_id = %reading.device_id,
                error = %err,
                "missing required data fields"
            );
            return IngestOutcome::Invalid(err);
        }

        let device_id = reading.device_id.clone();
        match with_deadline(self.store_timeout, self.store.insert(reading)).await {
            Ok(stored) => {
                tracing::debug!(device_id = %stored.device_id, timestamp = %stored.timestamp, "reading stored");
                IngestOutcome::Stored(stored)
            }
            Err(err) => {
                log_dropped(&device_id, &err);
                IngestOutcome::Dropped
            }
        }
    }

    /// Process one message unless `shutdown` flips first.
    ///
    /// # Errors
    ///
    /// Returns [`SensorHubError::Cancelled`] when shutdown is signalled while
    /// the message is still being processed. The reading is abandoned.
    pub async fn handle_until_shutdown(
        &self,
        message: &InboundMessage,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<IngestOutcome, SensorHubError> {
        tokio::select! {
            outcome = self.handle(message) => Ok(outcome),
            Ok(()) = shutdown.changed() => Err(SensorHubError::Cancelled),
        }
    }

    /// Drain `queue` until every sender is dropped or `shutdown` flips to
    /// `true`.
    ///
    /// A message whose insert is still in flight when shutdown is signalled
    /// is abandoned and counted as dropped.
    pub async fn run(
        self,
        mut queue: mpsc::Receiver<InboundMessage>,
        mut shutdown: watch::Receiver<bool>,
    ) -> IngestStats {
        let mut stats = IngestStats::default();
        tracing::info!(topic = %self.topic_filter, "ingestion consumer started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            let message = tokio::select! {
                message = queue.recv() => message,
                Ok(()) = shutdown.changed() => break,
            };
            let Some(message) = message else {
                break;
            };

            match self.handle_until_shutdown(&message, &mut shutdown).await {
                Ok(outcome) => stats.record(&outcome),
                Err(err) => {
                    tracing::warn!(
                        topic = %message.topic,
                        error = %err,
                        "ingestion interrupted by shutdown, reading dropped"
                    );
                    stats.record(&IngestOutcome::Dropped);
                    break;
                }
            }
        }

        tracing::info!(
            stored = stats.stored,
            rejected = stats.undecodable + stats.invalid,
            dropped = stats.dropped,
            "ingestion consumer stopped"
        );
        stats
    }
}

fn log_dropped(device_id: &str, err: &SensorHubError) {
    match err {
        SensorHubError::Storage(source) => {
            tracing::warn!(device_id, error = %source, "error inserting reading, dropped");
        }
        other => tracing::warn!(device_id, error = %other, "reading dropped"),
    }
}

/// Match `topic` against an MQTT topic filter.
///
/// `+` matches exactly one level and a trailing `#` matches any number of
/// remaining levels, including none. Wildcards in the first level never match
/// `$`-prefixed system topics.
#[must_use]
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }

    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return filter_levels.next().is_none(),
            (Some("+"), Some(_)) => {}
            (Some(expected), Some(actual)) if expected == actual => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
