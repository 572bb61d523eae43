//! # sensorhubd: sensorhub daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialize the `SQLite` connection pool and create the schema
//! - Spawn the ingestion consumer behind a bounded queue
//! - Start the MQTT subscriber feeding that queue
//! - Build the axum router, injecting the query service and health probe
//! - Bind to a TCP port and serve until SIGINT/SIGTERM
//! - Tear everything down in reverse order
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer. No domain logic belongs here.

mod config;

use std::time::Duration;

use anyhow::Context;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use sensorhub_adapter_http_axum::router;
use sensorhub_adapter_http_axum::state::AppState;
use sensorhub_adapter_mqtt::MqttSubscriber;
use sensorhub_app::ports::ReadingStore;
use sensorhub_app::services::ingestion::{IngestStats, IngestionHandler};
use sensorhub_app::services::query::QueryService;

use crate::config::Config;

/// Extra time the consumer gets to drain queued messages after the MQTT
/// subscriber has stopped, on top of one store timeout.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.logging.filter);

    // Database
    let db = config
        .storage()
        .build()
        .await
        .with_context(|| format!("failed to initialise database at {}", config.database.url))?;
    let store = db.reading_store();
    store
        .ensure_schema()
        .await
        .context("failed to create the readings schema")?;

    // Ingestion
    let (queue_tx, queue_rx) = mpsc::channel(config.mqtt.queue_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ingestion = IngestionHandler::new(store.clone(), config.mqtt.topic.clone())
        .with_store_timeout(config.store_timeout());
    let consumer = tokio::spawn(ingestion.run(queue_rx, shutdown_rx));

    // MQTT
    let mut subscriber = MqttSubscriber::new(config.mqtt.clone());
    if config.mqtt.enabled {
        subscriber
            .start(queue_tx)
            .context("failed to start MQTT subscriber")?;
    } else {
        tracing::info!("MQTT ingestion disabled");
        drop(queue_tx);
    }

    // HTTP
    let query_service = QueryService::new(store.clone()).with_timeout(config.query_timeout());
    let app = router::build(AppState::new(query_service, store));

    let bind_addr = config.bind_addr();
    let served = serve(&bind_addr, app).await;

    // Teardown
    subscriber.stop().await;
    let drain_limit = config.store_timeout() + DRAIN_GRACE;
    match drain_consumer(consumer, &shutdown_tx, drain_limit).await {
        Some(stats) => tracing::info!(
            stored = stats.stored,
            unknown_topic = stats.unknown_topic,
            undecodable = stats.undecodable,
            invalid = stats.invalid,
            dropped = stats.dropped,
            "ingestion summary"
        ),
        None => tracing::warn!("ingestion consumer did not report statistics"),
    }
    db.close().await;

    served
}

fn init_tracing(filter: &str) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter {filter:?} ({err}), falling back to `info`");
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

async fn serve(bind_addr: &str, app: axum::Router) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "sensorhubd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")
}

/// Wait for the consumer to drain and exit once every queue sender is gone.
///
/// If it is still busy after `limit`, signal shutdown so any in-flight
/// insert is abandoned, then wait for it to return.
async fn drain_consumer(
    mut consumer: JoinHandle<IngestStats>,
    shutdown_tx: &watch::Sender<bool>,
    limit: Duration,
) -> Option<IngestStats> {
    let joined = match tokio::time::timeout(limit, &mut consumer).await {
        Ok(joined) => joined,
        Err(_) => {
            tracing::warn!("ingestion queue not drained in time, cancelling");
            let _ = shutdown_tx.send(true);
            consumer.await
        }
    };
    match joined {
        Ok(stats) => Some(stats),
        Err(err) => {
            tracing::error!(error = %err, "ingestion consumer panicked");
            None
        }
    }
}

/// Resolve on Ctrl-C, or on SIGTERM where available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
