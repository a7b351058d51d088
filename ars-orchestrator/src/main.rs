//! ars-orchestrator - Ambiguity resolution service
//!
//! Listens for raw process events on the broker, detects events that
//! happened too close together to be told apart, captures a short burst of
//! camera frames, asks the classifier which activity actually happened, and
//! publishes either a reconciled event or the batch for manual review.

use anyhow::{Context, Result};
use ars_common::config::ArsConfig;
use ars_common::events::EventBus;
use ars_orchestrator::services::{
    EventListener, HttpCameraService, HttpClassifierService, MqttBroker, Orchestrator,
};
use ars_orchestrator::{build_router, AppState};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const EVENT_BUS_CAPACITY: usize = 256;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "ars-orchestrator", version, about)]
struct Args {
    /// Configuration file (TOML); overrides ARS_CONFIG and the default locations
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ArsConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting ars-orchestrator v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!(
        camera = %config.camera.base_url,
        classifier = %config.classifier.classify_url(),
        broker = %format!("{}:{}", config.broker.host, config.broker.port),
        threshold_ms = config.ambiguity.threshold_ms,
        confidence_threshold = config.classifier.confidence_threshold,
        "Configuration loaded"
    );

    let event_bus = EventBus::new(EVENT_BUS_CAPACITY);

    let camera = HttpCameraService::new(&config.camera).context("Failed to build camera client")?;
    let classifier =
        HttpClassifierService::new(&config.classifier).context("Failed to build classifier client")?;

    let (inbound_tx, inbound_rx) = mpsc::channel(config.broker.inbound_queue_capacity);
    let (broker, mqtt_task) = MqttBroker::connect(&config.broker, inbound_tx);

    let orchestrator = Arc::new(Orchestrator::from_config(
        &config,
        Arc::new(camera),
        Arc::new(classifier),
        Arc::new(broker),
        event_bus,
    ));

    let listener_task = EventListener::new(orchestrator.clone(), inbound_rx).spawn();

    let state = AppState::new(orchestrator);
    let app = build_router(state);

    let address = config.server.socket_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("ars-orchestrator listening on http://{}", address);
    info!("Health check: http://{}/health", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    mqtt_task.abort();
    listener_task.abort();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
