//! Raw-topic ingestion worker
//!
//! Payloads received by the broker connection are queued; this worker drains
//! the queue and runs each event through the orchestrator, one at a time.
//! Capture waits and collaborator calls happen here, never on the task that
//! reads from the broker.

use super::orchestrator::{Orchestrator, ResolutionError, RunReport};
use ars_common::wire;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct EventListener {
    orchestrator: Arc<Orchestrator>,
    inbound: mpsc::Receiver<Vec<u8>>,
}

impl EventListener {
    pub fn new(orchestrator: Arc<Orchestrator>, inbound: mpsc::Receiver<Vec<u8>>) -> Self {
        Self {
            orchestrator,
            inbound,
        }
    }

    /// Run until every sender of the inbound queue is dropped
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        info!("Event listener started");

        while let Some(payload) = self.inbound.recv().await {
            match handle_payload(&self.orchestrator, &payload).await {
                Ok(report) => {
                    info!(run_id = %report.run_id, path = ?report.path, "Raw event processed");
                }
                Err(ResolutionError::MalformedEventPayload(reason)) => {
                    warn!(
                        reason = %reason,
                        payload = %String::from_utf8_lossy(&payload),
                        "Skipping malformed event payload"
                    );
                }
                // Already logged and escalated by the orchestrator
                Err(_) => {}
            }
        }

        info!("Inbound queue closed, event listener stopped");
    }
}

/// Decode one raw payload (XES, or a flat JSON object) and process it
pub async fn handle_payload(
    orchestrator: &Orchestrator,
    payload: &[u8],
) -> Result<RunReport, ResolutionError> {
    let text = std::str::from_utf8(payload).map_err(ResolutionError::malformed)?;
    let event = wire::decode_event(text).map_err(ResolutionError::malformed)?;
    orchestrator.process_event(event).await
}
