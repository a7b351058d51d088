//! Output routing
//!
//! Resolved and clean events go to the resolved topic as single XES events.
//! Unresolved batches go to the escalated topic as a JSON `{"events": [...]}`
//! envelope, with the classifier's per-class confidences logged alongside.

use super::broker::{Broker, BrokerError};
use ars_common::config::BrokerConfig;
use ars_common::wire::{json, xes};
use ars_common::{Event, PublicationTarget, ResolutionOutcome};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to encode payload: {0}")]
    Encoding(#[from] ars_common::Error),

    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// What was handed to the broker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicationReceipt {
    pub target: PublicationTarget,
    pub topic: String,
    pub payload_bytes: usize,
    /// Per-class confidences for unresolved batches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_breakdown: Option<BTreeMap<String, f64>>,
}

pub struct PublicationRouter {
    broker: Arc<dyn Broker>,
    resolved_topic: String,
    escalated_topic: String,
    publish_timeout: Duration,
}

impl PublicationRouter {
    pub fn new(broker: Arc<dyn Broker>, config: &BrokerConfig) -> Self {
        Self {
            broker,
            resolved_topic: config.resolved_topic.clone(),
            escalated_topic: config.escalated_topic.clone(),
            publish_timeout: config.publish_timeout(),
        }
    }

    pub fn topic_for(&self, target: PublicationTarget) -> &str {
        match target {
            PublicationTarget::Resolved => &self.resolved_topic,
            PublicationTarget::Escalated => &self.escalated_topic,
        }
    }

    /// Forward an event that needed no resolution
    pub async fn publish_clean(&self, event: &Event) -> Result<PublicationReceipt, PublishError> {
        let payload = xes::encode_event(event)?;
        self.send(PublicationTarget::Resolved, payload, None).await
    }

    /// Publish a reconciliation outcome on its channel
    pub async fn publish(&self, outcome: &ResolutionOutcome) -> Result<PublicationReceipt, PublishError> {
        match outcome {
            ResolutionOutcome::Resolved { reconciled_event } => {
                let payload = xes::encode_event(reconciled_event)?;
                self.send(PublicationTarget::Resolved, payload, None).await
            }
            ResolutionOutcome::Unresolved {
                original_batch,
                classification,
            } => {
                warn!(
                    events = original_batch.len(),
                    top_class = %classification.top_class,
                    confidence = classification.confidence,
                    confidences = %classification.confidence_breakdown(),
                    "Ambiguity not resolved, escalating batch for manual review"
                );
                let payload = json::encode_batch(original_batch)?;
                self.send(
                    PublicationTarget::Escalated,
                    payload,
                    Some(classification.per_class_confidence.clone()),
                )
                .await
            }
        }
    }

    /// Escalate a batch whose run failed before reaching a verdict
    pub async fn escalate(&self, batch: &[Event], reason: &str) -> Result<PublicationReceipt, PublishError> {
        warn!(
            events = batch.len(),
            reason = %reason,
            "Escalating batch after failed resolution run"
        );
        let payload = json::encode_batch(batch)?;
        self.send(PublicationTarget::Escalated, payload, None).await
    }

    async fn send(
        &self,
        target: PublicationTarget,
        payload: String,
        confidence_breakdown: Option<BTreeMap<String, f64>>,
    ) -> Result<PublicationReceipt, PublishError> {
        let topic = self.topic_for(target).to_string();
        let payload_bytes = payload.len();

        match tokio::time::timeout(
            self.publish_timeout,
            self.broker.publish(&topic, payload.into_bytes()),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(BrokerError::Timeout {
                    topic,
                    timeout_ms: self.publish_timeout.as_millis() as u64,
                }
                .into())
            }
        }

        info!(channel = %target, topic = %topic, bytes = payload_bytes, "Published");

        Ok(PublicationReceipt {
            target,
            topic,
            payload_bytes,
            confidence_breakdown,
        })
    }
}
