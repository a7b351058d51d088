//! Message broker collaborator

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Broker unreachable: {0}")]
    Unreachable(String),

    #[error("Publish to '{topic}' not handed to the broker within {timeout_ms} ms")]
    Timeout { topic: String, timeout_ms: u64 },
}

/// Topic-based publish with at-least-once delivery
///
/// Consumers of the output topics may see the same message twice.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BrokerError>;
}
