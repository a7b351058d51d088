//! Reconciliation outcome and publication channels

use super::{ClassificationResult, Event};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the reconciler decided for one ambiguous batch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// Classifier was confident enough; the batch collapses into one event
    Resolved { reconciled_event: Event },

    /// Classifier was not confident enough; the batch goes to manual review as received
    Unresolved {
        original_batch: Vec<Event>,
        classification: ClassificationResult,
    },
}

impl ResolutionOutcome {
    /// Channel this outcome is published on
    pub fn target(&self) -> PublicationTarget {
        match self {
            ResolutionOutcome::Resolved { .. } => PublicationTarget::Resolved,
            ResolutionOutcome::Unresolved { .. } => PublicationTarget::Escalated,
        }
    }
}

/// Logical output channel; each is bound to a broker topic by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationTarget {
    /// Clean or reconciled events
    Resolved,
    /// Ambiguous batches awaiting manual review
    Escalated,
}

impl fmt::Display for PublicationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublicationTarget::Resolved => f.write_str("resolved"),
            PublicationTarget::Escalated => f.write_str("escalated"),
        }
    }
}
