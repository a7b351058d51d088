//! Ambiguous batch reconciliation
//!
//! A confident classification collapses the batch into a single event: the
//! activity name comes from the classifier, every other attribute from the
//! earliest event of the batch. Otherwise the batch is handed back untouched
//! for manual review.

use ars_common::{ClassificationResult, Event, ResolutionOutcome};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Cannot reconcile an empty batch")]
    EmptyBatch,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EventReconciler;

impl EventReconciler {
    pub fn new() -> Self {
        Self
    }

    pub fn reconcile(
        &self,
        ambiguous: Vec<Event>,
        classification: ClassificationResult,
    ) -> Result<ResolutionOutcome, ReconcileError> {
        let donor = ambiguous.first().ok_or(ReconcileError::EmptyBatch)?;

        if classification.resolved {
            let reconciled_event = donor.relabeled(&classification.top_class);
            tracing::info!(
                replaced = ambiguous.len(),
                concept_name = %classification.top_class,
                station = %reconciled_event.station(),
                "Ambiguous batch reconciled"
            );
            return Ok(ResolutionOutcome::Resolved { reconciled_event });
        }

        tracing::info!(
            events = ambiguous.len(),
            top_class = %classification.top_class,
            confidence = classification.confidence,
            "Classification not confident enough, batch left unresolved"
        );
        Ok(ResolutionOutcome::Unresolved {
            original_batch: ambiguous,
            classification,
        })
    }
}
