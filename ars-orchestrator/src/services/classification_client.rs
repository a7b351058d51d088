//! Frame batch classification with confidence thresholding

use super::classifier_service::{Classifier, ClassifierError};
use ars_common::config::ClassifierConfig;
use ars_common::{ClassificationResult, FrameBatch};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("Frame batch is empty")]
    EmptyFrameBatch,

    #[error(transparent)]
    Unavailable(#[from] ClassifierError),
}

pub struct ClassificationClient {
    classifier: Arc<dyn Classifier>,
    confidence_threshold: f64,
}

impl ClassificationClient {
    pub fn new(classifier: Arc<dyn Classifier>, config: &ClassifierConfig) -> Self {
        Self {
            classifier,
            confidence_threshold: config.confidence_threshold,
        }
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    /// Classify `frames` and mark the result resolved when it clears the threshold
    ///
    /// An empty batch is rejected without contacting the classifier.
    pub async fn classify(&self, frames: FrameBatch) -> Result<ClassificationResult, ClassificationError> {
        if frames.is_empty() {
            return Err(ClassificationError::EmptyFrameBatch);
        }

        let verdict = self.classifier.classify(&frames).await?;

        let result = ClassificationResult::evaluate(
            verdict.top_class,
            verdict.confidence,
            verdict.per_class_confidence,
            frames,
            self.confidence_threshold,
        );

        tracing::info!(
            top_class = %result.top_class,
            confidence = result.confidence,
            threshold = self.confidence_threshold,
            resolved = result.resolved,
            "Frame batch classified"
        );

        Ok(result)
    }
}
