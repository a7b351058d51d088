//! Classifier verdict for one frame batch

use super::FrameBatch;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of submitting one frame batch to the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Label with the highest averaged probability
    pub top_class: String,
    /// Confidence of `top_class` (0.0-1.0)
    pub confidence: f64,
    /// Averaged probability of every class the model knows
    pub per_class_confidence: BTreeMap<String, f64>,
    /// Frames the verdict was computed from
    pub source_frames: FrameBatch,
    /// `confidence >= confidence_threshold`
    pub resolved: bool,
}

impl ClassificationResult {
    /// Build a result and decide whether it clears `confidence_threshold`
    ///
    /// A confidence exactly equal to the threshold counts as resolved.
    pub fn evaluate(
        top_class: impl Into<String>,
        confidence: f64,
        per_class_confidence: BTreeMap<String, f64>,
        source_frames: FrameBatch,
        confidence_threshold: f64,
    ) -> Self {
        Self {
            top_class: top_class.into(),
            confidence,
            per_class_confidence,
            source_frames,
            resolved: confidence >= confidence_threshold,
        }
    }

    /// Per-class confidences ordered from most to least likely
    pub fn ranked_classes(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .per_class_confidence
            .iter()
            .map(|(class, score)| (class.as_str(), *score))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    /// Human-readable breakdown for manual review logs
    pub fn confidence_breakdown(&self) -> String {
        self.ranked_classes()
            .iter()
            .map(|(class, score)| format!("{}={:.3}", class, score))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
