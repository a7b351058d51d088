//! Classifier collaborator
//!
//! The classifier is an HTTP model server. It receives frame references,
//! runs every frame through the model and answers with the averaged class
//! probabilities:
//!
//! ```text
//! POST /analyze-frames  {"frame_paths": ["/frames/1.jpg", ...]}
//! 200 {"status": "success", "result": {"top_class": "place", "confidence": 0.97,
//!      "all_class_probabilities": {...}, "image_paths": [...]}}
//! ```

use ars_common::config::ClassifierConfig;
use ars_common::FrameBatch;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

const USER_AGENT: &str = concat!("ars-orchestrator/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Classifier error {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Classifier reported failure: {0}")]
    Reported(String),
}

/// Raw classifier answer, before thresholding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierVerdict {
    pub top_class: String,
    pub confidence: f64,
    #[serde(default, alias = "all_class_probabilities")]
    pub per_class_confidence: BTreeMap<String, f64>,
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, frames: &FrameBatch) -> Result<ClassifierVerdict, ClassifierError>;
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    frame_paths: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the classifier model server
pub struct HttpClassifierService {
    http_client: reqwest::Client,
    classify_url: String,
}

impl HttpClassifierService {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ClassifierError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            classify_url: config.classify_url(),
        })
    }
}

#[async_trait]
impl Classifier for HttpClassifierService {
    async fn classify(&self, frames: &FrameBatch) -> Result<ClassifierVerdict, ClassifierError> {
        let request = ClassifyRequest {
            frame_paths: frames.iter().map(|f| f.as_str()).collect(),
        };

        tracing::debug!(
            url = %self.classify_url,
            frames = frames.len(),
            "Submitting frames to classifier"
        );

        let response = self
            .http_client
            .post(&self.classify_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifierError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let body: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::ParseError(e.to_string()))?;

        if let Some(error) = body.error {
            return Err(ClassifierError::Reported(error));
        }

        let result = body.result.ok_or_else(|| {
            ClassifierError::ParseError(format!(
                "response without result (status: {})",
                body.status.as_deref().unwrap_or("none")
            ))
        })?;

        if let Some(error) = result.get("error").and_then(|e| e.as_str()) {
            return Err(ClassifierError::Reported(error.to_string()));
        }

        let verdict: ClassifierVerdict = serde_json::from_value(result)
            .map_err(|e| ClassifierError::ParseError(e.to_string()))?;

        if !verdict.confidence.is_finite() || !(0.0..=1.0).contains(&verdict.confidence) {
            return Err(ClassifierError::ParseError(format!(
                "confidence {} outside 0.0-1.0",
                verdict.confidence
            )));
        }

        tracing::debug!(
            top_class = %verdict.top_class,
            confidence = verdict.confidence,
            "Classifier answered"
        );

        Ok(verdict)
    }
}
