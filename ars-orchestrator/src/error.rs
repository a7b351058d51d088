//! Error types for ars-orchestrator HTTP handlers

use crate::services::ResolutionError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resolution run failed
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ApiError::Resolution(err) => match err {
                ResolutionError::MalformedEventPayload(_) => {
                    (StatusCode::BAD_REQUEST, "MALFORMED_EVENT")
                }
                ResolutionError::EmptyAmbiguousBatch => {
                    (StatusCode::BAD_REQUEST, "EMPTY_AMBIGUOUS_BATCH")
                }
                ResolutionError::CameraUnreachable(_) => {
                    (StatusCode::BAD_GATEWAY, "CAMERA_UNREACHABLE")
                }
                ResolutionError::ClassifierUnavailable(_) => {
                    (StatusCode::BAD_GATEWAY, "CLASSIFIER_UNAVAILABLE")
                }
                ResolutionError::BrokerUnreachable(_) => {
                    (StatusCode::BAD_GATEWAY, "BROKER_UNREACHABLE")
                }
                // Batch was escalated, nothing to classify
                ResolutionError::EmptyFrameBatch => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_FRAME_BATCH")
                }
                ResolutionError::Encoding(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "ENCODING_ERROR")
                }
            },
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
