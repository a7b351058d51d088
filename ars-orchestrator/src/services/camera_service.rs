//! Camera collaborator
//!
//! The camera service exposes three idempotent GET operations:
//! `/start-camera`, `/capture-frame` and `/stop-camera`. A captured frame is
//! stored by the camera service and referenced by its file path.

use ars_common::config::CameraConfig;
use ars_common::FrameReference;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

const USER_AGENT: &str = concat!("ars-orchestrator/", env!("CARGO_PKG_VERSION"));

/// Fatal camera failures (start/stop)
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("Network error on {operation}: {message}")]
    NetworkError {
        operation: &'static str,
        message: String,
    },

    #[error("Camera rejected {operation} with status {status}: {body}")]
    Rejected {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("Unexpected camera response on {operation}: {message}")]
    InvalidResponse {
        operation: &'static str,
        message: String,
    },
}

/// Outcome of one capture request
///
/// A failed capture only costs one slot of the burst, so it is a value rather
/// than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureAttempt {
    Captured(FrameReference),
    Failed { reason: String },
}

/// Camera operations used by the capture coordinator
#[async_trait]
pub trait Camera: Send + Sync {
    /// Turn the camera on; succeeds when it is already running
    async fn start(&self) -> Result<(), CameraError>;

    /// Grab one frame
    async fn capture_frame(&self) -> CaptureAttempt;

    /// Turn the camera off; succeeds when it is already stopped
    async fn stop(&self) -> Result<(), CameraError>;
}

/// Body returned by every camera endpoint
#[derive(Debug, Deserialize)]
struct CameraStatus {
    #[serde(default)]
    status: Option<String>,
    #[serde(default, alias = "filename")]
    filepath: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the camera service
pub struct HttpCameraService {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpCameraService {
    pub fn new(config: &CameraConfig) -> Result<Self, CameraError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CameraError::NetworkError {
                operation: "client setup",
                message: e.to_string(),
            })?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn call(&self, operation: &'static str) -> Result<CameraStatus, CameraError> {
        let url = format!("{}/{}", self.base_url, operation);

        tracing::debug!(url = %url, "Calling camera service");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| CameraError::NetworkError {
                operation,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CameraError::Rejected {
                operation,
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<CameraStatus>()
            .await
            .map_err(|e| CameraError::InvalidResponse {
                operation,
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl Camera for HttpCameraService {
    async fn start(&self) -> Result<(), CameraError> {
        let reply = self.call("start-camera").await?;
        tracing::info!(status = reply.status.as_deref().unwrap_or(""), "Camera started");
        Ok(())
    }

    async fn capture_frame(&self) -> CaptureAttempt {
        match self.call("capture-frame").await {
            Ok(CameraStatus {
                filepath: Some(path),
                ..
            }) if !path.is_empty() => CaptureAttempt::Captured(FrameReference::new(path)),
            Ok(reply) => CaptureAttempt::Failed {
                reason: reply
                    .error
                    .or(reply.status)
                    .unwrap_or_else(|| "response carried no frame path".to_string()),
            },
            Err(e) => CaptureAttempt::Failed {
                reason: e.to_string(),
            },
        }
    }

    async fn stop(&self) -> Result<(), CameraError> {
        let reply = self.call("stop-camera").await?;
        tracing::info!(status = reply.status.as_deref().unwrap_or(""), "Camera stopped");
        Ok(())
    }
}
