//! Burst frame acquisition
//!
//! One session = start, N capture attempts spaced by the waiting time, stop.
//! Sessions are serialized: the camera is a single physical device and a
//! second run must not stop it under the first one.

use super::camera_service::{Camera, CameraError, CaptureAttempt};
use ars_common::config::CaptureConfig;
use ars_common::FrameBatch;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct CaptureCoordinator {
    camera: Arc<dyn Camera>,
    number_of_frames: usize,
    waiting_time: Duration,
    session_lock: Mutex<()>,
}

impl CaptureCoordinator {
    pub fn new(camera: Arc<dyn Camera>, config: &CaptureConfig) -> Self {
        Self {
            camera,
            number_of_frames: config.number_of_frames,
            waiting_time: config.waiting_time(),
            session_lock: Mutex::new(()),
        }
    }

    pub fn number_of_frames(&self) -> usize {
        self.number_of_frames
    }

    /// Run one capture session and return the frames that succeeded
    ///
    /// Failed attempts are skipped, so the batch holds at most
    /// `number_of_frames` references in capture order and may be empty.
    /// The camera is stopped once the attempts are done, whatever their outcome.
    ///
    /// # Errors
    /// Returns the camera error when start or stop fails. After a failed start
    /// a stop is still attempted so the device is not left running.
    pub async fn acquire_frames(&self) -> Result<FrameBatch, CameraError> {
        let _session = self.session_lock.lock().await;

        info!(
            frames = self.number_of_frames,
            waiting_time_ms = self.waiting_time.as_millis() as u64,
            "Starting capture session"
        );

        if let Err(e) = self.camera.start().await {
            warn!(error = %e, "Camera start failed, attempting stop");
            if let Err(stop_err) = self.camera.stop().await {
                warn!(error = %stop_err, "Camera stop after failed start also failed");
            }
            return Err(e);
        }

        let mut batch = FrameBatch::new();
        for attempt in 1..=self.number_of_frames {
            match self.camera.capture_frame().await {
                CaptureAttempt::Captured(frame) => {
                    debug!(attempt, frame = %frame, "Frame captured");
                    batch.push(frame);
                }
                CaptureAttempt::Failed { reason } => {
                    warn!(attempt, reason = %reason, "Frame capture failed, slot skipped");
                }
            }

            if attempt < self.number_of_frames && !self.waiting_time.is_zero() {
                tokio::time::sleep(self.waiting_time).await;
            }
        }

        self.camera.stop().await?;

        info!(
            captured = batch.len(),
            requested = self.number_of_frames,
            "Capture session finished"
        );

        Ok(batch)
    }
}
