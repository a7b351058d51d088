//! Resolution state machine
//!
//! ```text
//! Idle -> WindowUpdated -> Clean -> Publishing -> Idle
//!                       -> Ambiguous -> Capturing -> Classifying -> Reconciling -> Publishing -> Idle
//! any of Capturing / Classifying / Reconciling / Publishing -> Failed -> Idle
//! ```
//!
//! Every transition is broadcast on the EventBus. Observing an event and
//! testing the window happen under one lock, so two concurrent arrivals can
//! never both see the same pair as new. Capture sessions are serialized by the
//! capture coordinator; the rest of a run proceeds concurrently with others.

use super::ambiguity_window::AmbiguityWindow;
use super::broker::{Broker, BrokerError};
use super::camera_service::{Camera, CameraError};
use super::capture_coordinator::CaptureCoordinator;
use super::classification_client::{ClassificationClient, ClassificationError};
use super::classifier_service::{Classifier, ClassifierError};
use super::event_reconciler::{EventReconciler, ReconcileError};
use super::publication_router::{PublicationReceipt, PublicationRouter, PublishError};
use ars_common::config::ArsConfig;
use ars_common::events::{EventBus, OrchestratorEvent, RunState};
use ars_common::{ClassificationResult, Event, PublicationTarget};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Why a resolution run did not complete
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("Camera unreachable: {0}")]
    CameraUnreachable(#[source] CameraError),

    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(#[source] ClassifierError),

    #[error("No frames captured, classification skipped")]
    EmptyFrameBatch,

    #[error("Broker unreachable: {0}")]
    BrokerUnreachable(#[source] BrokerError),

    #[error("Malformed event payload: {0}")]
    MalformedEventPayload(String),

    #[error("Ambiguous batch is empty")]
    EmptyAmbiguousBatch,

    #[error("Failed to encode payload: {0}")]
    Encoding(String),
}

impl ResolutionError {
    pub fn malformed(err: impl std::fmt::Display) -> Self {
        ResolutionError::MalformedEventPayload(err.to_string())
    }
}

impl From<PublishError> for ResolutionError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::Broker(e) => ResolutionError::BrokerUnreachable(e),
            PublishError::Encoding(e) => ResolutionError::Encoding(e.to_string()),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPath {
    /// Not ambiguous, forwarded as received
    Clean,
    /// Ambiguous batch collapsed into one event
    Resolved,
    /// Ambiguous batch sent to manual review
    Escalated,
}

impl From<PublicationTarget> for RunPath {
    fn from(target: PublicationTarget) -> Self {
        match target {
            PublicationTarget::Resolved => RunPath::Resolved,
            PublicationTarget::Escalated => RunPath::Escalated,
        }
    }
}

/// Summary of one completed run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub path: RunPath,
    pub topic: String,
    /// Events the run consumed
    pub events: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames_captured: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_breakdown: Option<BTreeMap<String, f64>>,
}

/// Snapshot for health reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrchestratorStatus {
    pub window_len: usize,
    pub window_capacity: usize,
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub last_error: Option<String>,
}

enum WindowVerdict {
    Clean,
    Ambiguous(Vec<Event>),
}

pub struct Orchestrator {
    window: Mutex<AmbiguityWindow>,
    capture: CaptureCoordinator,
    classification: ClassificationClient,
    reconciler: EventReconciler,
    router: PublicationRouter,
    event_bus: EventBus,
    runs_completed: AtomicU64,
    runs_failed: AtomicU64,
    last_error: RwLock<Option<String>>,
}

impl Orchestrator {
    pub fn new(
        window: AmbiguityWindow,
        capture: CaptureCoordinator,
        classification: ClassificationClient,
        reconciler: EventReconciler,
        router: PublicationRouter,
        event_bus: EventBus,
    ) -> Self {
        Self {
            window: Mutex::new(window),
            capture,
            classification,
            reconciler,
            router,
            event_bus,
            runs_completed: AtomicU64::new(0),
            runs_failed: AtomicU64::new(0),
            last_error: RwLock::new(None),
        }
    }

    /// Wire an orchestrator from configuration and collaborators
    pub fn from_config(
        config: &ArsConfig,
        camera: Arc<dyn Camera>,
        classifier: Arc<dyn Classifier>,
        broker: Arc<dyn Broker>,
        event_bus: EventBus,
    ) -> Self {
        Self::new(
            AmbiguityWindow::new(&config.ambiguity),
            CaptureCoordinator::new(camera, &config.capture),
            ClassificationClient::new(classifier, &config.classifier),
            EventReconciler::new(),
            PublicationRouter::new(broker, &config.broker),
            event_bus,
        )
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub async fn status(&self) -> OrchestratorStatus {
        let window = self.window.lock().await;
        OrchestratorStatus {
            window_len: window.len(),
            window_capacity: window.capacity(),
            runs_completed: self.runs_completed.load(Ordering::SeqCst),
            runs_failed: self.runs_failed.load(Ordering::SeqCst),
            last_error: self.last_error.read().await.clone(),
        }
    }

    /// Observe one incoming event and drive it to publication
    ///
    /// A run starts when the window is ambiguous and the new event is part of
    /// a close cluster. When the window is ambiguous only because of an older
    /// pair, that pair has already been handled and the event goes out clean.
    pub async fn process_event(&self, event: Event) -> Result<RunReport, ResolutionError> {
        let run_id = Uuid::new_v4();

        let verdict = {
            let mut window = self.window.lock().await;
            window.observe(event.clone());

            self.event_bus.emit_lossy(OrchestratorEvent::EventObserved {
                run_id,
                concept_name: event.concept_name().to_string(),
                event_time: event.timestamp(),
                window_len: window.len(),
                timestamp: Utc::now(),
            });
            self.transition(run_id, RunState::Idle, RunState::WindowUpdated);

            let cluster = window.ambiguous_cluster();
            if window.is_ambiguous() && cluster.len() >= 2 {
                WindowVerdict::Ambiguous(cluster)
            } else {
                if window.is_ambiguous() {
                    debug!(%run_id, "Window holds an earlier close pair, new event is clean");
                }
                WindowVerdict::Clean
            }
        };

        match verdict {
            WindowVerdict::Clean => {
                self.transition(run_id, RunState::WindowUpdated, RunState::Clean);
                self.forward_clean(run_id, event, RunState::Clean).await
            }
            WindowVerdict::Ambiguous(batch) => {
                info!(
                    %run_id,
                    events = batch.len(),
                    first = %batch[0].concept_name(),
                    "Ambiguous events detected"
                );
                self.transition(run_id, RunState::WindowUpdated, RunState::Ambiguous);
                self.resolve(run_id, batch).await
            }
        }
    }

    /// Publish an event known to be unambiguous, bypassing the window
    pub async fn publish_unambiguous(&self, event: Event) -> Result<RunReport, ResolutionError> {
        let run_id = Uuid::new_v4();
        self.transition(run_id, RunState::Idle, RunState::Clean);
        self.forward_clean(run_id, event, RunState::Clean).await
    }

    /// Resolve a batch already known to be ambiguous, bypassing the window
    pub async fn resolve_ambiguous_batch(&self, batch: Vec<Event>) -> Result<RunReport, ResolutionError> {
        if batch.is_empty() {
            return Err(ResolutionError::EmptyAmbiguousBatch);
        }
        let run_id = Uuid::new_v4();
        self.transition(run_id, RunState::Idle, RunState::Ambiguous);
        self.resolve(run_id, batch).await
    }

    async fn forward_clean(
        &self,
        run_id: Uuid,
        event: Event,
        from: RunState,
    ) -> Result<RunReport, ResolutionError> {
        self.transition(run_id, from, RunState::Publishing);

        match self.router.publish_clean(&event).await {
            Ok(receipt) => {
                let report = RunReport {
                    run_id,
                    path: RunPath::Clean,
                    topic: receipt.topic.clone(),
                    events: 1,
                    frames_captured: None,
                    top_class: None,
                    confidence: None,
                    confidence_breakdown: None,
                };
                Ok(self.complete(run_id, &receipt, report))
            }
            Err(e) => {
                self.fail(run_id, RunState::Publishing, std::slice::from_ref(&event), e.into())
                    .await
            }
        }
    }

    async fn resolve(&self, run_id: Uuid, batch: Vec<Event>) -> Result<RunReport, ResolutionError> {
        self.transition(run_id, RunState::Ambiguous, RunState::Capturing);

        let frames = match self.capture.acquire_frames().await {
            Ok(frames) => frames,
            Err(e) => {
                return self
                    .fail(run_id, RunState::Capturing, &batch, ResolutionError::CameraUnreachable(e))
                    .await
            }
        };

        self.event_bus.emit_lossy(OrchestratorEvent::FramesAcquired {
            run_id,
            frames: frames.len(),
            requested: self.capture.number_of_frames(),
            timestamp: Utc::now(),
        });
        let frames_captured = frames.len();

        if frames.is_empty() {
            return self
                .fail(run_id, RunState::Capturing, &batch, ResolutionError::EmptyFrameBatch)
                .await;
        }

        self.transition(run_id, RunState::Capturing, RunState::Classifying);
        let classification = match self.classification.classify(frames).await {
            Ok(result) => result,
            Err(ClassificationError::EmptyFrameBatch) => {
                return self
                    .fail(run_id, RunState::Classifying, &batch, ResolutionError::EmptyFrameBatch)
                    .await
            }
            Err(ClassificationError::Unavailable(e)) => {
                return self
                    .fail(
                        run_id,
                        RunState::Classifying,
                        &batch,
                        ResolutionError::ClassifierUnavailable(e),
                    )
                    .await
            }
        };

        self.event_bus.emit_lossy(OrchestratorEvent::Classified {
            run_id,
            top_class: classification.top_class.clone(),
            confidence: classification.confidence,
            resolved: classification.resolved,
            timestamp: Utc::now(),
        });

        self.transition(run_id, RunState::Classifying, RunState::Reconciling);
        let events = batch.len();
        let summary = VerdictSummary::from(&classification);
        let outcome = match self.reconciler.reconcile(batch.clone(), classification) {
            Ok(outcome) => outcome,
            Err(ReconcileError::EmptyBatch) => {
                return self
                    .fail(run_id, RunState::Reconciling, &batch, ResolutionError::EmptyAmbiguousBatch)
                    .await
            }
        };

        self.transition(run_id, RunState::Reconciling, RunState::Publishing);
        let path = RunPath::from(outcome.target());

        match self.router.publish(&outcome).await {
            Ok(receipt) => {
                let report = RunReport {
                    run_id,
                    path,
                    topic: receipt.topic.clone(),
                    events,
                    frames_captured: Some(frames_captured),
                    top_class: Some(summary.top_class),
                    confidence: Some(summary.confidence),
                    confidence_breakdown: receipt.confidence_breakdown.clone(),
                };
                Ok(self.complete(run_id, &receipt, report))
            }
            Err(e) => self.fail(run_id, RunState::Publishing, &batch, e.into()).await,
        }
    }

    fn complete(&self, run_id: Uuid, receipt: &PublicationReceipt, report: RunReport) -> RunReport {
        self.event_bus.emit_lossy(OrchestratorEvent::Published {
            run_id,
            target: receipt.target,
            topic: receipt.topic.clone(),
            timestamp: Utc::now(),
        });
        self.transition(run_id, RunState::Publishing, RunState::Idle);
        self.runs_completed.fetch_add(1, Ordering::SeqCst);

        info!(
            %run_id,
            path = ?report.path,
            topic = %report.topic,
            "Run completed"
        );
        report
    }

    /// Record a failed run and escalate its batch for manual review
    async fn fail(
        &self,
        run_id: Uuid,
        from: RunState,
        batch: &[Event],
        error: ResolutionError,
    ) -> Result<RunReport, ResolutionError> {
        error!(%run_id, error = %error, "Resolution run failed");

        self.transition(run_id, from, RunState::Failed);
        self.event_bus.emit_lossy(OrchestratorEvent::RunFailed {
            run_id,
            error: error.to_string(),
            timestamp: Utc::now(),
        });

        // A failed publish means the broker cannot take the escalation either
        if from == RunState::Publishing {
            log_lost_batch(run_id, batch);
        } else if let Err(e) = self.router.escalate(batch, &error.to_string()).await {
            error!(%run_id, error = %e, "Could not escalate batch of failed run");
            log_lost_batch(run_id, batch);
        }

        self.runs_failed.fetch_add(1, Ordering::SeqCst);
        *self.last_error.write().await = Some(error.to_string());
        self.transition(run_id, RunState::Failed, RunState::Idle);

        Err(error)
    }

    fn transition(&self, run_id: Uuid, from: RunState, to: RunState) {
        debug!(%run_id, ?from, ?to, "State transition");
        self.event_bus.emit_lossy(OrchestratorEvent::StateChanged {
            run_id,
            from,
            to,
            timestamp: Utc::now(),
        });
    }
}

/// Fields of the verdict reported after reconciliation consumed it
struct VerdictSummary {
    top_class: String,
    confidence: f64,
}

impl From<&ClassificationResult> for VerdictSummary {
    fn from(result: &ClassificationResult) -> Self {
        Self {
            top_class: result.top_class.clone(),
            confidence: result.confidence,
        }
    }
}

/// Last resort for events that could not be published anywhere
fn log_lost_batch(run_id: Uuid, batch: &[Event]) {
    for event in batch {
        match serde_json::to_string(event) {
            Ok(json) => warn!(%run_id, event = %json, "Unpublished event"),
            Err(_) => warn!(%run_id, concept_name = %event.concept_name(), "Unpublished event"),
        }
    }
}
