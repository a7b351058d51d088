//! Orchestration services
//!
//! Leaf-first:
//! - `ambiguity_window`: sliding window of recent events + adjacency test
//! - `camera_service` / `capture_coordinator`: camera collaborator and burst acquisition
//! - `classifier_service` / `classification_client`: classifier collaborator and thresholding
//! - `event_reconciler`: merge an ambiguous batch into one event, or escalate it
//! - `broker` / `mqtt_broker` / `publication_router`: broker collaborator and output routing
//! - `orchestrator`: the resolution state machine
//! - `event_listener`: raw-topic ingestion worker

pub mod ambiguity_window;
pub mod broker;
pub mod camera_service;
pub mod capture_coordinator;
pub mod classification_client;
pub mod classifier_service;
pub mod event_listener;
pub mod event_reconciler;
pub mod mqtt_broker;
pub mod orchestrator;
pub mod publication_router;

pub use ambiguity_window::AmbiguityWindow;
pub use broker::{Broker, BrokerError};
pub use camera_service::{Camera, CameraError, CaptureAttempt, HttpCameraService};
pub use capture_coordinator::CaptureCoordinator;
pub use classification_client::{ClassificationClient, ClassificationError};
pub use classifier_service::{Classifier, ClassifierError, ClassifierVerdict, HttpClassifierService};
pub use event_listener::EventListener;
pub use event_reconciler::{EventReconciler, ReconcileError};
pub use mqtt_broker::MqttBroker;
pub use orchestrator::{Orchestrator, OrchestratorStatus, ResolutionError, RunPath, RunReport};
pub use publication_router::{PublicationReceipt, PublicationRouter, PublishError};
