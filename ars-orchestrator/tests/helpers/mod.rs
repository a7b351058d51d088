//! Test helpers for ars-orchestrator integration tests
//!
//! Deterministic doubles for the three collaborators:
//! - FakeCamera: scripted capture failures, optional unreachable start
//! - FakeClassifier: fixed verdict or unavailability, records submitted batches
//! - RecordingBroker: keeps every publish, can be switched off

#![allow(dead_code)]

use ars_common::config::ArsConfig;
use ars_common::events::EventBus;
use ars_common::{Event, FrameBatch, FrameReference};
use ars_orchestrator::services::{
    Broker, BrokerError, Camera, CameraError, CaptureAttempt, Classifier, ClassifierError,
    ClassifierVerdict, Orchestrator,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub const RESOLVED_TOPIC: &str = "ars/events/resolved";
pub const ESCALATED_TOPIC: &str = "ars/events/escalated";

// =============================================================================
// Camera
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraCall {
    Start,
    Capture,
    Stop,
}

#[derive(Default)]
pub struct FakeCamera {
    calls: Mutex<Vec<CameraCall>>,
    /// 1-based capture attempts that fail
    failing_attempts: Vec<usize>,
    unreachable: bool,
}

impl FakeCamera {
    pub fn healthy() -> Self {
        Self::default()
    }

    pub fn failing_attempts(attempts: &[usize]) -> Self {
        Self {
            failing_attempts: attempts.to_vec(),
            ..Default::default()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<CameraCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn capture_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == CameraCall::Capture)
            .count()
    }

    fn unreachable_error(operation: &'static str) -> CameraError {
        CameraError::NetworkError {
            operation,
            message: "connection refused".to_string(),
        }
    }
}

#[async_trait]
impl Camera for FakeCamera {
    async fn start(&self) -> Result<(), CameraError> {
        self.calls.lock().unwrap().push(CameraCall::Start);
        if self.unreachable {
            return Err(Self::unreachable_error("start-camera"));
        }
        Ok(())
    }

    async fn capture_frame(&self) -> CaptureAttempt {
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(CameraCall::Capture);
            calls.iter().filter(|c| **c == CameraCall::Capture).count()
        };
        // Let other tasks run between attempts
        tokio::task::yield_now().await;

        if self.failing_attempts.contains(&attempt) {
            CaptureAttempt::Failed {
                reason: "Failed to capture frame".to_string(),
            }
        } else {
            CaptureAttempt::Captured(FrameReference::new(format!("/frames/frame_{}.jpg", attempt)))
        }
    }

    async fn stop(&self) -> Result<(), CameraError> {
        self.calls.lock().unwrap().push(CameraCall::Stop);
        if self.unreachable {
            return Err(Self::unreachable_error("stop-camera"));
        }
        Ok(())
    }
}

// =============================================================================
// Classifier
// =============================================================================

pub struct FakeClassifier {
    verdict: Option<ClassifierVerdict>,
    batches: Mutex<Vec<FrameBatch>>,
}

impl FakeClassifier {
    /// Answers `top_class` with `confidence`; the remainder goes to "other"
    pub fn answering(top_class: &str, confidence: f64) -> Self {
        let mut per_class = BTreeMap::new();
        per_class.insert(top_class.to_string(), confidence);
        per_class.insert("other".to_string(), 1.0 - confidence);
        Self {
            verdict: Some(ClassifierVerdict {
                top_class: top_class.to_string(),
                confidence,
                per_class_confidence: per_class,
            }),
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            verdict: None,
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn batches(&self) -> Vec<FrameBatch> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Classifier for FakeClassifier {
    async fn classify(&self, frames: &FrameBatch) -> Result<ClassifierVerdict, ClassifierError> {
        self.batches.lock().unwrap().push(frames.clone());
        self.verdict.clone().ok_or(ClassifierError::ApiError {
            status: 500,
            body: r#"{"error":"model not loaded"}"#.to_string(),
        })
    }
}

// =============================================================================
// Broker
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
}

#[derive(Default)]
pub struct RecordingBroker {
    published: Mutex<Vec<Published>>,
    down: AtomicBool,
}

impl RecordingBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn down() -> Self {
        let broker = Self::default();
        broker.set_down(true);
        broker
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    pub fn on_topic(&self, topic: &str) -> Vec<String> {
        self.published()
            .into_iter()
            .filter(|p| p.topic == topic)
            .map(|p| p.payload)
            .collect()
    }
}

#[async_trait]
impl Broker for RecordingBroker {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BrokerError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(BrokerError::Unreachable("connection refused".to_string()));
        }
        self.published.lock().unwrap().push(Published {
            topic: topic.to_string(),
            payload: String::from_utf8(payload).expect("payloads are UTF-8"),
        });
        Ok(())
    }
}

// =============================================================================
// Wiring
// =============================================================================

pub struct Harness {
    pub orchestrator: Arc<Orchestrator>,
    pub camera: Arc<FakeCamera>,
    pub classifier: Arc<FakeClassifier>,
    pub broker: Arc<RecordingBroker>,
    pub event_bus: EventBus,
}

/// Defaults with no inter-frame wait
pub fn test_config() -> ArsConfig {
    let mut config = ArsConfig::default();
    config.capture.waiting_time_ms = 0;
    config
}

pub fn harness(camera: FakeCamera, classifier: FakeClassifier, broker: RecordingBroker) -> Harness {
    harness_with(test_config(), camera, classifier, broker)
}

pub fn harness_with(
    config: ArsConfig,
    camera: FakeCamera,
    classifier: FakeClassifier,
    broker: RecordingBroker,
) -> Harness {
    let camera = Arc::new(camera);
    let classifier = Arc::new(classifier);
    let broker = Arc::new(broker);
    let event_bus = EventBus::new(1024);

    let orchestrator = Arc::new(Orchestrator::from_config(
        &config,
        camera.clone(),
        classifier.clone(),
        broker.clone(),
        event_bus.clone(),
    ));

    Harness {
        orchestrator,
        camera,
        classifier,
        broker,
        event_bus,
    }
}

// =============================================================================
// Events
// =============================================================================

pub fn event(concept: &str, time: &str) -> Event {
    event_by(concept, time, "W-01")
}

pub fn event_by(concept: &str, time: &str, worker: &str) -> Event {
    Event::from_attributes([
        ("concept:name", concept),
        ("time:timestamp", time),
        ("perform:worker", worker),
        ("location:station", "Assembly 3"),
        ("target:part", "P-1042"),
    ])
    .expect("valid test event")
}
