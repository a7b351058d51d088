//! Orchestration lifecycle events
//!
//! Every state transition of a resolution run is broadcast on the EventBus so
//! the SSE endpoint, tests and diagnostics can follow a run without touching
//! the orchestrator itself.

use crate::model::PublicationTarget;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// States of the orchestrator state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    WindowUpdated,
    Clean,
    Ambiguous,
    Capturing,
    Classifying,
    Reconciling,
    Publishing,
    Failed,
}

/// Orchestrator lifecycle event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OrchestratorEvent {
    /// An incoming event was added to the ambiguity window
    EventObserved {
        run_id: Uuid,
        concept_name: String,
        event_time: DateTime<Utc>,
        window_len: usize,
        timestamp: DateTime<Utc>,
    },

    /// Run moved between states
    StateChanged {
        run_id: Uuid,
        from: RunState,
        to: RunState,
        timestamp: DateTime<Utc>,
    },

    /// Capture burst finished
    FramesAcquired {
        run_id: Uuid,
        /// Frames successfully captured
        frames: usize,
        /// Configured burst size
        requested: usize,
        timestamp: DateTime<Utc>,
    },

    /// Classifier answered
    Classified {
        run_id: Uuid,
        top_class: String,
        confidence: f64,
        resolved: bool,
        timestamp: DateTime<Utc>,
    },

    /// Payload handed to the broker
    Published {
        run_id: Uuid,
        target: PublicationTarget,
        topic: String,
        timestamp: DateTime<Utc>,
    },

    /// Run aborted
    RunFailed {
        run_id: Uuid,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl OrchestratorEvent {
    /// Event type name as used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            OrchestratorEvent::EventObserved { .. } => "EventObserved",
            OrchestratorEvent::StateChanged { .. } => "StateChanged",
            OrchestratorEvent::FramesAcquired { .. } => "FramesAcquired",
            OrchestratorEvent::Classified { .. } => "Classified",
            OrchestratorEvent::Published { .. } => "Published",
            OrchestratorEvent::RunFailed { .. } => "RunFailed",
        }
    }

    /// Run this event belongs to
    pub fn run_id(&self) -> Uuid {
        match self {
            OrchestratorEvent::EventObserved { run_id, .. }
            | OrchestratorEvent::StateChanged { run_id, .. }
            | OrchestratorEvent::FramesAcquired { run_id, .. }
            | OrchestratorEvent::Classified { run_id, .. }
            | OrchestratorEvent::Published { run_id, .. }
            | OrchestratorEvent::RunFailed { run_id, .. } => *run_id,
        }
    }
}

/// Broadcast channel for orchestrator lifecycle events
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<OrchestratorEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Subscribers that fall more than `capacity` events behind lose the oldest ones.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: OrchestratorEvent) {
        let _ = self.tx.send(event);
    }
}
