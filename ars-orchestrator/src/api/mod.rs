//! HTTP API handlers for ars-orchestrator
//!
//! REST entry points mirroring the broker ingestion path, plus health and an
//! SSE stream of orchestration lifecycle events.

pub mod health;
pub mod orchestrate;
pub mod sse;

pub use health::health_routes;
pub use orchestrate::orchestrate_routes;
pub use sse::event_stream;
