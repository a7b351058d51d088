//! Integration tests for ars-orchestrator API endpoints
//!
//! Tests cover:
//! - Health endpoint
//! - POST /orchestrate/new-event (XES and JSON bodies, malformed input)
//! - POST /orchestrate/unambiguous-event
//! - POST /orchestrate/ambiguous-event (resolved, camera failure, empty burst)

mod helpers;

use ars_common::wire::{json, xes};
use ars_orchestrator::{build_router, AppState};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use helpers::*;
use serde_json::Value;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: Create app around a harness
fn setup_app(h: &Harness) -> axum::Router {
    build_router(AppState::new(h.orchestrator.clone()))
}

fn default_harness() -> Harness {
    harness(
        FakeCamera::healthy(),
        FakeClassifier::answering("inspect", 0.97),
        RecordingBroker::new(),
    )
}

/// Test helper: Create request with a text body
fn post(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::from(body))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

fn pair() -> Vec<ars_common::Event> {
    vec![
        event_by("pick", "2024-03-01T10:00:00.000Z", "W-01"),
        event_by("place", "2024-03-01T10:00:00.250Z", "W-02"),
    ]
}

// =============================================================================
// Health Endpoint Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let h = default_harness();
    let app = setup_app(&h);

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "ars-orchestrator");
    assert!(body["version"].is_string());
    assert_eq!(body["window_len"], 0);
    assert_eq!(body["window_capacity"], 6);
    assert_eq!(body["runs_failed"], 0);
    assert!(body.get("last_error").is_none());
}

// =============================================================================
// New Event Tests
// =============================================================================

#[tokio::test]
async fn test_new_event_xes_is_forwarded_clean() {
    let h = default_harness();
    let app = setup_app(&h);

    let body = xes::encode_event(&event("pick", "2024-03-01T10:00:00.000Z")).unwrap();
    let response = app
        .oneshot(post("/orchestrate/new-event", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let report = extract_json(response.into_body()).await;
    assert_eq!(report["path"], "clean");
    assert_eq!(report["topic"], RESOLVED_TOPIC);
    assert!(report.get("frames_captured").is_none());
    assert_eq!(h.broker.on_topic(RESOLVED_TOPIC).len(), 1);
}

#[tokio::test]
async fn test_new_event_close_pair_is_resolved() {
    let h = default_harness();

    for event in pair() {
        let body = xes::encode_event(&event).unwrap();
        let response = setup_app(&h)
            .oneshot(post("/orchestrate/new-event", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let resolved = h.broker.on_topic(RESOLVED_TOPIC);
    assert_eq!(resolved.len(), 2);
    assert_eq!(xes::decode_event(&resolved[1]).unwrap().concept_name(), "inspect");
}

#[tokio::test]
async fn test_new_event_malformed_is_bad_request() {
    let h = default_harness();
    let app = setup_app(&h);

    let body = r#"<event><string key="concept:name" value="pick"/></event>"#.to_string();
    let response = app
        .oneshot(post("/orchestrate/new-event", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "MALFORMED_EVENT");
    assert_eq!(h.orchestrator.status().await.window_len, 0);
}

// =============================================================================
// Unambiguous Event Tests
// =============================================================================

#[tokio::test]
async fn test_unambiguous_event_is_published() {
    let h = default_harness();
    let app = setup_app(&h);

    let body = r#"{"events": {"concept:name": "pick", "time:timestamp": "2024-09-11T16:00:52",
        "perform:worker": "W-01", "location:station": "Assembly 3"}}"#
        .to_string();
    let response = app
        .oneshot(post("/orchestrate/unambiguous-event", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await["path"], "clean");
    assert_eq!(h.broker.on_topic(RESOLVED_TOPIC).len(), 1);
    assert_eq!(h.orchestrator.status().await.window_len, 0);
}

// =============================================================================
// Ambiguous Event Tests
// =============================================================================

#[tokio::test]
async fn test_ambiguous_event_is_resolved() {
    let h = default_harness();
    let app = setup_app(&h);

    let body = json::encode_batch(&pair()).unwrap();
    let response = app
        .oneshot(post("/orchestrate/ambiguous-event", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let report = extract_json(response.into_body()).await;
    assert_eq!(report["path"], "resolved");
    assert_eq!(report["frames_captured"], 5);
    assert_eq!(report["top_class"], "inspect");
    assert_eq!(report["confidence"], 0.97);
}

#[tokio::test]
async fn test_ambiguous_event_low_confidence_is_escalated() {
    let h = harness(
        FakeCamera::healthy(),
        FakeClassifier::answering("inspect", 0.40),
        RecordingBroker::new(),
    );
    let app = setup_app(&h);

    let body = json::encode_batch(&pair()).unwrap();
    let response = app
        .oneshot(post("/orchestrate/ambiguous-event", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let report = extract_json(response.into_body()).await;
    assert_eq!(report["path"], "escalated");
    assert_eq!(report["topic"], ESCALATED_TOPIC);
    assert_eq!(report["confidence_breakdown"]["inspect"], 0.40);
}

#[tokio::test]
async fn test_ambiguous_event_camera_down_is_bad_gateway() {
    let h = harness(
        FakeCamera::unreachable(),
        FakeClassifier::answering("inspect", 0.97),
        RecordingBroker::new(),
    );
    let app = setup_app(&h);

    let body = json::encode_batch(&pair()).unwrap();
    let response = app
        .oneshot(post("/orchestrate/ambiguous-event", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "CAMERA_UNREACHABLE");
    assert_eq!(h.broker.on_topic(ESCALATED_TOPIC).len(), 1);
}

#[tokio::test]
async fn test_ambiguous_event_without_frames_is_unprocessable() {
    let h = harness(
        FakeCamera::failing_attempts(&[1, 2, 3, 4, 5]),
        FakeClassifier::answering("inspect", 0.97),
        RecordingBroker::new(),
    );
    let app = setup_app(&h);

    let body = json::encode_batch(&pair()).unwrap();
    let response = app
        .oneshot(post("/orchestrate/ambiguous-event", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "EMPTY_FRAME_BATCH");
}

#[tokio::test]
async fn test_ambiguous_event_empty_batch_is_bad_request() {
    let h = default_harness();
    let app = setup_app(&h);

    let response = app
        .oneshot(post("/orchestrate/ambiguous-event", r#"{"events": []}"#.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "EMPTY_AMBIGUOUS_BATCH");
    assert!(h.camera.calls().is_empty());
}
