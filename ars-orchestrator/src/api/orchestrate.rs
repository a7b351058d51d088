//! Orchestration endpoints
//!
//! - `POST /orchestrate/new-event`: one raw event (XES `<event>` or flat JSON)
//!   through the full ambiguity check
//! - `POST /orchestrate/unambiguous-event`: `{"events": {...}}`, forwarded as is
//! - `POST /orchestrate/ambiguous-event`: `{"events": [...]}`, resolved without
//!   consulting the window

use crate::error::ApiResult;
use crate::services::{ResolutionError, RunReport};
use crate::AppState;
use ars_common::wire::{self, json};
use axum::{extract::State, routing::post, Json, Router};
use tracing::info;

/// POST /orchestrate/new-event
pub async fn new_event(State(state): State<AppState>, body: String) -> ApiResult<Json<RunReport>> {
    let event = wire::decode_event(&body).map_err(ResolutionError::malformed)?;
    info!(concept_name = %event.concept_name(), "New event received over HTTP");

    let report = state.orchestrator.process_event(event).await?;
    Ok(Json(report))
}

/// POST /orchestrate/unambiguous-event
pub async fn unambiguous_event(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<Json<RunReport>> {
    let event = json::decode_single_envelope(&body).map_err(ResolutionError::malformed)?;
    info!(concept_name = %event.concept_name(), "Unambiguous event received over HTTP");

    let report = state.orchestrator.publish_unambiguous(event).await?;
    Ok(Json(report))
}

/// POST /orchestrate/ambiguous-event
pub async fn ambiguous_event(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<Json<RunReport>> {
    let batch = json::decode_batch_envelope(&body).map_err(ResolutionError::malformed)?;
    info!(events = batch.len(), "Ambiguous batch received over HTTP");

    let report = state.orchestrator.resolve_ambiguous_batch(batch).await?;
    Ok(Json(report))
}

/// Build orchestration routes
pub fn orchestrate_routes() -> Router<AppState> {
    Router::new()
        .route("/orchestrate/new-event", post(new_event))
        .route("/orchestrate/unambiguous-event", post(unambiguous_event))
        .route("/orchestrate/ambiguous-event", post(ambiguous_event))
}
