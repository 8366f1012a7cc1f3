//! Handlers for the mirror sync status and manual trigger.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use clientdesk_core::error::CoreError;
use clientdesk_sync::SyncOrchestrator;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

fn orchestrator(state: &AppState) -> AppResult<&Arc<SyncOrchestrator>> {
    state
        .sync
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Mirror sync is not configured".into()))
}

/// GET /api/v1/admin/sync
///
/// Current phase and the report of the last finished cycle.
pub async fn get_sync_status(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let status = orchestrator(&state)?.status();
    Ok(Json(DataResponse { data: status }))
}

/// POST /api/v1/admin/sync
///
/// Start a cycle in the background and return 202 immediately. Returns 409
/// while another cycle is running.
pub async fn trigger_sync(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let orchestrator = Arc::clone(orchestrator(&state)?);
    if orchestrator.is_running() {
        return Err(AppError::Core(CoreError::Conflict(
            "A sync cycle is already running".into(),
        )));
    }

    tracing::info!("Manual sync requested");
    let cancel = state.shutdown.clone();
    let task_orchestrator = Arc::clone(&orchestrator);
    tokio::spawn(async move {
        clientdesk_sync::run_detached(&task_orchestrator, &cancel).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: orchestrator.status(),
        }),
    ))
}
