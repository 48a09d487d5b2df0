//! Process status, user edits, and card generation triggers

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::ProcessState;
use crate::services::{plan_synthesis_task, PipelineExecutor};
use crate::AppState;

/// GET /api/file/status/{process_id}
///
/// Full process state: profile, ordered sub-tasks, finished flag, final
/// artifact if present. Always reflects the latest known state, including
/// partial failures. Any id that does not name a live process is a 404,
/// malformed ids included.
pub async fn status(
    State(state): State<AppState>,
    Path(process_id): Path<String>,
) -> ApiResult<Json<ProcessState>> {
    let process_id: Uuid = process_id
        .parse()
        .map_err(|_| ApiError::NotFound(format!("Process ID not found: {}", process_id)))?;
    let snapshot = state.store.snapshot(process_id).await?;
    Ok(Json(snapshot))
}

/// POST /api/file/update_task_result request
#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub process_id: Uuid,
    pub step_id: String,
    pub new_summary: String,
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// POST /api/file/update_task_result
///
/// User-edited replacement of a sub-task's result text, prior to
/// generation. Unknown process or step is a 400.
pub async fn update_task_result(
    State(state): State<AppState>,
    Json(request): Json<UpdateTaskRequest>,
) -> ApiResult<Json<AckResponse>> {
    state
        .store
        .update_task_result(request.process_id, &request.step_id, request.new_summary)
        .await
        .map_err(|e| ApiError::BadRequest(format!("Update failed: {}", e)))?;

    Ok(Json(AckResponse {
        status: "success".to_string(),
        message: None,
    }))
}

/// POST /api/file/generate_card request
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub process_id: Uuid,
}

/// POST /api/file/generate_card
///
/// Triggers the synthesis phase: one card_generation task appended and run
/// in the background. Rejected (409) while the previous phase is still
/// running or a synthesis is already in flight; a regenerate after a
/// completed synthesis replaces the prior card. The guard checks and the
/// phase transition are one atomic store operation, so concurrent requests
/// cannot both start a synthesis.
pub async fn generate_card(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<Json<AckResponse>> {
    let process_id = request.process_id;
    state.store.begin_synthesis(process_id).await?;

    tracing::info!(process_id = %process_id, "synthesis phase started");
    PipelineExecutor::new(state.store.clone()).spawn(process_id, vec![plan_synthesis_task()]);

    Ok(Json(AckResponse {
        status: "success".to_string(),
        message: Some("Generation started".to_string()),
    }))
}
