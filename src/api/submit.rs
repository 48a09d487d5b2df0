//! Submission handler
//!
//! Multipart form: a JSON-encoded profile in the `data` field plus zero or
//! more file parts. Files are matched to `PENDING_UPLOAD` reference entries
//! in list order and persisted under a per-submission directory, then the
//! reference-resolution phase is launched in the background.

use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::models::{CharacterProfile, ProcessState, ReferenceKind, PENDING_UPLOAD};
use crate::services::{plan_reference_tasks, PipelineExecutor};
use crate::AppState;

/// POST /api/file/submit response
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub status: String,
    pub process_id: Uuid,
    pub message: String,
}

/// An uploaded file part, in multipart order
struct UploadedFile {
    file_name: String,
    bytes: Vec<u8>,
}

/// Filesystem-safe directory stem from the character name.
fn safe_dir_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .collect();
    let cleaned = cleaned.trim().replace(' ', "_");
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

/// Persist uploaded files and rewrite `PENDING_UPLOAD` locations in list
/// order. URL references get their display name set to their URL.
fn attach_uploads(
    profile: &mut CharacterProfile,
    files: Vec<UploadedFile>,
    config: &Config,
) -> ApiResult<()> {
    let submission_dir = config.data_dir.join(format!(
        "{}_{}",
        safe_dir_name(&profile.character_name),
        Utc::now().timestamp()
    ));
    let files_dir = submission_dir.join("files");
    if !files.is_empty() {
        std::fs::create_dir_all(&files_dir)?;
    }

    let mut uploads = files.into_iter();
    for reference in &mut profile.reference {
        match reference.resource_type {
            ReferenceKind::File | ReferenceKind::Image
                if reference.resource_url == PENDING_UPLOAD =>
            {
                let Some(upload) = uploads.next() else {
                    return Err(ApiError::Internal(
                        "Fewer uploaded files than pending references".to_string(),
                    ));
                };
                let save_path = files_dir.join(&upload.file_name);
                std::fs::write(&save_path, &upload.bytes)?;
                reference.resource_url = save_path.to_string_lossy().into_owned();
                reference.file_name = Some(upload.file_name);
            }
            ReferenceKind::Url => {
                reference.file_name = Some(reference.resource_url.clone());
            }
            _ => {}
        }
    }

    Ok(())
}

/// POST /api/file/submit
///
/// Records initial state and returns immediately; the pipeline runs in the
/// background. Per the frontend contract, any submission failure surfaces
/// as a 500 with the error text.
pub async fn submit(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<SubmitResponse>> {
    let mut profile: Option<CharacterProfile> = None;
    let mut files: Vec<UploadedFile> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Internal(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("data") {
            let raw = field
                .text()
                .await
                .map_err(|e| ApiError::Internal(format!("Multipart error: {}", e)))?;
            profile = Some(
                serde_json::from_str(&raw)
                    .map_err(|e| ApiError::Internal(format!("Invalid profile JSON: {}", e)))?,
            );
        } else {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::Internal(format!("Multipart error: {}", e)))?;
            files.push(UploadedFile {
                file_name,
                bytes: bytes.to_vec(),
            });
        }
    }

    let mut profile =
        profile.ok_or_else(|| ApiError::Internal("Missing `data` field".to_string()))?;

    let config = Config::load();
    attach_uploads(&mut profile, files, &config)?;

    let tasks = plan_reference_tasks(&profile);
    let process_id = state.store.insert(ProcessState::new(profile)).await;

    tracing::info!(
        process_id = %process_id,
        tasks = tasks.len(),
        "submission accepted, reference phase started"
    );

    PipelineExecutor::new(state.store.clone()).spawn(process_id, tasks);

    Ok(Json(SubmitResponse {
        status: "success".to_string(),
        process_id,
        message: "Task submitted, processing started.".to_string(),
    }))
}
