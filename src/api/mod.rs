//! HTTP API handlers

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

pub mod health;
pub mod process;
pub mod submit;

/// Reference-processing routes, nested under /api/file
pub fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/submit", post(submit::submit))
        .route("/status/:process_id", get(process::status))
        .route("/update_task_result", post(process::update_task_result))
        .route("/generate_card", post(process::generate_card))
}

/// Health routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health::health_check))
}
