//! cardforge - character card generation service
//!
//! Turns a heterogeneous bundle of user-supplied reference material about a
//! fictional character into a structured character card: references are
//! resolved into text by background workers, reviewed and edited by the
//! user, then synthesized into a card embedded in a distributable PNG.

pub mod api;
pub mod artifact;
pub mod config;
pub mod error;
pub mod models;
pub mod prompts;
pub mod services;
pub mod store;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};

use crate::store::ProcessStore;

/// Uploads can carry sizable documents and images
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// In-memory process store, the single source of truth
    pub store: ProcessStore,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            store: ProcessStore::new(),
            startup_time: Utc::now(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/file", api::file_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
