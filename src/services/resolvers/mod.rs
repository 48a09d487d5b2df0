//! Content resolvers
//!
//! One resolver per reference kind behind a uniform capability interface.
//! Resolvers receive the planned task plus the configuration loaded for the
//! current pipeline run, and return extracted text or an error that fails
//! only the enclosing task.

use async_trait::async_trait;

use crate::config::Config;
use crate::services::planner::PlannedTask;

mod document;
mod image_tagger;
mod url_reader;

pub use document::DocumentReader;
pub use image_tagger::ImageTagger;
pub use url_reader::UrlReader;

/// Uniform resolver contract: extracted content on success, a task-level
/// error otherwise.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, task: &PlannedTask, config: &Config) -> anyhow::Result<String>;
}
