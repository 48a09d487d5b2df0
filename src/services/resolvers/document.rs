//! Document-text resolver
//!
//! Thin format-specific extractor: PDF text via pdf-extract, anything else
//! read as lossy UTF-8 text. Legacy office formats are rejected rather than
//! silently mangled.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::config::Config;
use crate::services::planner::PlannedTask;

use super::Resolver;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Unsupported document format: {0}")]
    Unsupported(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct DocumentReader;

impl DocumentReader {
    fn extract(path: &Path) -> Result<String, DocumentError> {
        if !path.exists() {
            return Err(DocumentError::NotFound(path.display().to_string()));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => pdf_extract::extract_text(path).map_err(|e| DocumentError::Pdf(e.to_string())),
            "doc" | "docx" | "xls" | "xlsx" => Err(DocumentError::Unsupported(ext)),
            _ => {
                let raw = std::fs::read(path)?;
                Ok(String::from_utf8_lossy(&raw).into_owned())
            }
        }
    }
}

#[async_trait]
impl Resolver for DocumentReader {
    async fn resolve(&self, task: &PlannedTask, _config: &Config) -> anyhow::Result<String> {
        let path = std::path::PathBuf::from(&task.location);
        // pdf-extract is CPU-bound; keep it off the async worker
        let content = tokio::task::spawn_blocking(move || Self::extract(&path)).await??;
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn plain_text_is_read_lossily() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"hello \xff world").unwrap();
        let content = DocumentReader::extract(file.path()).unwrap();
        assert!(content.starts_with("hello "));
        assert!(content.ends_with(" world"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = DocumentReader::extract(Path::new("/nonexistent/ref.txt")).unwrap_err();
        assert!(matches!(err, DocumentError::NotFound(_)));
    }

    #[test]
    fn office_formats_are_rejected() {
        let file = tempfile::Builder::new().suffix(".docx").tempfile().unwrap();
        let err = DocumentReader::extract(file.path()).unwrap_err();
        assert!(matches!(err, DocumentError::Unsupported(_)));
    }
}
