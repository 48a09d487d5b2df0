//! Image-tag resolver
//!
//! Uploads the image to a deepdanbooru-style tagger and scrapes the tag
//! names out of the HTML reply. Rating tags are dropped; the remaining tags
//! are joined with commas.

use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::services::planner::PlannedTask;

use super::Resolver;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum TaggerError {
    #[error("Image tagger endpoint not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Fetch error: status code {0}")]
    Status(u16),

    #[error("No tags found in tagger response")]
    NoTags,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct ImageTagger {
    client: reqwest::Client,
}

impl ImageTagger {
    pub fn new() -> Result<Self, TaggerError> {
        let client = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| TaggerError::Network(e.to_string()))?;
        Ok(Self { client })
    }

    /// Pull tag names out of the tagger's HTML result table, dropping
    /// rating rows.
    fn parse_tags(html: &str) -> Result<String, TaggerError> {
        // <td><a ...>tag_name</a></td> rows
        let cell = Regex::new(r"<td>\s*<a[^>]*>([^<]+)</a>").expect("static regex");
        let tags: Vec<&str> = cell
            .captures_iter(html)
            .map(|c| c.get(1).expect("capture group").as_str().trim())
            .filter(|tag| !tag.contains("rating"))
            .collect();
        if tags.is_empty() {
            return Err(TaggerError::NoTags);
        }
        Ok(tags.join(","))
    }

    async fn tag_image(&self, image_path: &str, config: &Config) -> Result<String, TaggerError> {
        let tagger = &config.image_tagger;
        if tagger.endpoint.is_empty() {
            return Err(TaggerError::NotConfigured);
        }

        let bytes = tokio::fs::read(image_path).await?;
        let file_name = std::path::Path::new(image_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            )
            .text("network_type", "general")
            .text("crop", "false");

        let mut request = self.client.post(&tagger.endpoint).multipart(form);
        if !tagger.cookie.is_empty() {
            request = request.header(reqwest::header::COOKIE, tagger.cookie.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|e| TaggerError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TaggerError::Status(status.as_u16()));
        }

        let html = response
            .text()
            .await
            .map_err(|e| TaggerError::Network(e.to_string()))?;
        Self::parse_tags(&html)
    }
}

#[async_trait]
impl Resolver for ImageTagger {
    async fn resolve(&self, task: &PlannedTask, config: &Config) -> anyhow::Result<String> {
        tracing::debug!(image = %task.location, "tagging image");
        Ok(self.tag_image(&task.location, config).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags_and_drops_rating_rows() {
        let html = r#"
            <table>
              <tr><td><a class="tag">blue_hair</a></td><td>0.99</td></tr>
              <tr><td><a class="tag">long_hair</a></td><td>0.95</td></tr>
              <tr><td><a class="tag">rating:safe</a></td><td>0.90</td></tr>
            </table>"#;
        assert_eq!(ImageTagger::parse_tags(html).unwrap(), "blue_hair,long_hair");
    }

    #[test]
    fn empty_table_is_an_error() {
        assert!(matches!(
            ImageTagger::parse_tags("<table></table>"),
            Err(TaggerError::NoTags)
        ));
    }
}
