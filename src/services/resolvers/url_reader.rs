//! URL-content resolver
//!
//! Jina-style reader: `GET {endpoint}/{url}` returns the page rendered as
//! markdown text. An API key, when configured, is passed as a bearer token.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::services::planner::PlannedTask;

use super::Resolver;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = "cardforge/0.1 (reader client)";

#[derive(Debug, Error)]
pub enum UrlReaderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error: status code {0}")]
    Status(u16),
}

pub struct UrlReader {
    client: reqwest::Client,
}

impl UrlReader {
    pub fn new() -> Result<Self, UrlReaderError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| UrlReaderError::Network(e.to_string()))?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: &str, config: &Config) -> Result<String, UrlReaderError> {
        let reader = &config.url_reader;
        let reader_url = format!("{}/{}", reader.endpoint.trim_end_matches('/'), url);

        let mut request = self.client.get(&reader_url);
        if !reader.api_key.is_empty() {
            request = request.bearer_auth(&reader.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UrlReaderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UrlReaderError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| UrlReaderError::Network(e.to_string()))
    }
}

#[async_trait]
impl Resolver for UrlReader {
    async fn resolve(&self, task: &PlannedTask, config: &Config) -> anyhow::Result<String> {
        tracing::debug!(url = %task.location, "crawling url");
        Ok(self.fetch(&task.location, config).await?)
    }
}
