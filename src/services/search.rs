//! Long-poll search client
//!
//! Drives an asynchronous research-provider job to completion:
//! submit → job id → poll on a fixed interval → terminal state.
//!
//! Retry policy, reproduced faithfully from the provider protocol:
//! - Submit retries transport failures and server-side 5xx up to a bounded
//!   count with exponential backoff; any other failure is immediate.
//! - Polling masks transient trouble: transport failures count toward a
//!   consecutive-failure ceiling, while any completed poll request resets
//!   that counter to zero before its payload is even looked at. Non-2xx
//!   statuses and malformed bodies are skipped without counting.
//! - Exhausting the poll budget without a terminal state is a timeout.
//!
//! The wire exchange lives behind `ResearchTransport` so the protocol
//! driver can be exercised with scripted replies.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::{Config, SearchConfig};
use crate::services::planner::PlannedTask;
use crate::services::resolvers::Resolver;

/// Fixed poll interval (10 time-units of the protocol)
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Polls per configured timeout minute (60s / POLL_INTERVAL)
pub const POLLS_PER_MINUTE: u64 = 6;

/// Consecutive transport-failure ceiling during polling
pub const MAX_CONSECUTIVE_NET_ERRORS: u32 = 10;

/// Bounded retry count for the submit request
pub const SUBMIT_MAX_RETRIES: u32 = 3;

const SUBMIT_BACKOFF_BASE: Duration = Duration::from_secs(1);
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Search client errors
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search API key not configured")]
    NotConfigured,

    #[error("Network error (initial request): {0}")]
    SubmitNetwork(String),

    #[error("API error ({0})")]
    SubmitStatus(u16),

    #[error("Malformed submission response")]
    MalformedSubmitBody,

    #[error("Cannot find job id in submission response")]
    MissingJobId,

    #[error("Polling failed: network unstable ({0})")]
    NetworkUnstable(String),

    #[error("Research failed: {0}")]
    ProviderFailed(String),

    #[error("Research completed but output is empty")]
    EmptyOutput,

    #[error("Timeout: research took too long")]
    Timeout,
}

/// Outcome of one transport exchange
#[derive(Debug, Clone)]
pub enum Reply {
    /// Connection-level failure: refused, reset, timeout, TLS
    Transport(String),
    /// A completed HTTP exchange; `body` is None when the payload was not
    /// valid JSON
    Http { status: u16, body: Option<Value> },
}

/// Wire exchange with the research provider
#[async_trait]
pub trait ResearchTransport: Send + Sync {
    /// Submit a research job for the query.
    async fn submit(&self, query: &str) -> Reply;
    /// Poll the state of a previously submitted job.
    async fn poll(&self, job_id: &str) -> Reply;
}

/// reqwest-backed transport against the configured provider endpoint
pub struct HttpResearchTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    agent: String,
}

impl HttpResearchTransport {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        if config.api_key.is_empty() {
            return Err(SearchError::NotConfigured);
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| SearchError::SubmitNetwork(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            agent: config.agent.clone(),
        })
    }

    async fn reply_of(response: Result<reqwest::Response, reqwest::Error>) -> Reply {
        match response {
            Err(e) => Reply::Transport(e.to_string()),
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.json::<Value>().await.ok();
                Reply::Http { status, body }
            }
        }
    }
}

#[async_trait]
impl ResearchTransport for HttpResearchTransport {
    async fn submit(&self, query: &str) -> Reply {
        let payload = serde_json::json!({
            "input": query,
            "agent": self.agent,
            "background": true,
        });
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .timeout(SUBMIT_TIMEOUT)
            .json(&payload)
            .send()
            .await;
        Self::reply_of(response).await
    }

    async fn poll(&self, job_id: &str) -> Reply {
        let response = self
            .client
            .get(format!("{}/{}", self.endpoint, job_id))
            .header("x-goog-api-key", &self.api_key)
            .timeout(POLL_TIMEOUT)
            .send()
            .await;
        Self::reply_of(response).await
    }
}

/// Protocol driver: bounded submit retry plus the poll loop with its
/// consecutive-failure circuit breaker.
pub struct LongPollClient<T> {
    transport: T,
    poll_interval: Duration,
    backoff_base: Duration,
    max_polls: u64,
}

impl<T: ResearchTransport> LongPollClient<T> {
    pub fn new(transport: T, timeout_minutes: u64) -> Self {
        Self {
            transport,
            poll_interval: POLL_INTERVAL,
            backoff_base: SUBMIT_BACKOFF_BASE,
            max_polls: timeout_minutes * POLLS_PER_MINUTE,
        }
    }

    /// Override timing for tests; the retry policy itself is fixed.
    #[doc(hidden)]
    pub fn with_timing(mut self, poll_interval: Duration, backoff_base: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.backoff_base = backoff_base;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run a research job to a terminal state and return its content.
    pub async fn run(&self, query: &str) -> Result<String, SearchError> {
        let body = self.submit_with_retry(query).await?;
        let job_id = extract_job_id(&body).ok_or(SearchError::MissingJobId)?;
        tracing::info!(job_id = %job_id, "research job submitted, polling for completion");
        self.poll_until_terminal(&job_id).await
    }

    async fn submit_with_retry(&self, query: &str) -> Result<Value, SearchError> {
        let mut attempt: u32 = 0;
        loop {
            let failure = match self.transport.submit(query).await {
                Reply::Http { status, body } if (200..300).contains(&status) => {
                    return body.ok_or(SearchError::MalformedSubmitBody);
                }
                // Server-side trouble is worth retrying; everything else is not
                Reply::Http { status, .. } if (500..600).contains(&status) => {
                    SearchError::SubmitStatus(status)
                }
                Reply::Http { status, .. } => return Err(SearchError::SubmitStatus(status)),
                Reply::Transport(e) => SearchError::SubmitNetwork(e),
            };

            if attempt >= SUBMIT_MAX_RETRIES {
                return Err(failure);
            }
            let backoff = self.backoff_base * 2u32.pow(attempt);
            tracing::warn!(
                attempt = attempt + 1,
                error = %failure,
                "research submit failed, retrying after {:?}",
                backoff
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    async fn poll_until_terminal(&self, job_id: &str) -> Result<String, SearchError> {
        let mut consecutive_net_errors: u32 = 0;

        for count in 0..self.max_polls {
            tokio::time::sleep(self.poll_interval).await;

            let (status, body) = match self.transport.poll(job_id).await {
                Reply::Transport(e) => {
                    consecutive_net_errors += 1;
                    tracing::warn!(
                        job_id = %job_id,
                        consecutive = consecutive_net_errors,
                        ceiling = MAX_CONSECUTIVE_NET_ERRORS,
                        error = %e,
                        "network fluctuation while polling"
                    );
                    if consecutive_net_errors >= MAX_CONSECUTIVE_NET_ERRORS {
                        return Err(SearchError::NetworkUnstable(e));
                    }
                    continue;
                }
                Reply::Http { status, body } => {
                    // Any completed poll request clears the breaker,
                    // whatever its payload says
                    consecutive_net_errors = 0;
                    (status, body)
                }
            };

            if !(200..300).contains(&status) {
                tracing::warn!(job_id = %job_id, status, "polling HTTP error, retrying");
                continue;
            }

            let Some(body) = body else {
                tracing::warn!(job_id = %job_id, "invalid JSON received, retrying");
                continue;
            };

            let job_status = body.get("status").and_then(Value::as_str).unwrap_or("");
            tracing::debug!(job_id = %job_id, poll = count + 1, status = job_status, "research status");

            match job_status {
                "completed" => {
                    // Missing `text` on the last output is an empty result,
                    // not an error; only an empty outputs list is
                    let last = body
                        .get("outputs")
                        .and_then(Value::as_array)
                        .and_then(|outputs| outputs.last());
                    return match last {
                        Some(output) => Ok(output
                            .get("text")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string()),
                        None => Err(SearchError::EmptyOutput),
                    };
                }
                "failed" => {
                    let message = body
                        .get("error")
                        .map(|e| match e.as_str() {
                            Some(s) => s.to_string(),
                            None => e.to_string(),
                        })
                        .unwrap_or_else(|| "Unknown error".to_string());
                    return Err(SearchError::ProviderFailed(message));
                }
                _ => continue,
            }
        }

        Err(SearchError::Timeout)
    }
}

/// Job identifier from the submission response: `id`, or the trailing
/// segment of a resource `name`.
fn extract_job_id(body: &Value) -> Option<String> {
    if let Some(id) = body.get("id").and_then(Value::as_str) {
        return Some(id.to_string());
    }
    body.get("name")
        .and_then(Value::as_str)
        .and_then(|name| name.rsplit('/').next())
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_string())
}

/// Resolver adapter for `search` tasks
pub struct SearchResolver;

#[async_trait]
impl Resolver for SearchResolver {
    async fn resolve(&self, task: &PlannedTask, config: &Config) -> anyhow::Result<String> {
        let transport = HttpResearchTransport::new(&config.search)?;
        let client = LongPollClient::new(transport, config.search.timeout_minutes);
        Ok(client.run(&task.location).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_prefers_id_field() {
        let body = serde_json::json!({"id": "job-1", "name": "interactions/job-2"});
        assert_eq!(extract_job_id(&body).as_deref(), Some("job-1"));
    }

    #[test]
    fn job_id_falls_back_to_name_tail() {
        let body = serde_json::json!({"name": "v1beta/interactions/job-42"});
        assert_eq!(extract_job_id(&body).as_deref(), Some("job-42"));
    }

    #[test]
    fn missing_job_id_is_none() {
        assert_eq!(extract_job_id(&serde_json::json!({})), None);
        assert_eq!(extract_job_id(&serde_json::json!({"name": ""})), None);
    }
}
