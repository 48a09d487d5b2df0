//! External-service configuration
//!
//! Endpoint URLs, API keys and model identifiers live in a TOML file and are
//! re-read at the start of every pipeline run, so operators can change them
//! between processes without a restart. A missing file yields defaults with
//! a warning; resolvers fail per-task when a required key is absent.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "CARDFORGE_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "cardforge.toml";

/// Generative model endpoint (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
}

/// URL-content resolver (jina-style reader: GET {endpoint}/{url})
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlReaderConfig {
    #[serde(default = "default_url_reader_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
}

fn default_url_reader_endpoint() -> String {
    "https://r.jina.ai".to_string()
}

impl Default for UrlReaderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_url_reader_endpoint(),
            api_key: String::new(),
        }
    }
}

/// Image-tag resolver (deepdanbooru-style HTML upload form)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageTaggerConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub cookie: String,
}

/// Asynchronous research provider (submit → poll → terminal state)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_search_agent")]
    pub agent: String,
    /// Overall poll budget in minutes (polled every 10 seconds)
    #[serde(default = "default_search_timeout_minutes")]
    pub timeout_minutes: u64,
}

fn default_search_agent() -> String {
    "deep-research-pro-preview-12-2025".to_string()
}

fn default_search_timeout_minutes() -> u64 {
    30
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            agent: default_search_agent(),
            timeout_minutes: default_search_timeout_minutes(),
        }
    }
}

/// Full service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the HTTP server binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Directory for per-submission uploaded files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Optional static frontend directory, served as router fallback
    #[serde(default)]
    pub frontend_dir: Option<PathBuf>,

    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub url_reader: UrlReaderConfig,
    #[serde(default)]
    pub image_tagger: ImageTaggerConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

fn default_listen_addr() -> String {
    "127.0.0.1:9986".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            data_dir: default_data_dir(),
            frontend_dir: None,
            llm: LlmConfig::default(),
            url_reader: UrlReaderConfig::default(),
            image_tagger: ImageTaggerConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Config {
    /// Resolve the config file path from the environment.
    pub fn path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load the configuration from disk. Called at the start of every
    /// pipeline run, never cached across runs.
    pub fn load() -> Config {
        Self::load_from(&Self::path())
    }

    /// Load from an explicit path. Missing or malformed files degrade to
    /// defaults so a misconfigured box still serves status queries.
    pub fn load_from(path: &Path) -> Config {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "config parse failed, using defaults");
                    Config::default()
                }
            },
            Err(_) => {
                warn!(path = %path.display(), "config file not found, using defaults");
                Config::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/cardforge.toml"));
        assert_eq!(config.listen_addr, "127.0.0.1:9986");
        assert_eq!(config.url_reader.endpoint, "https://r.jina.ai");
        assert_eq!(config.search.timeout_minutes, 30);
    }

    #[test]
    fn partial_file_fills_remaining_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
listen_addr = "0.0.0.0:8080"

[llm]
endpoint = "https://api.example.com/v1"
api_key = "sk-test"
model = "test-model"

[search]
endpoint = "https://research.example.com/v1beta/interactions"
api_key = "g-test"
timeout_minutes = 5
"#
        )
        .unwrap();

        let config = Config::load_from(file.path());
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.llm.model, "test-model");
        assert_eq!(config.search.timeout_minutes, 5);
        assert_eq!(config.search.agent, "deep-research-pro-preview-12-2025");
        assert_eq!(config.url_reader.endpoint, "https://r.jina.ai");
    }

    #[test]
    fn malformed_file_degrades_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not [valid toml").unwrap();
        let config = Config::load_from(file.path());
        assert_eq!(config.data_dir, PathBuf::from("data"));
    }
}
