//! Configuration module for feedhook.

use serde::Deserialize;
use std::path::Path;

use crate::{FeedhookError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/feedhook.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Upper bound for `extractor.max_retries`.
pub const MAX_FETCH_RETRIES: usize = 1;

/// External property extractor configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Per-fetch timeout in milliseconds, including the body read.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_ms: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum page size in bytes.
    #[serde(default = "default_max_page_size")]
    pub max_page_size_bytes: u64,
    /// Automatic retries after a fetch failure or timeout (0 or 1).
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// User agent sent with page requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Lifetime of cached extraction results in seconds (0 = until restart).
    #[serde(default)]
    pub cache_ttl_secs: u64,
    /// Allow fetching from loopback and private networks.
    #[serde(default)]
    pub allow_private_hosts: bool,
}

fn default_connect_timeout() -> u64 {
    3
}

fn default_fetch_timeout() -> u64 {
    5000
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_page_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_max_retries() -> usize {
    1
}

fn default_user_agent() -> String {
    "feedhook/0.1 (external properties)".to_string()
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            fetch_timeout_ms: default_fetch_timeout(),
            max_redirects: default_max_redirects(),
            max_page_size_bytes: default_max_page_size(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
            cache_ttl_secs: 0,
            allow_private_hosts: false,
        }
    }
}

/// Preview configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    /// Pick a random sample article when no article id is requested.
    #[serde(default = "default_random_sample")]
    pub random_sample: bool,
}

fn default_random_sample() -> bool {
    true
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            random_sample: default_random_sample(),
        }
    }
}

/// A feed served by the feed-backed article source.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FeedSourceConfig {
    /// Feed identifier used in API paths.
    pub id: String,
    /// RSS/Atom feed URL.
    pub url: String,
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Extractor configuration.
    #[serde(default)]
    pub extractor: ExtractorConfig,
    /// Preview configuration.
    #[serde(default)]
    pub preview: PreviewConfig,
    /// Feeds available to previews.
    #[serde(default)]
    pub feeds: Vec<FeedSourceConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FeedhookError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FeedhookError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FEEDHOOK_PORT`: Override the HTTP port
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("FEEDHOOK_PORT") {
            match port.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid FEEDHOOK_PORT value: {}", port),
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The fetch timeout is zero
    /// - A feed entry has an empty id or a non-http(s) URL
    /// - Two feed entries share an id
    pub fn validate(&self) -> Result<()> {
        if self.extractor.fetch_timeout_ms == 0 {
            return Err(FeedhookError::Config(
                "extractor.fetch_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.extractor.max_retries > MAX_FETCH_RETRIES {
            return Err(FeedhookError::Config(format!(
                "extractor.max_retries must be at most {MAX_FETCH_RETRIES}"
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for feed in &self.feeds {
            if feed.id.trim().is_empty() {
                return Err(FeedhookError::Config("feed id must not be empty".to_string()));
            }
            let valid_url = url::Url::parse(&feed.url)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid_url {
                return Err(FeedhookError::Config(format!(
                    "feed '{}' has an invalid URL: {}",
                    feed.id, feed.url
                )));
            }
            if !seen.insert(feed.id.as_str()) {
                return Err(FeedhookError::Config(format!(
                    "duplicate feed id: {}",
                    feed.id
                )));
            }
        }
        Ok(())
    }
}
