//! External property extraction.
//!
//! Resolves one external property against one article: fetch the page the
//! article links to, apply the CSS selector, return the value. Results are
//! memoized per `(url, selector)`.

mod cache;
mod selector;

use std::time::Duration;

use thiserror::Error;

use crate::config::{ExtractorConfig, MAX_FETCH_RETRIES};
use crate::fetcher::{FetchError, PageFetcher};

pub use cache::ExtractionCache;
pub use selector::PageSelector;

/// Base delay between retries.
const RETRY_BACKOFF_MS: u64 = 100;

/// Why an external property produced no value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The page could not be fetched.
    #[error("failed to fetch page: {0}")]
    Fetch(String),
    /// The page did not arrive before the timeout.
    #[error("page fetch timed out")]
    Timeout,
    /// The selector matched nothing (or only blank content).
    #[error("selector matched nothing")]
    NoMatch,
    /// The selector could not be parsed.
    #[error("invalid CSS selector: {0}")]
    InvalidSelector(String),
}

impl From<FetchError> for ExtractError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Timeout => ExtractError::Timeout,
            other => ExtractError::Fetch(other.to_string()),
        }
    }
}

/// Fetches pages and extracts external property values.
#[derive(Debug)]
pub struct ExternalPropertyExtractor {
    fetcher: PageFetcher,
    cache: ExtractionCache,
    fetch_timeout: Duration,
    max_retries: usize,
}

impl ExternalPropertyExtractor {
    /// Create an extractor from configuration.
    pub fn new(config: &ExtractorConfig) -> Result<Self, FetchError> {
        let fetcher = PageFetcher::new(config)?;
        let ttl = (config.cache_ttl_secs > 0).then(|| Duration::from_secs(config.cache_ttl_secs));

        Ok(Self {
            fetcher,
            cache: ExtractionCache::new(ttl),
            fetch_timeout: Duration::from_millis(config.fetch_timeout_ms),
            max_retries: config.max_retries.min(MAX_FETCH_RETRIES),
        })
    }

    /// The extraction cache.
    pub fn cache(&self) -> &ExtractionCache {
        &self.cache
    }

    /// Extract the value `css_selector` designates on the page at `url`.
    pub async fn extract(&self, url: &str, css_selector: &str) -> Result<String, ExtractError> {
        let selector = PageSelector::parse(css_selector)?;

        if let Some(cached) = self.cache.get(url, css_selector) {
            tracing::debug!("Extraction cache hit for {} ({})", url, css_selector);
            return cached;
        }

        let html = self.fetch_with_retry(url).await?;
        let outcome = selector.extract(&html).ok_or(ExtractError::NoMatch);
        self.cache.put(url, css_selector, &outcome);
        outcome
    }

    /// Fetch a page, retrying transient failures up to `max_retries` times.
    async fn fetch_with_retry(&self, url: &str) -> Result<String, ExtractError> {
        let mut attempt = 0_usize;
        loop {
            let result = match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch_text(url))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout),
            };

            match result {
                Ok(html) => return Ok(html),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::debug!("Retrying {} after error: {} (attempt {})", url, e, attempt);
                    tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * attempt as u64))
                        .await;
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch external page {}: {}", url, e);
                    return Err(e.into());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::response::Html;
    use axum::routing::get;
    use axum::Router;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Counters {
        page: Arc<AtomicUsize>,
        flaky: Arc<AtomicUsize>,
        down: Arc<AtomicUsize>,
    }

    async fn page(State(counters): State<Counters>) -> Html<&'static str> {
        counters.page.fetch_add(1, Ordering::SeqCst);
        Html("<html><body><h1>Headline</h1><p>one</p><p>two</p></body></html>")
    }

    async fn flaky(State(counters): State<Counters>) -> (StatusCode, Html<&'static str>) {
        if counters.flaky.fetch_add(1, Ordering::SeqCst) == 0 {
            (StatusCode::SERVICE_UNAVAILABLE, Html("busy"))
        } else {
            (StatusCode::OK, Html("<h1>Recovered</h1>"))
        }
    }

    async fn down(State(counters): State<Counters>) -> StatusCode {
        counters.down.fetch_add(1, Ordering::SeqCst);
        StatusCode::SERVICE_UNAVAILABLE
    }

    async fn missing() -> StatusCode {
        StatusCode::NOT_FOUND
    }

    async fn slow() -> Html<&'static str> {
        tokio::time::sleep(Duration::from_secs(2)).await;
        Html("<h1>Too late</h1>")
    }

    async fn spawn_server() -> (String, Counters) {
        let counters = Counters::default();
        let app = Router::new()
            .route("/page", get(page))
            .route("/flaky", get(flaky))
            .route("/down", get(down))
            .route("/missing", get(missing))
            .route("/slow", get(slow))
            .with_state(counters.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{address}"), counters)
    }

    fn local_config() -> ExtractorConfig {
        ExtractorConfig {
            allow_private_hosts: true,
            fetch_timeout_ms: 500,
            ..ExtractorConfig::default()
        }
    }

    #[tokio::test]
    async fn test_extract_and_memoize() {
        let (base, counters) = spawn_server().await;
        let extractor = ExternalPropertyExtractor::new(&local_config()).unwrap();
        let url = format!("{base}/page");

        assert_eq!(extractor.extract(&url, "h1").await, Ok("Headline".to_string()));
        assert_eq!(extractor.extract(&url, "h1").await, Ok("Headline".to_string()));
        assert_eq!(counters.page.load(Ordering::SeqCst), 1);

        // Different selector, same page: separate cache entry
        assert_eq!(extractor.extract(&url, "p").await, Ok("one".to_string()));
        assert_eq!(counters.page.load(Ordering::SeqCst), 2);
        assert_eq!(extractor.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_no_match_is_cached() {
        let (base, counters) = spawn_server().await;
        let extractor = ExternalPropertyExtractor::new(&local_config()).unwrap();
        let url = format!("{base}/page");

        assert_eq!(extractor.extract(&url, "table").await, Err(ExtractError::NoMatch));
        assert_eq!(extractor.extract(&url, "table").await, Err(ExtractError::NoMatch));
        assert_eq!(counters.page.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_failure_once() {
        let (base, counters) = spawn_server().await;
        let extractor = ExternalPropertyExtractor::new(&local_config()).unwrap();

        let result = extractor.extract(&format!("{base}/flaky"), "h1").await;
        assert_eq!(result, Ok("Recovered".to_string()));
        assert_eq!(counters.flaky.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_retry_without_budget() {
        let (base, counters) = spawn_server().await;
        let config = ExtractorConfig {
            max_retries: 0,
            ..local_config()
        };
        let extractor = ExternalPropertyExtractor::new(&config).unwrap();

        let result = extractor.extract(&format!("{base}/flaky"), "h1").await;
        assert!(matches!(result, Err(ExtractError::Fetch(msg)) if msg.contains("503")));
        assert_eq!(counters.flaky.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_budget_is_capped_at_one() {
        let (base, counters) = spawn_server().await;
        let config = ExtractorConfig {
            max_retries: 5,
            ..local_config()
        };
        let extractor = ExternalPropertyExtractor::new(&config).unwrap();

        let result = extractor.extract(&format!("{base}/down"), "h1").await;
        assert!(matches!(result, Err(ExtractError::Fetch(msg)) if msg.contains("503")));
        assert_eq!(counters.down.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let (base, _counters) = spawn_server().await;
        let extractor = ExternalPropertyExtractor::new(&local_config()).unwrap();

        let result = extractor.extract(&format!("{base}/missing"), "h1").await;
        assert!(matches!(result, Err(ExtractError::Fetch(msg)) if msg.contains("404")));
        assert!(extractor.cache().is_empty());
    }

    #[tokio::test]
    async fn test_timeout() {
        let (base, _counters) = spawn_server().await;
        let config = ExtractorConfig {
            fetch_timeout_ms: 100,
            max_retries: 0,
            ..local_config()
        };
        let extractor = ExternalPropertyExtractor::new(&config).unwrap();

        let result = extractor.extract(&format!("{base}/slow"), "h1").await;
        assert_eq!(result, Err(ExtractError::Timeout));
    }

    #[tokio::test]
    async fn test_invalid_selector_skips_fetch() {
        let (base, counters) = spawn_server().await;
        let extractor = ExternalPropertyExtractor::new(&local_config()).unwrap();

        let result = extractor.extract(&format!("{base}/page"), "h1[[").await;
        assert!(matches!(result, Err(ExtractError::InvalidSelector(_))));
        assert_eq!(counters.page.load(Ordering::SeqCst), 0);
    }
}
