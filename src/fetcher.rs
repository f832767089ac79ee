//! HTTP page fetcher with security measures.
//!
//! Used for external property pages and for feed documents. Enforces SSRF
//! protection, timeouts, a redirect limit and a body size limit.
//!
//! Unless private hosts are allowed, every redirect hop is checked against
//! the same rules as the first URL, and host names only resolve to public
//! addresses.

use std::error::Error as StdError;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::redirect::Policy;
use reqwest::Client;
use thiserror::Error;

use crate::config::ExtractorConfig;

/// Errors raised while fetching a page.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// URL could not be parsed or uses an unsupported scheme.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    /// URL points at a private or reserved host.
    #[error("forbidden host: {0}")]
    ForbiddenHost(String),
    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,
    /// Connection or protocol failure.
    #[error("request failed: {0}")]
    Request(String),
    /// The redirect chain is longer than allowed.
    #[error("too many redirects (max {0})")]
    TooManyRedirects(usize),
    /// Non-success HTTP status.
    #[error("HTTP error: {0}")]
    Status(u16),
    /// Body exceeds the configured limit.
    #[error("page too large: {size} bytes (max {max} bytes)")]
    TooLarge { size: u64, max: u64 },
}

impl FetchError {
    /// Whether a retry may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Request(_) => true,
            FetchError::Status(code) => *code >= 500 || *code == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        // Redirect and resolver rejections carry our own error as the cause.
        let mut source = StdError::source(&e);
        while let Some(cause) = source {
            if let Some(fetch_error) = cause.downcast_ref::<FetchError>() {
                return fetch_error.clone();
            }
            source = cause.source();
        }

        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Request(e.to_string())
        }
    }
}

/// HTTP fetcher shared by the extractor and the feed article source.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    max_size: u64,
    allow_private_hosts: bool,
}

impl PageFetcher {
    /// Create a fetcher from extractor settings.
    pub fn new(config: &ExtractorConfig) -> Result<Self, FetchError> {
        let max_redirects = config.max_redirects;
        let allow_private_hosts = config.allow_private_hosts;
        let redirect_policy = Policy::custom(move |attempt| {
            match check_redirect(
                attempt.url(),
                attempt.previous().len(),
                max_redirects,
                allow_private_hosts,
            ) {
                Ok(()) => attempt.follow(),
                Err(e) => {
                    tracing::warn!("Refusing redirect to {}: {}", attempt.url(), e);
                    attempt.error(e)
                }
            }
        });

        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_millis(config.fetch_timeout_ms))
            .redirect(redirect_policy)
            .user_agent(config.user_agent.as_str());
        if !allow_private_hosts {
            builder = builder.dns_resolver(Arc::new(PublicResolver));
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::Request(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_size: config.max_page_size_bytes,
            allow_private_hosts: config.allow_private_hosts,
        })
    }

    /// Fetch the body of `url` as bytes.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if self.allow_private_hosts {
            parse_http_url(url)?;
        } else {
            validate_url(url)?;
        }

        let mut response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_size {
                return Err(FetchError::TooLarge {
                    size: content_length,
                    max: self.max_size,
                });
            }
        }

        // Content-Length may be absent (chunked) or wrong, so count as we read.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let size = (body.len() + chunk.len()) as u64;
            if size > self.max_size {
                return Err(FetchError::TooLarge {
                    size,
                    max: self.max_size,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }

    /// Fetch `url` and decode it as (lossy) UTF-8 text.
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let bytes = self.fetch_bytes(url).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Decide whether a redirect to `url` may be followed after `hops` requests.
fn check_redirect(
    url: &url::Url,
    hops: usize,
    max_redirects: usize,
    allow_private_hosts: bool,
) -> Result<(), FetchError> {
    if hops > max_redirects {
        return Err(FetchError::TooManyRedirects(max_redirects));
    }
    if allow_private_hosts {
        parse_http_url(url.as_str()).map(|_| ())
    } else {
        validate_url(url.as_str())
    }
}

/// DNS resolver that only hands out public addresses.
#[derive(Debug)]
struct PublicResolver;

impl Resolve for PublicResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(resolve_public(name.as_str().to_string()))
    }
}

async fn resolve_public(host: String) -> Result<Addrs, Box<dyn StdError + Send + Sync>> {
    let resolved = tokio::net::lookup_host((host.as_str(), 0)).await?;
    let addrs: Addrs = Box::new(public_addrs(&host, resolved)?.into_iter());
    Ok(addrs)
}

/// Keep the public addresses of `host`; fail if none are left.
fn public_addrs(
    host: &str,
    addrs: impl IntoIterator<Item = SocketAddr>,
) -> Result<Vec<SocketAddr>, FetchError> {
    let public: Vec<SocketAddr> = addrs
        .into_iter()
        .filter(|addr| !is_private_ip(&addr.ip()))
        .collect();
    if public.is_empty() {
        return Err(FetchError::ForbiddenHost(host.to_string()));
    }
    Ok(public)
}

/// Parse `url` and require an http(s) scheme with a host.
pub fn parse_http_url(url: &str) -> Result<url::Url, FetchError> {
    let parsed = url::Url::parse(url.trim()).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported URL scheme: {scheme}"
            )))
        }
    }
    if parsed.host().is_none() {
        return Err(FetchError::InvalidUrl("URL has no host".to_string()));
    }
    Ok(parsed)
}

/// Whether `value` is a well-formed http(s) URL.
pub fn is_http_url(value: &str) -> bool {
    parse_http_url(value).is_ok()
}

/// Validate a URL for SSRF protection.
///
/// The scheme must be http or https and the host must not be a private,
/// loopback or reserved address.
pub fn validate_url(url: &str) -> Result<(), FetchError> {
    let parsed = parse_http_url(url)?;
    let host = parsed
        .host()
        .ok_or_else(|| FetchError::InvalidUrl("URL has no host".to_string()))?;

    match host {
        url::Host::Domain(domain) => {
            if is_forbidden_hostname(domain) {
                return Err(FetchError::ForbiddenHost(domain.to_string()));
            }
        }
        url::Host::Ipv4(ipv4) => {
            let ip = IpAddr::V4(ipv4);
            if is_private_ip(&ip) {
                return Err(FetchError::ForbiddenHost(ip.to_string()));
            }
        }
        url::Host::Ipv6(ipv6) => {
            let ip = IpAddr::V6(ipv6);
            if is_private_ip(&ip) {
                return Err(FetchError::ForbiddenHost(ip.to_string()));
            }
        }
    }

    Ok(())
}

fn is_forbidden_hostname(host: &str) -> bool {
    let host = host.to_lowercase();
    if host == "localhost" {
        return true;
    }
    [
        ".local",
        ".localhost",
        ".internal",
        ".intranet",
        ".corp",
        ".home",
        ".lan",
    ]
    .iter()
    .any(|suffix| host.ends_with(suffix))
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            ipv4.is_loopback()
                || ipv4.is_private()
                || ipv4.is_link_local()
                || ipv4.is_broadcast()
                || ipv4.is_unspecified()
                || ipv4.is_documentation()
                // Carrier-grade NAT: 100.64.0.0/10
                || (octets[0] == 100 && (64..=127).contains(&octets[1]))
        }
        IpAddr::V6(ipv6) => {
            let segments = ipv6.segments();
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                // Unique local: fc00::/7
                || (segments[0] & 0xfe00) == 0xfc00
                // Link-local: fe80::/10
                || (segments[0] & 0xffc0) == 0xfe80
                || ipv6
                    .to_ipv4_mapped()
                    .map(|v4| is_private_ip(&IpAddr::V4(v4)))
                    .unwrap_or(false)
        }
    }
}
