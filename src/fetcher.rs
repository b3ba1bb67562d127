use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, warn};

/// Why a single GET did not produce a usable body.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {code} for {url}")]
    Status { url: String, code: u16 },

    #[error("failed to read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// A successful response: body text plus the status it came with.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub body: String,
    pub status_code: u16,
}

/// Outcome of one fetch, folded into a single value for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub url: String,
    pub body: Option<String>,
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Issue exactly one GET. Non-2xx statuses are errors.
    async fn fetch(&self, url: &str) -> Result<Fetched, FetchError>;
}

/// reqwest-backed fetcher. One client per run so keep-alive and default
/// headers are shared across calls.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        anyhow::ensure!(!timeout.is_zero(), "fetch timeout must be positive");

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Fetched, FetchError> {
        let parsed = parse_absolute(url)?;

        let start = Instant::now();
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                code: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;
        debug!(
            url,
            status = status.as_u16(),
            bytes = body.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "fetched"
        );

        Ok(Fetched {
            body,
            status_code: status.as_u16(),
        })
    }
}

/// Fetch `url` and fold the outcome into a [`FetchResult`]. Never fails.
pub async fn fetch_page(fetcher: &dyn PageFetcher, url: &str) -> FetchResult {
    match fetcher.fetch(url).await {
        Ok(fetched) => FetchResult {
            url: url.to_string(),
            body: Some(fetched.body),
            status_code: Some(fetched.status_code),
            error: None,
        },
        Err(e) => {
            warn!("Error fetching {}: {}", url, e);
            let status_code = match &e {
                FetchError::Status { code, .. } => Some(*code),
                _ => None,
            };
            FetchResult {
                url: url.to_string(),
                body: None,
                status_code,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Only absolute http(s) URLs are fetchable.
pub fn parse_absolute(url: &str) -> Result<Url, FetchError> {
    let invalid = |reason: String| FetchError::InvalidUrl {
        url: url.to_string(),
        reason,
    };
    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

// ── Tests ──
