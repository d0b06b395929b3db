//! HTTP client for fetching product pages
//!
//! Bounded timeout per request, a fixed delay between attempts and a status
//! policy deciding which failures are worth another attempt. Bodies are
//! returned as `String`; parsing into `scraper::Html` happens later, away from
//! any `.await`.

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::infrastructure::config::ScraperConfig;

/// Fetch failures. Distinct from "page fetched but no price on it".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(String),

    #[error("HTTP request failed for {url}: {message}")]
    Request { url: String, message: String },

    #[error("HTTP error {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Empty response from {url}")]
    EmptyBody { url: String },

    #[error("Giving up on {url} after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: Box<TransportError>,
    },
}

impl TransportError {
    /// Whether another attempt may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Request { .. } | Self::EmptyBody { .. } => true,
            Self::Status { status, .. } => StatusCode::from_u16(*status).is_ok_and(|code| {
                code.is_server_error()
                    || code == StatusCode::REQUEST_TIMEOUT
                    || code == StatusCode::TOO_MANY_REQUESTS
            }),
            Self::ClientBuild(_) | Self::Exhausted { .. } => false,
        }
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Source of page bodies for the monitor
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> TransportResult<String>;
}

/// Configuration for HTTP client behavior
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Attempts per URL, including the first one
    pub max_retries: u32,
    /// Fixed pause between attempts
    pub retry_delay: Duration,
    /// User agent string
    pub user_agent: String,
    /// Whether to follow redirects
    pub follow_redirects: bool,
}

impl HttpClientConfig {
    /// Create HttpClientConfig from the scraper section of the app config
    pub fn from_scraper_config(scraper: &ScraperConfig) -> Self {
        Self {
            timeout_seconds: scraper.request_timeout_seconds,
            max_retries: scraper.max_retries,
            retry_delay: Duration::from_secs(scraper.retry_delay_seconds),
            user_agent: scraper.user_agent.clone(),
            follow_redirects: scraper.follow_redirects,
        }
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::from_scraper_config(&ScraperConfig::default())
    }
}

/// HTTP client with retry and error classification
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> TransportResult<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub const fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Fetch a page body, retrying recoverable failures with a fixed delay
    pub async fn fetch_html(&self, url: &str) -> TransportResult<String> {
        info!("🌐 Fetching: {}", url);
        let attempts = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.fetch_once(url).await {
                Ok(body) => {
                    debug!("Fetched {} ({} bytes) on attempt {}", url, body.len(), attempt);
                    return Ok(body);
                }
                Err(e) if !e.is_recoverable() => {
                    warn!("❌ {} (not retried)", e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("⚠️ Attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = Some(e);
                    if attempt < attempts {
                        sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        Err(TransportError::Exhausted {
            url: url.to_string(),
            attempts,
            last: Box::new(last_error.unwrap_or_else(|| TransportError::Request {
                url: url.to_string(),
                message: "no attempt made".to_string(),
            })),
        })
    }

    /// Single attempt
    async fn fetch_once(&self, url: &str) -> TransportResult<String> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "sv-SE,sv;q=0.9,en;q=0.8")
            .send()
            .await
            .map_err(|e| TransportError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| TransportError::Request {
            url: url.to_string(),
            message: format!("Failed to read response body: {e}"),
        })?;

        if body.trim().is_empty() {
            return Err(TransportError::EmptyBody { url: url.to_string() });
        }
        Ok(body)
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch_page(&self, url: &str) -> TransportResult<String> {
        self.fetch_html(url).await
    }
}
