//! HTTP fetcher implementation
//!
//! This module handles every index-page request of a crawl:
//! - Building the shared HTTP client with the configured user agent
//! - GET requests with a fixed per-attempt timeout
//! - Linear backoff before each attempt and a fixed wait between retries
//!
//! Transport errors and non-2xx responses are treated alike: both are retried
//! until the attempt budget is spent.

use crate::config::{Config, CrawlerConfig};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by the page fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, timeout or body read failure
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Every attempt failed; carries the last attempt's error
    #[error("giving up on {url} after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: Box<FetchError>,
    },
}

/// Timing of fetch attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the first attempt
    pub base_delay: Duration,
    /// Added to the pre-attempt delay for every further attempt
    pub backoff_step: Duration,
    /// Fixed wait after a failed attempt
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            backoff_step: Duration::from_millis(config.backoff_step_ms),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    /// Delay slept before the zero-based `attempt`
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay + self.backoff_step * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The harvester configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use listing_harvester::config::Config;
/// use listing_harvester::crawler::build_http_client;
///
/// let client = build_http_client(&Config::default()).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.site.user_agent.as_str())
        .timeout(Duration::from_secs(config.crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches index pages with retry
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl PageFetcher {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Fetches `url` and returns its body
    ///
    /// Makes at most `max_attempts` requests. Never panics or retries past
    /// the budget; the last failure is wrapped in `FetchError::Exhausted`.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let attempts = self.policy.max_attempts;
        let mut last = None;

        for attempt in 0..attempts {
            tokio::time::sleep(self.policy.delay_before(attempt)).await;

            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    tracing::warn!("Attempt {}/{} for {} failed: {}", attempt + 1, attempts, url, e);
                    last = Some(e);
                }
            }

            if attempt + 1 < attempts {
                tokio::time::sleep(self.policy.retry_delay).await;
            }
        }

        tracing::error!("Failed to fetch {} after {} attempts", url, attempts);
        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts,
            last: Box::new(last.unwrap_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 0,
            })),
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(transport)
    }
}
