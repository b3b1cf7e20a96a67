//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building the HTTP client with the identifying user agent
//! - Exponential backoff for transient failures
//! - Honoring server throttling (HTTP 429) without spending retry budget
//! - The politeness delay after every successful fetch

use crate::config::{Config, DelayRange, FetcherConfig, UserAgentConfig};
use crate::crawler::pacing::{backoff_delay, pause, retry_after, Sleeper};
use reqwest::{Client, StatusCode};
use scraper::Html;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Default retry budget of a fetch target
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Shortest wait honored for a throttling response
pub const MIN_THROTTLE_WAIT: Duration = Duration::from_secs(1);

/// Why a single attempt did not produce a page
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server asked us to slow down
    #[error("throttled, server asks to wait {wait:?}")]
    Throttled { wait: Duration },

    #[error("HTTP status {0}")]
    Status(StatusCode),

    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
}

/// A URL plus the number of attempts it may consume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub url: String,
    pub max_retries: u32,
}

impl FetchTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct Page {
    /// The URL that was requested
    pub url: String,

    /// Response body
    pub body: String,
}

impl Page {
    /// Parses the body into an HTML document
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

/// Builds an HTTP client with the configured identification
///
/// # Example
///
/// ```no_run
/// use sillage::config::UserAgentConfig;
/// use sillage::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.value.clone())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Rate-limited, retrying page fetcher
///
/// One request is in flight at a time; every wait is taken on the calling
/// task through the configured `Sleeper` and is cut short when the
/// cancellation token trips.
pub struct Fetcher {
    client: Client,
    config: FetcherConfig,
    after_fetch: DelayRange,
    sleeper: Arc<dyn Sleeper>,
    cancel: CancellationToken,
}

impl Fetcher {
    /// Creates a fetcher from an existing client
    pub fn new(client: Client, config: &Config, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            client,
            config: config.fetcher.clone(),
            after_fetch: config.delays.after_fetch,
            sleeper,
            cancel: CancellationToken::new(),
        }
    }

    /// Stops retries and waits once `cancel` trips
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Creates a fetcher with a client built from the configuration
    pub fn from_config(config: &Config, sleeper: Arc<dyn Sleeper>) -> Result<Self, reqwest::Error> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.fetcher.request_timeout_secs),
        )?;
        Ok(Self::new(client, config, sleeper))
    }

    /// Fetches a URL with the configured retry budget
    pub async fn fetch(&self, url: &str) -> Option<Page> {
        let target = FetchTarget::new(url).with_retries(self.config.max_retries);
        self.fetch_target(&target).await
    }

    /// Fetches a target, never failing loudly
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | politeness delay, return the page |
    /// | 429 | wait Retry-After (at least 1s, or the default), retry at the same attempt |
    /// | other status | transient, counts against the budget |
    /// | network error / timeout | transient, counts against the budget |
    ///
    /// Before retry number `n` a backoff of `min(cap, 2^n * base)` is taken,
    /// except directly after a throttling wait. When the budget is exhausted
    /// the failure is logged and `None` is returned. Cancellation also yields
    /// `None`, checked before every attempt and during every wait.
    pub async fn fetch_target(&self, target: &FetchTarget) -> Option<Page> {
        let mut attempt: u32 = 0;
        let mut after_throttle = false;

        while attempt < target.max_retries {
            if self.cancel.is_cancelled() {
                tracing::debug!("Fetch of {} cancelled", target.url);
                return None;
            }

            if attempt > 0 && !after_throttle {
                let wait = backoff_delay(
                    attempt,
                    self.config.backoff_base_secs,
                    self.config.backoff_cap_secs,
                );
                tracing::info!(
                    "Retry {}/{} for {}, waiting {}s",
                    attempt + 1,
                    target.max_retries,
                    target.url,
                    wait.as_secs()
                );
                if !self.wait(wait).await {
                    return None;
                }
            }
            after_throttle = false;

            match self.attempt(&target.url).await {
                Ok(body) => {
                    self.wait(self.after_fetch.sample()).await;
                    return Some(Page {
                        url: target.url.clone(),
                        body,
                    });
                }
                Err(FetchError::Throttled { wait }) => {
                    tracing::warn!(
                        "Throttled on {}, waiting {}s before retrying",
                        target.url,
                        wait.as_secs()
                    );
                    if !self.wait(wait).await {
                        return None;
                    }
                    after_throttle = true;
                }
                Err(e) => {
                    if attempt + 1 >= target.max_retries {
                        tracing::error!("Error fetching page {}: {}", target.url, e);
                        return None;
                    }
                    tracing::warn!("Attempt {} for {} failed: {}", attempt + 1, target.url, e);
                    attempt += 1;
                }
            }
        }

        None
    }

    /// Sleeps unless cancelled; returns false if the token tripped
    async fn wait(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = pause(self.sleeper.as_ref(), duration) => true,
        }
    }

    /// Issues one GET request and classifies the outcome
    async fn attempt(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let wait = retry_after(response.headers())
                .unwrap_or(Duration::from_secs(self.config.throttle_wait_secs))
                .max(MIN_THROTTLE_WAIT);
            return Err(FetchError::Throttled { wait });
        }

        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        Ok(response.text().await?)
    }
}
