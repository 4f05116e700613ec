#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};
use ureq::Agent;

use crate::config::CrawlerConfig;

/// Source of page HTML for the crawl loop
#[async_trait]
pub trait Fetcher: Send {
    async fn fetch(&mut self, url: &str) -> Result<String>;
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(ureq::Error),
    #[error("failed to read response body: {0}")]
    Body(ureq::Error),
}

impl FetchError {
    /// Timeouts, connection failures, 5xx and 429 are worth another attempt
    #[inline]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status(status) => *status >= 500 || *status == 429,
            Self::Transport(error) => matches!(
                error,
                ureq::Error::Timeout(_)
                    | ureq::Error::ConnectionFailed
                    | ureq::Error::HostNotFound
                    | ureq::Error::Io(_)
            ),
            Self::Body(_) => false,
        }
    }
}

/// HTTP client wrapper with a politeness delay and bounded retries
#[derive(Debug)]
pub struct HttpClient {
    agent: Agent,
    rate_limit: Duration,
    max_retries: u32,
    retry_delay: Duration,
    last_request_time: Option<Instant>,
}

impl HttpClient {
    #[inline]
    pub fn new(config: &CrawlerConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .user_agent(&config.user_agent)
            .build()
            .into();

        Self {
            agent,
            rate_limit: Duration::from_millis(config.rate_limit_ms),
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(config.retry_delay_seconds),
            last_request_time: None,
        }
    }

    /// Override the wait between retry attempts
    #[inline]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Perform a GET with rate limiting and retries, returning the body
    #[inline]
    pub async fn get(&mut self, url: &str) -> Result<String> {
        self.apply_rate_limit().await;

        let mut attempt = 0;
        loop {
            match self.try_get(url) {
                Ok(body) => {
                    debug!("Successfully fetched {} (attempt {})", url, attempt + 1);
                    return Ok(body);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        "Retryable error for {}: {} (retry {}/{})",
                        url, e, attempt, self.max_retries
                    );
                    sleep(self.retry_delay).await;
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to fetch {}", url));
                }
            }
        }
    }

    /// Sleep until `rate_limit` has passed since the previous request
    async fn apply_rate_limit(&mut self) {
        if let Some(last_time) = self.last_request_time {
            let elapsed = last_time.elapsed();

            if elapsed < self.rate_limit {
                let sleep_duration = self.rate_limit - elapsed;
                debug!("Rate limiting: sleeping for {:?}", sleep_duration);
                sleep(sleep_duration).await;
            }
        }

        self.last_request_time = Some(Instant::now());
    }

    fn try_get(&self, url: &str) -> Result<String, FetchError> {
        debug!("Making HTTP GET request to: {}", url);

        match self.agent.get(url).call() {
            Ok(mut response) => {
                let text = response
                    .body_mut()
                    .read_to_string()
                    .map_err(FetchError::Body)?;
                debug!("Read {} bytes from {}", text.len(), url);
                Ok(text)
            }
            Err(ureq::Error::StatusCode(status)) => Err(FetchError::Status(status)),
            Err(e) => Err(FetchError::Transport(e)),
        }
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    async fn fetch(&mut self, url: &str) -> Result<String> {
        self.get(url).await
    }
}
