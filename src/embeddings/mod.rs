// Embedding providers, request throttling and the sentence chunker

pub mod chunking;
pub mod cohere;
pub mod ollama;
pub mod throttle;


use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::{EmbeddingConfig, ProviderKind};

pub use chunking::{TextChunk, chunk_text, count_tokens, split_sentences};
pub use cohere::CohereClient;
pub use ollama::OllamaClient;
pub use throttle::Throttled;

const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// How the embedded text will be used, so asymmetric models can encode it accordingly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedMode {
    SearchQuery,
    SearchDocument,
}

impl EmbedMode {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SearchQuery => "search_query",
            Self::SearchDocument => "search_document",
        }
    }
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &str;

    /// Embed a single text, returning a fixed-dimension vector
    async fn embed(&self, text: &str, mode: EmbedMode) -> Result<Vec<f32>>;

    /// Verify the provider is reachable and usable
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Build the configured provider wrapped in its rate limiter, or `None` when embeddings are off
#[inline]
pub fn build_provider(config: &EmbeddingConfig) -> Result<Option<Arc<dyn EmbeddingProvider>>> {
    if !config.enabled {
        info!("Embedding generation disabled");
        return Ok(None);
    }

    let provider: Arc<dyn EmbeddingProvider> = match config.provider {
        ProviderKind::Cohere => Arc::new(Throttled::new(
            CohereClient::new(config).context("Failed to create Cohere client")?,
            config,
        )?),
        ProviderKind::Ollama => Arc::new(Throttled::new(
            OllamaClient::new(config).context("Failed to create Ollama client")?,
            config,
        )?),
    };

    info!(
        "Using {} embeddings with model {}",
        provider.name(),
        config.model
    );
    Ok(Some(provider))
}

/// Run a blocking HTTP request, retrying server and transport errors with exponential backoff.
///
/// Client errors other than 429 fail immediately.
pub(crate) fn request_with_retry<F>(
    endpoint: &str,
    retry_attempts: u32,
    mut request_fn: F,
) -> Result<String>
where
    F: FnMut() -> Result<String, ureq::Error>,
{
    let attempts = retry_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        debug!("HTTP request attempt {}/{} to {}", attempt, attempts, endpoint);

        let error = match request_fn() {
            Ok(response_text) => return Ok(response_text),
            Err(error) => error,
        };

        match &error {
            ureq::Error::StatusCode(status) if *status >= 500 || *status == 429 => {
                warn!(
                    "Server error (status {}), attempt {}/{}",
                    status, attempt, attempts
                );
            }
            ureq::Error::StatusCode(status) => {
                warn!("Client error (status {}), not retrying", status);
                bail!("Client error: HTTP {}", status);
            }
            ureq::Error::ConnectionFailed
            | ureq::Error::HostNotFound
            | ureq::Error::Timeout(_)
            | ureq::Error::Io(_) => {
                warn!(
                    "Transport error: {}, attempt {}/{}",
                    error, attempt, attempts
                );
            }
            _ => bail!("Non-retryable error: {}", error),
        }

        last_error = Some(anyhow!("Request error: {}", error));

        if attempt < attempts {
            let delay = Duration::from_millis(EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000);
            debug!("Waiting {:?} before retry", delay);
            std::thread::sleep(delay);
        }
    }

    error!("All retry attempts failed for request to {}", endpoint);

    Err(last_error.unwrap_or_else(|| anyhow!("Request failed after retries")))
}
