
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::{EmbedMode, EmbeddingProvider, request_with_retry};
use crate::config::EmbeddingConfig;

/// Client for the Cohere v2 embed endpoint
#[derive(Debug, Clone)]
pub struct CohereClient {
    base_url: Url,
    model: String,
    api_key: String,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: [&'a str; 1],
    input_type: &'static str,
    embedding_types: [&'static str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: EmbeddingsByType,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsByType {
    float: Vec<Vec<f32>>,
}

impl CohereClient {
    /// Create a client, reading the API key from the configured environment variable
    #[inline]
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).with_context(|| {
            format!(
                "Cohere API key not found in environment variable {}",
                config.api_key_env
            )
        })?;

        Self::with_api_key(config, api_key)
    }

    #[inline]
    pub fn with_api_key(config: &EmbeddingConfig, api_key: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(anyhow!("Cohere API key is empty"));
        }

        let base_url = config
            .base_url()
            .context("Failed to parse Cohere URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.model.clone(),
            api_key,
            agent,
            retry_attempts: config.retry_attempts,
        })
    }

    #[inline]
    pub fn generate_embedding(&self, text: &str, mode: EmbedMode) -> Result<Vec<f32>> {
        debug!(
            "Requesting {} embedding for text (length: {})",
            mode.as_str(),
            text.len()
        );

        let request = EmbedRequest {
            model: &self.model,
            texts: [text],
            input_type: mode.as_str(),
            embedding_types: ["float"],
        };

        let url = self
            .base_url
            .join("/v2/embed")
            .context("Failed to build embedding URL")?;

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embedding request")?;
        let authorization = format!("Bearer {}", self.api_key);

        let response_text = request_with_retry(url.as_str(), self.retry_attempts, || {
            self.agent
                .post(url.as_str())
                .header("Authorization", &authorization)
                .header("Content-Type", "application/json")
                .header("Accept", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .context("Failed to generate embedding")?;

        let response: EmbedResponse =
            serde_json::from_str(&response_text).context("Failed to parse embedding response")?;

        let embedding = response
            .embeddings
            .float
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Cohere returned no embeddings"))?;

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for CohereClient {
    fn name(&self) -> &str {
        "cohere"
    }

    async fn embed(&self, text: &str, mode: EmbedMode) -> Result<Vec<f32>> {
        // Blocking HTTP and retry backoff stay off the async workers
        let client = self.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || client.generate_embedding(&text, mode))
            .await
            .context("Cohere embedding task failed")?
    }

    async fn health_check(&self) -> Result<()> {
        let embedding = self
            .generate_embedding("health check", EmbedMode::SearchQuery)
            .context("Cohere embed request failed")?;

        if embedding.is_empty() {
            return Err(anyhow!("Cohere returned an empty embedding"));
        }

        info!(
            "Health check passed for Cohere model {} ({} dimensions)",
            self.model,
            embedding.len()
        );
        Ok(())
    }
}
