
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

use super::{EmbedMode, EmbeddingProvider};
use crate::config::EmbeddingConfig;

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Wraps a provider with a per-minute token bucket and a fixed pause after every call
pub struct Throttled<P> {
    inner: P,
    limiter: DirectRateLimiter,
    delay: Duration,
}

impl<P: EmbeddingProvider> Throttled<P> {
    #[inline]
    pub fn new(inner: P, config: &EmbeddingConfig) -> Result<Self> {
        Self::with_limits(
            inner,
            config.requests_per_minute,
            Duration::from_millis(config.delay_ms),
        )
    }

    #[inline]
    pub fn with_limits(inner: P, requests_per_minute: u32, delay: Duration) -> Result<Self> {
        let per_minute = NonZeroU32::new(requests_per_minute)
            .ok_or_else(|| anyhow!("requests_per_minute must be greater than zero"))?;

        Ok(Self {
            inner,
            limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
            delay,
        })
    }

    #[inline]
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for Throttled<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn embed(&self, text: &str, mode: EmbedMode) -> Result<Vec<f32>> {
        self.limiter.until_ready().await;

        let result = self.inner.embed(text, mode).await;

        if !self.delay.is_zero() {
            debug!("Pausing {:?} after embedding call", self.delay);
            tokio::time::sleep(self.delay).await;
        }

        result
    }

    async fn health_check(&self) -> Result<()> {
        self.inner.health_check().await
    }
}
