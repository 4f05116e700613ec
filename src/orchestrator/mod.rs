// Wires configuration, store, embedder, fetcher and policy into one crawl run


use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::crawler::{
    CrawlSession, CrawlStats, Crawler, HttpClient, PageHandler, PageOutcome, TopicCounters,
    normalize_url, policy_from_config, validate_url,
};
use crate::database::{Database, DocumentStore};
use crate::embeddings::{EmbeddingProvider, build_provider};
use crate::pipeline::ContentPipeline;

/// Per-run overrides of the configured crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlOptions {
    pub seed_url: Option<String>,
    pub topic_quota: Option<usize>,
    /// Print documents instead of storing them
    pub dry_run: bool,
    /// Continue from the stored checkpoint when its seed matches
    pub resume: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub seed_url: String,
    pub resumed: bool,
    pub stats: CrawlStats,
    pub visited: usize,
    pub remaining: usize,
    pub counters: TopicCounters,
}

pub struct Scraper {
    config: Config,
    database: Database,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
}

impl Scraper {
    /// Open the store and build the embedding provider described by `config`
    #[inline]
    pub async fn new(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let database = Database::initialize_from_data_dir(config.get_base_dir())
            .await
            .context("Failed to open document store")?;
        let embedder = build_provider(&config.embedding)?;

        Ok(Self::with_parts(config, database, embedder))
    }

    #[inline]
    pub fn with_parts(
        config: Config,
        database: Database,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Self {
        Self {
            config,
            database,
            embedder,
        }
    }

    #[inline]
    pub fn database(&self) -> &Database {
        &self.database
    }

    #[inline]
    pub async fn run(&self, options: CrawlOptions) -> Result<CrawlReport> {
        let seed_url = options
            .seed_url
            .unwrap_or_else(|| self.config.crawler.seed_url.clone());
        validate_url(&seed_url)?;

        let mut crawler_config = self.config.crawler.clone();
        if let Some(quota) = options.topic_quota {
            crawler_config.topic_quota = quota;
        }

        if let Some(embedder) = &self.embedder {
            if let Err(e) = embedder.health_check().await {
                warn!(
                    "Embedding provider {} is unhealthy, embeddings may be missing: {:#}",
                    embedder.name(),
                    e
                );
            }
        }

        let (mut session, resumed) = if options.resume {
            self.restore_session(&seed_url, &crawler_config.blacklist)
                .await?
        } else {
            (CrawlSession::new(&seed_url, &crawler_config.blacklist), false)
        };

        let store: Arc<dyn DocumentStore> = Arc::new(self.database.clone());
        let pipeline = ContentPipeline::new(
            store,
            self.embedder.clone(),
            &self.config.extraction,
        )
        .with_save_content(self.config.extraction.save_content && !options.dry_run);

        let handler = CheckpointingHandler {
            pipeline,
            database: &self.database,
            enabled: !options.dry_run,
        };

        let mut crawler = Crawler::new(
            HttpClient::new(&crawler_config),
            policy_from_config(&crawler_config),
            &crawler_config,
        );
        let stats = crawler.run(&mut session, &handler).await?;

        Ok(CrawlReport {
            seed_url,
            resumed,
            stats,
            visited: session.frontier.visited_count(),
            remaining: session.frontier.remaining(),
            counters: session.counters,
        })
    }

    async fn restore_session(
        &self,
        seed_url: &str,
        blacklist: &[String],
    ) -> Result<(CrawlSession, bool)> {
        match self.database.load_checkpoint().await? {
            Some(mut session) if session.seed_url == normalize_url(seed_url) => {
                session.frontier.extend_blacklist(blacklist);
                info!(
                    "Resuming crawl of {}: {} visited, {} queued",
                    session.seed_url,
                    session.frontier.visited_count(),
                    session.frontier.remaining()
                );
                Ok((session, true))
            }
            Some(session) => {
                warn!(
                    "Checkpoint belongs to {}, starting a fresh crawl of {}",
                    session.seed_url, seed_url
                );
                Ok((CrawlSession::new(seed_url, blacklist), false))
            }
            None => {
                info!("No checkpoint found, starting a fresh crawl");
                Ok((CrawlSession::new(seed_url, blacklist), false))
            }
        }
    }
}

/// Pipeline handler that also persists the crawl session at checkpoint time
struct CheckpointingHandler<'a> {
    pipeline: ContentPipeline,
    database: &'a Database,
    enabled: bool,
}

#[async_trait]
impl PageHandler for CheckpointingHandler<'_> {
    async fn handle(&self, url: &str, html: &str) -> Result<PageOutcome> {
        self.pipeline.handle(url, html).await
    }

    async fn checkpoint(&self, session: &CrawlSession) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        self.database
            .save_checkpoint(session)
            .await
            .context("Failed to write crawl checkpoint")
    }
}
