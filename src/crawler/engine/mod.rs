#[cfg(test)]
mod tests;

use anyhow::Result;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use super::fetcher::Fetcher;
use super::frontier::CrawlSession;
use super::links::extract_links;
use super::policy::{Admission, CrawlPolicy};
use super::topic::{Topic, classify_topic};
use super::is_sitemap_url;
use crate::config::CrawlerConfig;
use crate::database::DocumentId;

/// Result of handing one admitted page to the content pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Persisted {
        document_id: DocumentId,
        chunks_saved: usize,
        chunks_failed: usize,
    },
    /// Dry run: the document was printed instead of stored
    Printed,
    /// The document write failed, so none of its chunks were written
    DocumentSaveFailed,
}

impl PageOutcome {
    /// Whether the page counts toward its topic quota
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Persisted { .. } | Self::Printed)
    }
}

/// Receives the pages the crawl policy admits for extraction
#[async_trait]
pub trait PageHandler: Send + Sync {
    async fn handle(&self, url: &str, html: &str) -> Result<PageOutcome>;

    /// Called periodically and once when the crawl ends
    async fn checkpoint(&self, _session: &CrawlSession) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub fetched: usize,
    pub fetch_failures: usize,
    pub sitemap_pages: usize,
    pub extracted: usize,
    pub skipped: usize,
    pub page_failures: usize,
    pub chunks_saved: usize,
    pub chunks_failed: usize,
    pub checkpoint_failures: usize,
}

/// Single-task crawl loop over a [`CrawlSession`]
pub struct Crawler<F, P> {
    fetcher: F,
    policy: P,
    site_domain: String,
    blacklist: Vec<String>,
    random_jump_frequency: usize,
    log_frequency: usize,
    rng: StdRng,
}

impl<F: Fetcher, P: CrawlPolicy> Crawler<F, P> {
    #[inline]
    pub fn new(fetcher: F, policy: P, config: &CrawlerConfig) -> Self {
        let rng = config
            .rng_seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

        Self {
            fetcher,
            policy,
            site_domain: config.site_domain.clone(),
            blacklist: config.blacklist.clone(),
            random_jump_frequency: config.random_jump_frequency,
            log_frequency: config.log_frequency.max(1),
            rng,
        }
    }

    #[inline]
    pub fn policy(&self) -> &P {
        &self.policy
    }

    #[inline]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Crawl from `seed_url` with a fresh session and return every URL marked visited
    #[inline]
    pub async fn crawl(
        &mut self,
        seed_url: &str,
        handler: &dyn PageHandler,
    ) -> Result<HashSet<String>> {
        let mut session = CrawlSession::new(seed_url, &self.blacklist);
        self.run(&mut session, handler).await?;
        Ok(session.frontier.into_visited())
    }

    /// Drive the loop until the policy says stop or the frontier runs dry.
    ///
    /// Fetch, page and checkpoint failures are logged and counted in [`CrawlStats`]; none of
    /// them end the crawl.
    #[inline]
    pub async fn run(
        &mut self,
        session: &mut CrawlSession,
        handler: &dyn PageHandler,
    ) -> Result<CrawlStats> {
        info!(
            "Starting crawl from {} with {}",
            session.seed_url,
            self.policy.describe()
        );

        let mut stats = CrawlStats::default();
        let progress = progress_bar();

        while !session.frontier.is_empty() && self.policy.should_continue(session) {
            session.iteration += 1;
            let Some(url) = session.frontier.next(
                session.iteration,
                self.random_jump_frequency,
                &mut self.rng,
            ) else {
                break;
            };

            if session.frontier.should_skip(&url) {
                debug!("Skipping visited or blacklisted URL: {}", url);
                continue;
            }
            session.frontier.mark_visited(&url);
            progress.set_message(url.clone());

            let html = match self.fetcher.fetch(&url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("Failed to fetch {}: {:#}", url, e);
                    stats.fetch_failures += 1;
                    continue;
                }
            };
            stats.fetched += 1;

            if is_sitemap_url(&url) {
                debug!("Sitemap page, following links only: {}", url);
                stats.sitemap_pages += 1;
            } else {
                match self.policy.admit(classify_topic(&html), &session.counters) {
                    Admission::Skip(reason) => {
                        info!("Skipping extraction for {}: {}", url, reason);
                        stats.skipped += 1;
                    }
                    Admission::Extract(topic) => {
                        extract_page(session, &url, &html, topic, handler, &mut stats).await;
                    }
                }
            }
            self.enqueue_links(session, &url, &html);

            session.processed += 1;
            progress.inc(1);

            if session.processed % self.log_frequency == 0 {
                log_progress(session);
                write_checkpoint(session, handler, &mut stats).await;
            }
        }

        progress.finish_and_clear();
        log_progress(session);
        write_checkpoint(session, handler, &mut stats).await;

        info!(
            "Crawl finished: {} fetched, {} extracted, {} skipped, {} failed",
            stats.fetched,
            stats.extracted,
            stats.skipped,
            stats.fetch_failures + stats.page_failures
        );
        Ok(stats)
    }

    fn enqueue_links(&self, session: &mut CrawlSession, url: &str, html: &str) {
        let base_url = match Url::parse(url) {
            Ok(base_url) => base_url,
            Err(e) => {
                warn!("Cannot resolve links of {}: {}", url, e);
                return;
            }
        };

        let links = extract_links(
            &base_url,
            html,
            &self.site_domain,
            session.frontier.visited(),
        );
        session.frontier.extend(links);
    }
}

/// Hand an admitted page to the pipeline; its topic is counted only when that succeeds
async fn extract_page(
    session: &mut CrawlSession,
    url: &str,
    html: &str,
    topic: Option<Topic>,
    handler: &dyn PageHandler,
    stats: &mut CrawlStats,
) {
    match handler.handle(url, html).await {
        Ok(outcome) if outcome.is_success() => {
            stats.extracted += 1;
            if let PageOutcome::Persisted {
                chunks_saved,
                chunks_failed,
                ..
            } = outcome
            {
                stats.chunks_saved += chunks_saved;
                stats.chunks_failed += chunks_failed;
            }
            if let Some(topic) = topic {
                session.counters.increment(topic);
                info!(
                    "Extracted {} ({}: {})",
                    url,
                    topic,
                    session.counters.get(topic)
                );
            }
        }
        Ok(_) => {
            warn!("Document for {} was not saved; topic not counted", url);
            stats.page_failures += 1;
        }
        Err(e) => {
            error!("Failed to process {}: {:#}", url, e);
            stats.page_failures += 1;
        }
    }
}

async fn write_checkpoint(
    session: &CrawlSession,
    handler: &dyn PageHandler,
    stats: &mut CrawlStats,
) {
    if let Err(e) = handler.checkpoint(session).await {
        warn!(
            "Checkpoint write failed after {} pages, continuing: {:#}",
            session.processed, e
        );
        stats.checkpoint_failures += 1;
    }
}

fn log_progress(session: &CrawlSession) {
    info!(
        "Progress: {} visited, {} queued, topics [{}]",
        session.frontier.visited_count(),
        session.frontier.remaining(),
        session
            .counters
            .iter()
            .map(|(topic, count)| format!("{}: {}", topic, count))
            .join(", ")
    );
}

fn progress_bar() -> ProgressBar {
    if !console::user_attended_stderr() {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new_spinner().with_style(
        ProgressStyle::with_template("{spinner} [{pos} pages] Crawling {msg}")
            .expect("style template is valid"),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}
