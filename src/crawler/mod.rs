// Frontier-driven crawler: fetching, link discovery, topic classification and page parsing

pub mod engine;
pub mod extractor;
pub mod fetcher;
pub mod frontier;
pub mod links;
pub mod policy;
pub mod topic;


use anyhow::{Context, Result, anyhow};
use url::Url;

pub use engine::{CrawlStats, Crawler, PageHandler, PageOutcome};
pub use extractor::{PageMetadata, ParsedPage, parse_page};
pub use fetcher::{FetchError, Fetcher, HttpClient};
pub use frontier::{CrawlFrontier, CrawlSession, TopicCounters, normalize_url};
pub use links::extract_links;
pub use policy::{
    Admission, CrawlPolicy, PageLimitPolicy, SkipReason, TopicQuotaPolicy, policy_from_config,
};
pub use topic::{Topic, UnknownTopic, classify_topic};

/// Validate that a URL is suitable for crawling
#[inline]
pub fn validate_url(url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str).with_context(|| format!("Invalid URL format: {}", url_str))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(anyhow!("URL must use HTTP or HTTPS scheme: {}", url_str));
    }

    if url.host_str().is_none() {
        return Err(anyhow!("URL must have a valid host: {}", url_str));
    }

    Ok(url)
}

/// Sitemap pages are navigation only: their links are followed but their content is not kept
#[inline]
pub fn is_sitemap_url(url: &str) -> bool {
    let path = Url::parse(url).map_or_else(|_| url.to_string(), |parsed| parsed.path().to_string());
    path.to_lowercase().contains("sitemap")
}
