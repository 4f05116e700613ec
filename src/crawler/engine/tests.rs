use super::*;
use crate::crawler::frontier::CrawlSession;
use crate::crawler::policy::{PageLimitPolicy, TopicQuotaPolicy};
use crate::crawler::topic::Topic;
use anyhow::anyhow;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

const SEED: &str = "https://site.test/sitemap";

/// Serves canned pages and records every fetch
#[derive(Default)]
struct FakeFetcher {
    pages: HashMap<String, String>,
    fetched: Vec<String>,
}

impl FakeFetcher {
    fn with_page(mut self, url: &str, html: String) -> Self {
        self.pages.insert(url.to_string(), html);
        self
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&mut self, url: &str) -> Result<String> {
        self.fetched.push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("HTTP 404 for {}", url))
    }
}

struct RecordingHandler {
    outcome: PageOutcome,
    handled: Mutex<Vec<String>>,
    checkpoints: AtomicUsize,
    fail_checkpoints: bool,
}

impl RecordingHandler {
    fn new(outcome: PageOutcome) -> Self {
        Self {
            outcome,
            handled: Mutex::new(Vec::new()),
            checkpoints: AtomicUsize::new(0),
            fail_checkpoints: false,
        }
    }

    fn persisting() -> Self {
        Self::new(PageOutcome::Persisted {
            document_id: DocumentId::new("doc".to_string()),
            chunks_saved: 2,
            chunks_failed: 0,
        })
    }

    fn handled(&self) -> Vec<String> {
        self.handled.lock().expect("lock should succeed").clone()
    }
}

#[async_trait]
impl PageHandler for RecordingHandler {
    async fn handle(&self, url: &str, _html: &str) -> Result<PageOutcome> {
        self.handled
            .lock()
            .expect("lock should succeed")
            .push(url.to_string());
        Ok(self.outcome.clone())
    }

    async fn checkpoint(&self, _session: &CrawlSession) -> Result<()> {
        self.checkpoints.fetch_add(1, Ordering::SeqCst);
        if self.fail_checkpoints {
            return Err(anyhow!("database is locked"));
        }
        Ok(())
    }
}

fn config() -> CrawlerConfig {
    CrawlerConfig {
        seed_url: SEED.to_string(),
        site_domain: "site.test".to_string(),
        blacklist: Vec::new(),
        random_jump_frequency: 0,
        log_frequency: 100,
        rng_seed: Some(7),
        ..CrawlerConfig::default()
    }
}

fn sitemap(paths: &[&str]) -> String {
    let links: String = paths
        .iter()
        .map(|path| format!(r#"<li><a href="{path}">{path}</a></li>"#))
        .collect();
    format!(
        r#"<html><body><div class="group-section"><ul class="sitemap-listing">{links}</ul></div></body></html>"#
    )
}

fn project(category: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|link| format!(r#"<a href="{link}">more</a>"#))
        .collect();
    format!(
        r#"<html><body><a class="category">{category}</a><article><p>Steps.</p></article>{anchors}</body></html>"#
    )
}

fn url(path: &str) -> String {
    format!("https://site.test{path}")
}

#[tokio::test]
async fn no_url_is_fetched_twice_and_blacklist_is_never_fetched() {
    let fetcher = FakeFetcher::default()
        .with_page(SEED, sitemap(&["/a/", "/b/", "/a/", "/banned/"]))
        .with_page(&url("/a/"), project("Circuits", &["/b/", "/sitemap", "/banned/"]))
        .with_page(&url("/b/"), project("Workshop", &["/a/", "/banned/"]));

    let config = CrawlerConfig {
        blacklist: vec![url("/banned/")],
        ..config()
    };
    let handler = RecordingHandler::persisting();
    let mut crawler = Crawler::new(fetcher, PageLimitPolicy { max_pages: 100 }, &config);

    let visited = crawler
        .crawl(SEED, &handler)
        .await
        .expect("crawl should succeed");

    let fetched = &crawler.fetcher().fetched;
    let unique: HashSet<&String> = fetched.iter().collect();
    assert_eq!(unique.len(), fetched.len(), "duplicate fetch in {fetched:?}");
    assert!(!fetched.contains(&url("/banned/")));
    assert_eq!(fetched.len(), 3);

    assert!(visited.contains(&url("/banned/")));
    assert!(visited.contains(&url("/a/")));
    assert!(visited.contains(&url("/b/")));
}

#[tokio::test]
async fn quota_ends_crawl_with_frontier_left() {
    let mut paths: Vec<String> = Vec::new();
    let mut fetcher = FakeFetcher::default();
    for round in ["one", "two"] {
        for topic in Topic::ALL {
            let path = format!("/{}-{}/", topic.as_str().to_lowercase(), round);
            fetcher = fetcher.with_page(&url(&path), project(topic.as_str(), &[]));
            paths.push(path);
        }
    }
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let fetcher = fetcher.with_page(SEED, sitemap(&path_refs));

    let handler = RecordingHandler::persisting();
    let mut crawler = Crawler::new(fetcher, TopicQuotaPolicy { quota: 1 }, &config());
    let mut session = CrawlSession::new(SEED, Vec::<String>::new());

    let stats = crawler
        .run(&mut session, &handler)
        .await
        .expect("crawl should succeed");

    assert!(session.counters.all_reached(1));
    assert_eq!(session.counters.total(), 6);
    assert_eq!(stats.extracted, 6);
    assert_eq!(stats.chunks_saved, 12);
    assert_eq!(session.frontier.remaining(), 6);
    assert_eq!(crawler.fetcher().fetched.len(), 7);
}

#[tokio::test]
async fn sitemap_seed_is_navigation_only() {
    let fetcher = FakeFetcher::default()
        .with_page(SEED, sitemap(&["/lamp/"]))
        .with_page(&url("/lamp/"), project("Living", &[]));

    let handler = RecordingHandler::persisting();
    let mut crawler = Crawler::new(fetcher, PageLimitPolicy { max_pages: 10 }, &config());
    let mut session = CrawlSession::new(SEED, Vec::<String>::new());

    let stats = crawler
        .run(&mut session, &handler)
        .await
        .expect("crawl should succeed");

    assert_eq!(handler.handled(), vec![url("/lamp/")]);
    assert_eq!(stats.sitemap_pages, 1);
    assert_eq!(stats.extracted, 1);
}

#[tokio::test]
async fn fetch_failures_do_not_stop_the_crawl() {
    let fetcher = FakeFetcher::default()
        .with_page(SEED, sitemap(&["/missing/", "/ok/"]))
        .with_page(&url("/ok/"), project("Craft", &[]));

    let handler = RecordingHandler::persisting();
    let mut crawler = Crawler::new(fetcher, PageLimitPolicy { max_pages: 10 }, &config());
    let mut session = CrawlSession::new(SEED, Vec::<String>::new());

    let stats = crawler
        .run(&mut session, &handler)
        .await
        .expect("crawl should succeed");

    assert_eq!(stats.fetch_failures, 1);
    assert_eq!(handler.handled(), vec![url("/ok/")]);
    assert!(session.frontier.visited().contains(&url("/missing/")));
}

#[tokio::test]
async fn unclassified_pages_still_expand_the_frontier() {
    let fetcher = FakeFetcher::default()
        .with_page(SEED, sitemap(&["/hub/"]))
        .with_page(&url("/hub/"), project("Outside", &["/robot/"]))
        .with_page(&url("/robot/"), project("Circuits", &[]));

    let handler = RecordingHandler::persisting();
    let mut crawler = Crawler::new(fetcher, TopicQuotaPolicy { quota: 5 }, &config());
    let mut session = CrawlSession::new(SEED, Vec::<String>::new());

    let stats = crawler
        .run(&mut session, &handler)
        .await
        .expect("crawl should succeed");

    assert_eq!(stats.skipped, 1);
    assert_eq!(handler.handled(), vec![url("/robot/")]);
    assert_eq!(session.counters.get(Topic::Circuits), 1);
}

#[tokio::test]
async fn failed_document_save_is_not_counted() {
    let fetcher = FakeFetcher::default()
        .with_page(SEED, sitemap(&["/a/"]))
        .with_page(&url("/a/"), project("Cooking", &[]));

    let handler = RecordingHandler::new(PageOutcome::DocumentSaveFailed);
    let mut crawler = Crawler::new(fetcher, TopicQuotaPolicy { quota: 1 }, &config());
    let mut session = CrawlSession::new(SEED, Vec::<String>::new());

    let stats = crawler
        .run(&mut session, &handler)
        .await
        .expect("crawl should succeed");

    assert_eq!(session.counters.get(Topic::Cooking), 0);
    assert_eq!(stats.page_failures, 1);
    assert_eq!(stats.extracted, 0);
}

#[tokio::test]
async fn checkpoints_follow_log_frequency() {
    let fetcher = FakeFetcher::default()
        .with_page(SEED, sitemap(&["/1/", "/2/", "/3/", "/4/"]))
        .with_page(&url("/1/"), project("Craft", &[]))
        .with_page(&url("/2/"), project("Craft", &[]))
        .with_page(&url("/3/"), project("Craft", &[]))
        .with_page(&url("/4/"), project("Craft", &[]));

    let config = CrawlerConfig {
        log_frequency: 2,
        ..config()
    };
    let handler = RecordingHandler::persisting();
    let mut crawler = Crawler::new(fetcher, PageLimitPolicy { max_pages: 10 }, &config);
    let mut session = CrawlSession::new(SEED, Vec::<String>::new());

    crawler
        .run(&mut session, &handler)
        .await
        .expect("crawl should succeed");

    assert_eq!(session.processed, 5);
    // after pages 2 and 4, then once at the end
    assert_eq!(handler.checkpoints.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn failed_checkpoint_writes_do_not_stop_the_crawl() {
    let fetcher = FakeFetcher::default()
        .with_page(SEED, sitemap(&["/1/", "/2/", "/3/"]))
        .with_page(&url("/1/"), project("Craft", &[]))
        .with_page(&url("/2/"), project("Cooking", &[]))
        .with_page(&url("/3/"), project("Living", &[]));

    let config = CrawlerConfig {
        log_frequency: 1,
        ..config()
    };
    let handler = RecordingHandler {
        fail_checkpoints: true,
        ..RecordingHandler::persisting()
    };
    let mut crawler = Crawler::new(fetcher, PageLimitPolicy { max_pages: 10 }, &config);
    let mut session = CrawlSession::new(SEED, Vec::<String>::new());

    let stats = crawler
        .run(&mut session, &handler)
        .await
        .expect("checkpoint failures are not fatal");

    assert_eq!(
        handler.handled(),
        vec![url("/1/"), url("/2/"), url("/3/")]
    );
    assert_eq!(session.frontier.remaining(), 0);
    // one per processed page plus the final write
    assert_eq!(stats.checkpoint_failures, 5);
    assert_eq!(stats.extracted, 3);
}

#[tokio::test]
async fn resumed_session_skips_visited_pages() {
    let fetcher = FakeFetcher::default()
        .with_page(SEED, sitemap(&["/a/", "/b/"]))
        .with_page(&url("/a/"), project("Craft", &[]))
        .with_page(&url("/b/"), project("Craft", &[]));

    let mut session = CrawlSession::new(SEED, Vec::<String>::new());
    session.frontier.next(1, 0, &mut StdRng::seed_from_u64(1));
    session.frontier.mark_visited(SEED);
    session.frontier.mark_visited(&url("/a/"));
    session.frontier.extend(vec![url("/a/"), url("/b/")]);

    let handler = RecordingHandler::persisting();
    let mut crawler = Crawler::new(fetcher, PageLimitPolicy { max_pages: 10 }, &config());

    crawler
        .run(&mut session, &handler)
        .await
        .expect("crawl should succeed");

    assert_eq!(crawler.fetcher().fetched, vec![url("/b/")]);
    assert_eq!(handler.handled(), vec![url("/b/")]);
}
