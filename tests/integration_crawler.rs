#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

use anyhow::Result;
use diy_scraper::config::{Config, CrawlerConfig, EmbeddingConfig, ExtractionConfig, ProviderKind};
use diy_scraper::crawler::{CrawlSession, Crawler, HttpClient, TopicQuotaPolicy};
use diy_scraper::database::Database;
use diy_scraper::database::sqlite::queries::{ChunkQueries, DocumentQueries};
use diy_scraper::orchestrator::{CrawlOptions, Scraper};
use diy_scraper::pipeline::ContentPipeline;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn project_page(category: &str, channel: &str, title: &str, links: &[&str]) -> String {
    let related: String = links
        .iter()
        .map(|link| format!(r#"<li><a href="{link}">Related</a></li>"#))
        .collect();

    format!(
        r#"<!DOCTYPE html>
        <html>
        <head><title>{title}</title><script>track();</script></head>
        <body>
            <header><a>Home</a></header>
            <a class="category">{category}</a>
            <a class="channel">{channel}</a>
            <h1 class="header-title">{title}</h1>
            <article>
                <p>Collect the materials listed below before starting.</p>
                <p>Follow each step slowly and check your work as you go.</p>
                <p>Finish by cleaning the workspace and testing the result.</p>
                <iframe src="https://www.youtube.com/embed/{channel}"></iframe>
            </article>
            <aside><ul>{related}</ul></aside>
            <footer>Copyright</footer>
        </body>
        </html>"#
    )
}

/// A sitemap with two sections, a few projects and an Ollama endpoint on the same server
async fn setup_mock_site(server: &MockServer) {
    let sitemap = r#"<html><body>
        <div class="group-section">
            <ul class="sitemap-listing">
                <li><a href="/Arduino-Clock/">Arduino Clock</a></li>
                <li><a href="/contest/">Contests</a></li>
            </ul>
            <ul class="sitemap-listing"><li><a href="/ignored/">Second listing</a></li></ul>
        </div>
        <div class="group-section">
            <ul class="sitemap-listing">
                <li><a href="/Sourdough/">Sourdough</a></li>
                <li><a href="/Arduino-Clock/">Arduino Clock again</a></li>
            </ul>
        </div>
        </body></html>"#;

    Mock::given(method("GET"))
        .and(path("/sitemap"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/Arduino-Clock/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(project_page(
            "Circuits",
            "Arduino",
            "Arduino Clock",
            &["/Sourdough/", "/Broken/"],
        )))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/Sourdough/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(project_page(
            "Cooking",
            "Bread",
            "Sourdough Loaf",
            &["/Arduino-Clock/"],
        )))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/Broken/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/contest/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(0)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [{ "name": "nomic-embed-text:latest" }]
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "embeddings": [[0.1, 0.2, 0.3, 0.4]] })),
        )
        .mount(server)
        .await;
}

fn test_config(server: &MockServer, temp_dir: &TempDir) -> Config {
    let host = server
        .uri()
        .trim_start_matches("http://")
        .split(':')
        .next()
        .unwrap_or("127.0.0.1")
        .to_string();

    Config {
        crawler: CrawlerConfig {
            seed_url: format!("{}/sitemap", server.uri()),
            site_domain: host,
            blacklist: vec![format!("{}/contest/", server.uri())],
            rate_limit_ms: 0,
            max_retries: 0,
            timeout_seconds: 5,
            rng_seed: Some(42),
            ..CrawlerConfig::default()
        },
        extraction: ExtractionConfig {
            max_tokens: 16,
            ..ExtractionConfig::default()
        },
        embedding: EmbeddingConfig {
            provider: ProviderKind::Ollama,
            model: "nomic-embed-text".to_string(),
            base_url: server.uri(),
            requests_per_minute: 6000,
            delay_ms: 0,
            retry_attempts: 1,
            ..EmbeddingConfig::default()
        },
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn end_to_end_crawl_persists_documents_and_chunks() -> Result<()> {
    let server = MockServer::start().await;
    setup_mock_site(&server).await;
    let temp_dir = TempDir::new()?;

    let config = test_config(&server, &temp_dir);
    config.save()?;
    let loaded = Config::load(temp_dir.path())?;

    let scraper = Scraper::new(loaded).await?;
    let report = scraper
        .run(CrawlOptions {
            topic_quota: Some(1),
            ..CrawlOptions::default()
        })
        .await?;

    assert_eq!(report.stats.fetched, 3);
    assert_eq!(report.stats.fetch_failures, 1);
    assert_eq!(report.stats.sitemap_pages, 1);
    assert_eq!(report.stats.extracted, 2);
    assert_eq!(report.remaining, 0);

    let pool = scraper.database().pool();
    assert_eq!(DocumentQueries::count(pool).await?, 2);

    let clocks = DocumentQueries::list_by_url(pool, &format!("{}/Arduino-Clock/", server.uri()))
        .await?;
    assert_eq!(clocks.len(), 1);
    let clock = &clocks[0];
    assert_eq!(clock.category, "Circuits");
    assert_eq!(clock.sub_category, "Arduino");
    assert_eq!(clock.title, "Arduino Clock");
    assert_eq!(
        clock.youtube_url.as_deref(),
        Some("https://www.youtube.com/embed/Arduino")
    );
    assert!(clock.summary.is_some());
    assert_eq!(
        clock.summary_embedding_vector()?,
        Some(vec![0.1, 0.2, 0.3, 0.4])
    );

    let chunks = ChunkQueries::list_by_collection(pool, "circuits").await?;
    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|chunk| chunk.content_id == clock.id));
    assert_eq!(chunks[0].start_pointer, 0);
    for pair in chunks.windows(2) {
        assert_eq!(pair[0].end_pointer, pair[1].start_pointer);
        assert_eq!(pair[0].chunk_index + 1, pair[1].chunk_index);
    }
    assert!(chunks.iter().all(|chunk| chunk.embedding.is_some()));

    let cooking = ChunkQueries::list_by_collection(pool, "cooking").await?;
    assert_eq!(cooking.len(), 3);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn engine_with_quota_skips_saturated_topics() -> Result<()> {
    let server = MockServer::start().await;
    setup_mock_site(&server).await;
    let temp_dir = TempDir::new()?;
    let config = test_config(&server, &temp_dir);

    let database = Database::initialize_from_data_dir(temp_dir.path()).await?;
    let pipeline = ContentPipeline::new(Arc::new(database.clone()), None, &config.extraction);

    let mut crawler = Crawler::new(
        HttpClient::new(&config.crawler),
        TopicQuotaPolicy { quota: 1 },
        &config.crawler,
    );
    let mut session = CrawlSession::new(&config.crawler.seed_url, &config.crawler.blacklist);
    crawler.run(&mut session, &pipeline).await?;

    assert_eq!(DocumentQueries::count(database.pool()).await?, 2);
    let chunks = ChunkQueries::list_by_collection(database.pool(), "cooking").await?;
    assert!(chunks.iter().all(|chunk| chunk.embedding.is_none()));
    assert!(
        session
            .frontier
            .visited()
            .contains(&format!("{}/contest/", server.uri()))
    );

    Ok(())
}
