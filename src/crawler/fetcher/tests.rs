use super::*;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> CrawlerConfig {
    CrawlerConfig {
        user_agent: "diy-scraper-test/1.0".to_string(),
        timeout_seconds: 5,
        rate_limit_ms: 0,
        max_retries: 2,
        retry_delay_seconds: 0,
        ..CrawlerConfig::default()
    }
}

#[test]
fn retryable_classification() {
    assert!(FetchError::Status(500).is_retryable());
    assert!(FetchError::Status(503).is_retryable());
    assert!(FetchError::Status(429).is_retryable());
    assert!(!FetchError::Status(404).is_retryable());
    assert!(!FetchError::Status(403).is_retryable());
    assert!(FetchError::Transport(ureq::Error::ConnectionFailed).is_retryable());
    assert!(!FetchError::Transport(ureq::Error::BadUri("x".to_string())).is_retryable());
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_returns_body_and_sends_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/LED-Cube/"))
        .and(header("user-agent", "diy-scraper-test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>cube</html>", "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = HttpClient::new(&test_config());
    let body = client
        .fetch(&format!("{}/LED-Cube/", server.uri()))
        .await
        .expect("fetch should succeed");

    assert_eq!(body, "<html>cube</html>");
}

#[tokio::test(flavor = "multi_thread")]
async fn not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = HttpClient::new(&test_config());
    let error = client
        .fetch(&format!("{}/missing/", server.uri()))
        .await
        .expect_err("404 should fail");

    assert!(format!("{:#}", error).contains("HTTP error 404"));
}

#[tokio::test(flavor = "multi_thread")]
async fn server_errors_are_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky/"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = HttpClient::new(&test_config());
    let body = client
        .fetch(&format!("{}/flaky/", server.uri()))
        .await
        .expect("third attempt should succeed");

    assert_eq!(body, "ok");
}

#[tokio::test(flavor = "multi_thread")]
async fn retries_are_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let mut client = HttpClient::new(&test_config()).with_retry_delay(Duration::from_millis(1));
    assert!(
        client
            .fetch(&format!("{}/down/", server.uri()))
            .await
            .is_err()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn rate_limit_spaces_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let config = CrawlerConfig {
        rate_limit_ms: 100,
        ..test_config()
    };
    let mut client = HttpClient::new(&config);

    let started = Instant::now();
    for page in ["/a/", "/b/", "/c/"] {
        client
            .fetch(&format!("{}{}", server.uri(), page))
            .await
            .expect("fetch should succeed");
    }

    assert!(started.elapsed() >= Duration::from_millis(200));
}
