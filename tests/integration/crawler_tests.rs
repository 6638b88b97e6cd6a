use crate::common::{html, long_article, mount_no_robots, mount_robots, short_page, test_config};
use std::time::{Duration, Instant};
use sumi_trawl::crawler::SkipReason;
use sumi_trawl::{Crawler, ErrorKind, ExtractionTier, FetchOutcome, RawRecord};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetched(outcome: FetchOutcome) -> RawRecord {
    match outcome {
        FetchOutcome::Fetched(record) => *record,
        FetchOutcome::Skipped(reason) => panic!("expected a fetched page, got {:?}", reason),
    }
}

#[tokio::test]
async fn test_readability_tier_wins_on_articles() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(html(&long_article()))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut crawler = Crawler::new(&test_config(temp.path())).unwrap();

    let record = fetched(crawler.fetch(&format!("{}/article", server.uri())).await.unwrap());
    assert_eq!(record.tier, ExtractionTier::Readability);
    assert!(record.html.contains("systems programming language"));
    assert_eq!(record.metadata.title, "Why Rust");
}

#[tokio::test]
async fn test_short_page_falls_back_to_dom_tier() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;
    Mock::given(method("GET"))
        .and(path("/short"))
        .respond_with(html(&short_page("Short", "<p>Rust rust rust crawler</p>")))
        .expect(2)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut crawler = Crawler::new(&test_config(temp.path())).unwrap();

    let url = format!("{}/short", server.uri());
    let record = fetched(crawler.fetch(&url).await.unwrap());

    assert_eq!(record.tier, ExtractionTier::DomFallback);
    assert_eq!(record.html, "<main><p>Rust rust rust crawler</p></main>");
    assert_eq!(record.metadata.title, "Short");
    assert_eq!(record.metadata.description, "A test page");
    assert!(record.links.contains(&format!("{}/home", server.uri())));
}

#[tokio::test]
async fn test_visited_url_is_fetched_once() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;
    Mock::given(method("GET"))
        .and(path("/once"))
        .respond_with(html(&short_page("Once", "<p>hello</p>")))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut crawler = Crawler::new(&test_config(temp.path()))
        .unwrap()
        .with_tiers(vec![ExtractionTier::DomFallback]);

    let url = format!("{}/once", server.uri());
    assert!(matches!(
        crawler.fetch(&url).await.unwrap(),
        FetchOutcome::Fetched(_)
    ));
    assert!(matches!(
        crawler.fetch(&url).await.unwrap(),
        FetchOutcome::Skipped(SkipReason::AlreadyVisited)
    ));
}

#[tokio::test]
async fn test_failed_url_is_not_retried() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut crawler = Crawler::new(&test_config(temp.path())).unwrap();
    let url = format!("{}/broken", server.uri());

    let err = crawler.fetch(&url).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(err.to_string().contains("HTTP 500"));

    assert!(matches!(
        crawler.fetch(&url).await.unwrap(),
        FetchOutcome::Skipped(SkipReason::AlreadyVisited)
    ));
}

#[tokio::test]
async fn test_robots_disallow_skips_without_fetching() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /private").await;
    Mock::given(method("GET"))
        .and(path("/private/page"))
        .respond_with(html("<p>secret</p>"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/public"))
        .respond_with(html(&short_page("Public", "<p>open</p>")))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut crawler = Crawler::new(&test_config(temp.path()))
        .unwrap()
        .with_tiers(vec![ExtractionTier::DomFallback]);

    let outcome = crawler
        .fetch(&format!("{}/private/page", server.uri()))
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        FetchOutcome::Skipped(SkipReason::DisallowedByRobots)
    ));

    let outcome = crawler.fetch(&format!("{}/public", server.uri())).await.unwrap();
    assert!(matches!(outcome, FetchOutcome::Fetched(_)));
}

#[tokio::test]
async fn test_robots_fetched_once_per_origin() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"User-agent: *\nDisallow: /private".to_vec(), "text/plain"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(html(&short_page("Any", "<p>text</p>")))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut crawler = Crawler::new(&test_config(temp.path()))
        .unwrap()
        .with_tiers(vec![ExtractionTier::DomFallback]);

    for page in ["/one", "/two", "/private/three"] {
        crawler.fetch(&format!("{}{}", server.uri(), page)).await.unwrap();
    }
}

#[tokio::test]
async fn test_robots_fetch_failure_allows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(html(&short_page("Page", "<p>text</p>")))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut crawler = Crawler::new(&test_config(temp.path()))
        .unwrap()
        .with_tiers(vec![ExtractionTier::DomFallback]);

    let outcome = crawler.fetch(&format!("{}/page", server.uri())).await.unwrap();
    assert!(matches!(outcome, FetchOutcome::Fetched(_)));
}

#[tokio::test]
async fn test_non_html_content_is_extraction_error() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;
    Mock::given(method("GET"))
        .and(path("/doc.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"))
        .expect(2)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut crawler = Crawler::new(&test_config(temp.path())).unwrap();

    let err = crawler
        .fetch(&format!("{}/doc.pdf", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Extraction);
}

#[tokio::test]
async fn test_timeout_is_network_error() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("<p>late</p>").set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut crawler = Crawler::new(&test_config(temp.path())).unwrap();

    let err = crawler
        .fetch(&format!("{}/slow", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}

#[tokio::test]
async fn test_invalid_url_never_touches_network() {
    let temp = TempDir::new().unwrap();
    let mut crawler = Crawler::new(&test_config(temp.path())).unwrap();

    for bad in ["not-a-url", "ftp://x.com/file", "http://"] {
        let err = crawler.fetch(bad).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "for {}", bad);
    }
}

#[tokio::test]
async fn test_request_delay_spaces_page_fetches() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;
    Mock::given(method("GET"))
        .respond_with(html(&short_page("Any", "<p>text</p>")))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut config = test_config(temp.path());
    config.crawler.request_delay_ms = 300;
    let mut crawler = Crawler::new(&config)
        .unwrap()
        .with_tiers(vec![ExtractionTier::DomFallback]);

    let start = Instant::now();
    crawler.fetch(&format!("{}/a", server.uri())).await.unwrap();
    crawler.fetch(&format!("{}/b", server.uri())).await.unwrap();
    crawler.fetch(&format!("{}/c", server.uri())).await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(600));
}
