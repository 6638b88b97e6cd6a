use crate::common::{html, mount_no_robots, png, short_page, test_config};
use sumi_trawl::{Crawler, ExtractionTier, FetchOutcome};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_images(server: &MockServer) {
    let bytes = png(3, 2);
    for image_path in ["/img/a.png", "/img/b.png"] {
        Mock::given(method("GET"))
            .and(path(image_path))
            .respond_with(ResponseTemplate::new(200).set_body_raw(bytes.clone(), "image/png"))
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/img/not-image.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"hello".to_vec(), "text/plain"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_images_are_resolved_and_content_addressed() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;
    mount_images(&server).await;

    let main = r#"<p>Rust rust rust crawler</p>
        <img src="/img/a.png" alt="First">
        <img src="../img/b.png" alt="Second" width="30" height="20">
        <img src="/img/a.png" alt="Duplicate">
        <img src="/img/not-image.png">
        <img src="/img/missing.png">
        <img src="data:image/png;base64,iVBORw0KGgo=">"#;
    Mock::given(method("GET"))
        .and(path("/posts/page"))
        .respond_with(html(&short_page("Images", main)))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut crawler = Crawler::new(&test_config(temp.path()))
        .unwrap()
        .with_tiers(vec![ExtractionTier::DomFallback]);

    let record = match crawler
        .fetch(&format!("{}/posts/page", server.uri()))
        .await
        .unwrap()
    {
        FetchOutcome::Fetched(record) => record,
        other => panic!("unexpected outcome: {:?}", other),
    };

    assert_eq!(record.images.len(), 2);
    let first = &record.images[0];
    let second = &record.images[1];

    assert_eq!(first.absolute_url, format!("{}/img/a.png", server.uri()));
    assert_eq!(second.absolute_url, format!("{}/img/b.png", server.uri()));
    assert_eq!(first.alt_text, "First");

    // Same bytes, same name
    assert_eq!(first.content_hash, second.content_hash);
    assert_eq!(first.filename, second.filename);
    assert_eq!(first.filename, format!("image_{}.png", first.content_hash));

    // Probed when attributes are missing, taken from attributes otherwise
    assert_eq!((first.width, first.height), (Some(3), Some(2)));
    assert_eq!((second.width, second.height), (Some(30), Some(20)));
}

#[tokio::test]
async fn test_image_limit_per_page() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;
    mount_images(&server).await;

    let main = r#"<p>text</p><img src="/img/a.png"><img src="/img/b.png">"#;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(html(&short_page("Limited", main)))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut config = test_config(temp.path());
    config.images.max_per_page = 1;
    let mut crawler = Crawler::new(&config)
        .unwrap()
        .with_tiers(vec![ExtractionTier::DomFallback]);

    let FetchOutcome::Fetched(record) = crawler
        .fetch(&format!("{}/page", server.uri()))
        .await
        .unwrap()
    else {
        panic!("expected a fetched page");
    };
    assert_eq!(record.images.len(), 1);
}

#[tokio::test]
async fn test_images_disabled() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;
    Mock::given(method("GET"))
        .and(path("/img/a.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(png(1, 1), "image/png"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(html(&short_page("No images", r#"<p>x</p><img src="/img/a.png">"#)))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut config = test_config(temp.path());
    config.images.enabled = false;
    let mut crawler = Crawler::new(&config)
        .unwrap()
        .with_tiers(vec![ExtractionTier::DomFallback]);

    let FetchOutcome::Fetched(record) = crawler
        .fetch(&format!("{}/page", server.uri()))
        .await
        .unwrap()
    else {
        panic!("expected a fetched page");
    };
    assert!(record.images.is_empty());
}
