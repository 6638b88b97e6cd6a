use crate::common::{html, mount_no_robots, png, short_page, test_config};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use sumi_trawl::pipeline::{BatchStatus, Pipeline};
use sumi_trawl::progress::{EventPayload, ProgressNotifier, ProgressStatus};
use sumi_trawl::{ErrorKind, TrawlError};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn notifier() -> Arc<ProgressNotifier> {
    Arc::new(ProgressNotifier::new(100, Duration::from_secs(15)))
}

#[tokio::test]
async fn test_mixed_batch() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(html(&short_page("OK", "<p>Rust rust rust crawler</p>")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("<p>late</p>").set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path());
    let mut pipeline = Pipeline::new(&config, notifier()).unwrap();

    let targets = vec![
        format!("{}/ok", server.uri()),
        "not-a-url".to_string(),
        format!("{}/slow", server.uri()),
    ];
    let result = pipeline.run_batch(&targets, "client").await.unwrap();

    assert_eq!(result.summary.total, 3);
    assert_eq!(result.summary.successful, 1);
    assert_eq!(result.summary.failed, 2);
    assert_eq!(result.summary.skipped, 0);
    assert_eq!(result.summary.filtered, 0);
    assert_eq!(result.status, BatchStatus::PartialFailure);

    let record = &result.records[0];
    assert_eq!(record.url, targets[0]);
    assert_eq!(record.text, "Rust rust rust crawler");
    assert!((record.relevance_score - 0.632).abs() < 0.001);
    assert_eq!(record.metadata.title, "OK");

    let kinds: Vec<_> = result.errors.iter().map(|e| (e.url.as_str(), e.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            ("not-a-url", ErrorKind::Validation),
            (targets[2].as_str(), ErrorKind::Network),
        ]
    );

    let session = &result.session_path;
    assert!(result.session_id.starts_with("session_"));
    assert_eq!(
        fs::read_to_string(session.join("html").join("content_1.html")).unwrap(),
        "<main><p>Rust rust rust crawler</p></main>"
    );
    assert_eq!(
        fs::read_to_string(session.join("text").join("content_1.txt")).unwrap(),
        "Rust rust rust crawler"
    );
}

#[tokio::test]
async fn test_low_relevance_and_duplicates_are_not_persisted() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;
    let many_words = (0..30)
        .map(|i| format!("word{}", i))
        .collect::<Vec<_>>()
        .join(" ");
    Mock::given(method("GET"))
        .and(path("/diffuse"))
        .respond_with(html(&short_page("Diffuse", &format!("<p>{}</p>", many_words))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/focused"))
        .respond_with(html(&short_page("Focused", "<p>crawler crawler crawler</p>")))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut pipeline = Pipeline::new(&test_config(temp.path()), notifier()).unwrap();

    let focused = format!("{}/focused", server.uri());
    let targets = vec![format!("{}/diffuse", server.uri()), focused.clone(), focused];
    let result = pipeline.run_batch(&targets, "client").await.unwrap();

    assert_eq!(result.summary.successful, 1);
    assert_eq!(result.summary.filtered, 1);
    assert_eq!(result.summary.skipped, 1);
    assert_eq!(result.summary.failed, 0);
    assert_eq!(result.status, BatchStatus::Completed);

    // The single persisted record is content_1, even though it was the second target
    assert!(result.session_path.join("html").join("content_1.html").exists());
    assert!(!result.session_path.join("html").join("content_2.html").exists());
}

#[tokio::test]
async fn test_identical_images_are_written_once() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;
    let bytes = png(2, 2);
    for image_path in ["/img/a.png", "/img/b.png"] {
        Mock::given(method("GET"))
            .and(path(image_path))
            .respond_with(ResponseTemplate::new(200).set_body_raw(bytes.clone(), "image/png"))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/gallery"))
        .respond_with(html(&short_page(
            "Gallery",
            r#"<p>gallery gallery</p><img src="/img/a.png"><img src="/img/b.png">"#,
        )))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut pipeline = Pipeline::new(&test_config(temp.path()), notifier()).unwrap();

    let result = pipeline
        .run_batch(&[format!("{}/gallery", server.uri())], "client")
        .await
        .unwrap();

    assert_eq!(result.records[0].images.len(), 2);
    let written: Vec<_> = fs::read_dir(result.session_path.join("images"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(written, vec![result.records[0].images[0].filename.clone()]);
    assert_eq!(
        fs::read(result.session_path.join("images").join(&written[0])).unwrap(),
        bytes
    );
}

#[tokio::test]
async fn test_all_failed_batch() {
    let temp = TempDir::new().unwrap();
    let mut pipeline = Pipeline::new(&test_config(temp.path()), notifier()).unwrap();

    let targets = vec!["nope".to_string(), "ftp://x.com/".to_string()];
    let result = pipeline.run_batch(&targets, "client").await.unwrap();

    assert_eq!(result.status, BatchStatus::AllFailed);
    assert!(result.records.is_empty());
    assert_eq!(result.errors.len(), 2);
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let temp = TempDir::new().unwrap();
    let mut pipeline = Pipeline::new(&test_config(temp.path()), notifier()).unwrap();

    let err = pipeline.run_batch(&[], "client").await.unwrap_err();
    assert!(matches!(err, TrawlError::EmptyBatch));
}

#[tokio::test]
async fn test_session_failure_aborts_before_fetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html("<p>never</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not-a-directory");
    fs::write(&blocker, "file in the way").unwrap();

    let notifier = notifier();
    let mut stream = notifier.subscribe("client");
    let mut pipeline = Pipeline::new(&test_config(&blocker), Arc::clone(&notifier)).unwrap();

    let err = pipeline
        .run_batch(&[format!("{}/page", server.uri())], "client")
        .await
        .unwrap_err();
    assert!(matches!(err, TrawlError::Storage(_)));

    notifier.unsubscribe("client");
    let event = stream.next().await.unwrap();
    assert!(matches!(
        event.payload,
        EventPayload::Progress {
            status: ProgressStatus::Failed,
            ..
        }
    ));
}

#[tokio::test]
async fn test_progress_events_cover_the_batch() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(html(&short_page("OK", "<p>Rust rust rust crawler</p>")))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let notifier = notifier();
    let mut stream = notifier.subscribe("observer");
    let mut pipeline = Pipeline::new(&test_config(temp.path()), Arc::clone(&notifier)).unwrap();

    let targets = vec![format!("{}/ok", server.uri()), "bad url".to_string()];
    pipeline.run_batch(&targets, "observer").await.unwrap();

    notifier.unsubscribe("observer");
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event);
    }

    let processing = events
        .iter()
        .filter(|e| {
            matches!(
                e.payload,
                EventPayload::Progress {
                    status: ProgressStatus::Running,
                    ..
                }
            )
        })
        .count();
    assert_eq!(processing, 2);

    assert!(events.iter().any(|e| matches!(
        &e.payload,
        EventPayload::Log { message, .. } if message.contains("bad url")
    )));

    let last = events.last().unwrap();
    assert_eq!(
        last.payload,
        EventPayload::progress(Some(100), "Completed: 1 of 2 pages saved", ProgressStatus::Complete)
    );
    assert!(events.iter().all(|e| e.client_id == "observer"));
}

#[tokio::test]
async fn test_cleanup_runs_alongside_batch() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(html(&short_page("OK", "<p>Rust rust rust crawler</p>")))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut config = test_config(temp.path());
    config.session.cleanup_on_start = true;

    let expired = temp.path().join("session_20000101_000000");
    fs::create_dir_all(&expired).unwrap();

    let mut pipeline = Pipeline::new(&config, notifier()).unwrap();
    let result = pipeline
        .run_batch(&[format!("{}/ok", server.uri())], "client")
        .await
        .unwrap();

    assert!(!expired.exists());
    assert!(result.session_path.exists());
}
