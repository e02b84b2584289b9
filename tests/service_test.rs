//! End-to-end tests for the crawler service: queue, pool, lifecycle and
//! the per-job pipeline against a fake store and mock origin.

mod common;

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{test_config, wait_terminal};
use sitecheck::crawler::CrawlerService;
use sitecheck::error::PoolError;
use sitecheck::models::UrlStatus;
use sitecheck::storage::{MemoryRecordStore, RecordStore};

/// Full pipeline: fetch, analyze, persist, done
#[tokio::test]
async fn test_job_completes_with_metrics() {
    let mock_server = MockServer::start().await;

    let html = r#"<html><head><title>Home</title></head><body>
        <h1>Welcome</h1>
        <a href="/ok">fine</a>
        <a href="/gone">broken</a>
        <input type="password">
    </body></html>"#;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(&mock_server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryRecordStore::new());
    let record = store.create(&format!("{}/page", mock_server.uri()));

    let service = CrawlerService::new(&test_config(), store.clone()).unwrap();
    service.start().await.unwrap();
    service.submit(record.id).await.unwrap();

    let done = wait_terminal(&store, record.id).await;
    service.stop().await;

    assert_eq!(done.status, UrlStatus::Done);
    assert!(done.error.is_none());
    assert_eq!(done.title, "Home");
    assert_eq!(done.html_version, "HTML5");
    assert_eq!(done.heading_counts.get("h1"), Some(&1));
    assert_eq!(done.internal_links, 2);
    assert_eq!(done.external_links, 0);
    assert!(done.has_login_form);
    assert_eq!(done.broken_count(), 1);
    assert_eq!(done.broken_links[0].code, 404);
}

/// A 404 page ends in error with the code in the message and metric
/// fields untouched
#[tokio::test]
async fn test_missing_page_marks_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryRecordStore::new());
    let record = store.create(&format!("{}/gone", mock_server.uri()));

    let service = CrawlerService::new(&test_config(), store.clone()).unwrap();
    service.start().await.unwrap();
    service.submit(record.id).await.unwrap();

    let failed = wait_terminal(&store, record.id).await;
    service.stop().await;

    assert_eq!(failed.status, UrlStatus::Error);
    let message = failed.error.clone().expect("error message present");
    assert!(message.contains("404"), "message was: {message}");

    // Metric fields are left untouched on failure
    assert_eq!(failed.title, "");
    assert_eq!(failed.heading_counts.len(), 0);
    assert_eq!(failed.internal_links, 0);
    assert_eq!(failed.broken_count(), 0);
}

/// A record that is no longer queued is skipped, protecting against
/// duplicate enqueues
#[tokio::test]
async fn test_non_queued_record_skipped() {
    let store = Arc::new(MemoryRecordStore::new());
    let record = store.create("http://127.0.0.1:1/never-fetched");
    store
        .update_status(record.id, UrlStatus::Done, None)
        .await
        .unwrap();

    let service = CrawlerService::new(&test_config(), store.clone()).unwrap();
    service.start().await.unwrap();
    service.submit(record.id).await.unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    service.stop().await;

    let after = store.get_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(after.status, UrlStatus::Done);
    assert!(after.error.is_none());
}

/// An id with no record behind it is dropped without disturbing the pool
#[tokio::test]
async fn test_unknown_id_ignored() {
    let store = Arc::new(MemoryRecordStore::new());
    let service = CrawlerService::new(&test_config(), store.clone()).unwrap();

    service.start().await.unwrap();
    service.submit(12345).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    service.stop().await;
    assert!(!service.is_running().await);
}

/// Backpressure: a full queue rejects the submission instead of blocking
#[tokio::test]
async fn test_queue_full_backpressure() {
    let mock_server = MockServer::start().await;

    // Slow responses keep the single worker busy
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let mut config = test_config();
    config.crawler.workers = 1;
    config.crawler.queue_size = 1;

    let store = Arc::new(MemoryRecordStore::new());
    let first = store.create(&format!("{}/a", mock_server.uri()));
    let second = store.create(&format!("{}/b", mock_server.uri()));
    let third = store.create(&format!("{}/c", mock_server.uri()));

    let service = CrawlerService::new(&config, store.clone()).unwrap();
    service.start().await.unwrap();

    service.submit(first.id).await.unwrap();
    // Let the worker claim the first job so the queue is empty again
    tokio::time::sleep(Duration::from_millis(200)).await;
    service.submit(second.id).await.unwrap();

    assert_eq!(service.submit(third.id).await, Err(PoolError::QueueFull));

    service.stop().await;
}

/// stop() drains: after it returns no record is left running
#[tokio::test]
async fn test_stop_leaves_no_job_running() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><head><title>slow</title></head></html>")
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryRecordStore::new());
    let record = store.create(&format!("{}/slow", mock_server.uri()));

    let service = CrawlerService::new(&test_config(), store.clone()).unwrap();
    service.start().await.unwrap();
    service.submit(record.id).await.unwrap();

    // Give the worker time to claim the job, then stop mid-fetch
    tokio::time::sleep(Duration::from_millis(100)).await;
    service.stop().await;

    let after = store.get_by_id(record.id).await.unwrap().unwrap();
    assert!(
        matches!(after.status, UrlStatus::Done | UrlStatus::Error),
        "record left in {} after clean stop",
        after.status
    );
}

/// Submitting several jobs, each reaches exactly one terminal status
#[tokio::test]
async fn test_all_jobs_reach_terminal_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><head><title>ok</title></head></html>"),
        )
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryRecordStore::new());
    let ids: Vec<u64> = (0..8)
        .map(|i| store.create(&format!("{}/p{i}", mock_server.uri())).id)
        .collect();

    let service = CrawlerService::new(&test_config(), store.clone()).unwrap();
    service.start().await.unwrap();
    for &id in &ids {
        service.submit(id).await.unwrap();
    }

    for &id in &ids {
        let record = wait_terminal(&store, id).await;
        assert_eq!(record.status, UrlStatus::Done);
        assert_eq!(record.title, "ok");
    }
    service.stop().await;
}

/// Restart after stop works and serves new jobs
#[tokio::test]
async fn test_restart_cycle() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryRecordStore::new());
    let service = CrawlerService::new(&test_config(), store.clone()).unwrap();

    service.start().await.unwrap();
    service.stop().await;

    service.start().await.unwrap();
    let record = store.create(&format!("{}/again", mock_server.uri()));
    service.submit(record.id).await.unwrap();
    let done = wait_terminal(&store, record.id).await;
    assert_eq!(done.status, UrlStatus::Done);
    service.stop().await;
}
