//! Shared helpers for integration tests

use std::sync::Arc;
use std::time::Duration;

use sitecheck::config::Config;
use sitecheck::models::{UrlRecord, UrlStatus};
use sitecheck::storage::{MemoryRecordStore, RecordStore};

/// Config tuned for fast tests: short timeouts, small pool
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.crawler.workers = 2;
    config.crawler.queue_size = 16;
    config.crawler.request_timeout_secs = 5;
    config.crawler.link_check_timeout_secs = 2;
    config
}

/// Poll the store until the record reaches a terminal status
///
/// Panics if the record does not settle within ten seconds.
pub async fn wait_terminal(store: &Arc<MemoryRecordStore>, id: u64) -> UrlRecord {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let record = store
            .get_by_id(id)
            .await
            .expect("store read failed")
            .expect("record vanished");
        if matches!(record.status, UrlStatus::Done | UrlStatus::Error) {
            return record;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "record {id} never reached a terminal status (last: {})",
            record.status
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
