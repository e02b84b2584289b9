//! In-memory record store
//!
//! A HashMap-backed [`RecordStore`] used by tests and one-shot CLI runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StoreError;
use crate::models::{CrawlResult, UrlRecord, UrlStatus};
use crate::storage::RecordStore;

/// HashMap-backed store, safe for concurrent workers
#[derive(Debug)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<u64, UrlRecord>>,
    next_id: AtomicU64,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a new queued record for an address and return it
    pub fn create(&self, address: &str) -> UrlRecord {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let record = UrlRecord::new(id, address);
        self.records.lock().unwrap().insert(id, record.clone());
        record
    }

    /// Delete a record; returns whether it existed
    pub fn delete(&self, id: u64) -> bool {
        self.records.lock().unwrap().remove(&id).is_some()
    }

    /// Reset a record to queued for a rerun; returns whether it existed
    pub fn reset(&self, id: u64) -> bool {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&id) {
            Some(record) => {
                record.status = UrlStatus::Queued;
                record.error = None;
                record.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Snapshot of all records, ordered by id
    pub fn list(&self) -> Vec<UrlRecord> {
        let records = self.records.lock().unwrap();
        let mut all: Vec<UrlRecord> = records.values().cloned().collect();
        all.sort_by_key(|r| r.id);
        all
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get_by_id(&self, id: u64) -> Result<Option<UrlRecord>, StoreError> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: u64,
        status: UrlStatus,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.get_mut(&id) {
            record.status = status;
            record.error = error.map(str::to_string);
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_result(&self, id: u64, result: &CrawlResult) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.get_mut(&id) {
            record.title = result.title.clone();
            record.html_version = result.html_version.clone();
            record.heading_counts = result.heading_counts.clone();
            record.internal_links = result.internal_links;
            record.external_links = result.external_links;
            record.broken_links = result.broken_links.clone();
            record.has_login_form = result.has_login_form;
            record.status = UrlStatus::Done;
            record.error = None;
            record.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryRecordStore::new();
        let record = store.create("https://example.com");
        let loaded = store.get_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(loaded.address, "https://example.com");
        assert_eq!(loaded.status, UrlStatus::Queued);
    }

    #[tokio::test]
    async fn test_update_status_sets_error() {
        let store = MemoryRecordStore::new();
        let record = store.create("https://example.com");

        store
            .update_status(record.id, UrlStatus::Error, Some("HTTP status 404"))
            .await
            .unwrap();

        let loaded = store.get_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, UrlStatus::Error);
        assert_eq!(loaded.error.as_deref(), Some("HTTP status 404"));
    }

    #[tokio::test]
    async fn test_update_result_marks_done_and_clears_error() {
        let store = MemoryRecordStore::new();
        let record = store.create("https://example.com");
        store
            .update_status(record.id, UrlStatus::Error, Some("previous failure"))
            .await
            .unwrap();

        let result = CrawlResult {
            title: "Example".to_string(),
            html_version: "HTML5".to_string(),
            internal_links: 3,
            ..Default::default()
        };
        store.update_result(record.id, &result).await.unwrap();

        let loaded = store.get_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, UrlStatus::Done);
        assert!(loaded.error.is_none());
        assert_eq!(loaded.title, "Example");
        assert_eq!(loaded.internal_links, 3);
    }

    #[tokio::test]
    async fn test_reset_requeues() {
        let store = MemoryRecordStore::new();
        let record = store.create("https://example.com");
        store
            .update_status(record.id, UrlStatus::Done, None)
            .await
            .unwrap();

        assert!(store.reset(record.id));
        let loaded = store.get_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, UrlStatus::Queued);

        assert!(!store.reset(9999));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryRecordStore::new();
        let record = store.create("https://example.com");
        assert!(store.delete(record.id));
        assert!(store.get_by_id(record.id).await.unwrap().is_none());
        assert!(!store.delete(record.id));
    }
}
