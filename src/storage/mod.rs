//! Record store abstraction and implementations
//!
//! The crawler core treats URL records as owned by an external store and
//! talks to it through the [`RecordStore`] trait, so the core stays free of
//! a concrete storage dependency and testable with a fake store.
//!
//! Two implementations are provided:
//! - [`MemoryRecordStore`] - in-process HashMap store for tests and
//!   one-shot runs
//! - [`SqliteRecordStore`] - persistent SQLite store used by the CLI

pub mod memory;
pub mod sqlite;

pub use memory::MemoryRecordStore;
pub use sqlite::SqliteRecordStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{CrawlResult, UrlRecord, UrlStatus};

/// Interface the crawler core requires from the record store
///
/// The store is responsible for serializing concurrent updates to distinct
/// records; the pool guarantees no two workers are ever dispatched the same
/// id concurrently.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a record by id; `None` if it no longer exists
    async fn get_by_id(&self, id: u64) -> Result<Option<UrlRecord>, StoreError>;

    /// Set a record's status and error message (empty error clears it)
    async fn update_status(
        &self,
        id: u64,
        status: UrlStatus,
        error: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Persist crawl metrics, set status to done and clear the error field
    async fn update_result(&self, id: u64, result: &CrawlResult) -> Result<(), StoreError>;
}
