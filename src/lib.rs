//! sitecheck - URL analysis crawler
//!
//! Accepts URLs, fetches their HTML and extracts structural metrics:
//! title, HTML version tag, heading counts, internal/external link counts,
//! broken links and login-form presence.
//!
//! # Architecture
//!
//! - [`config`] - Configuration management and settings
//! - [`crawler`] - Job queue, worker pool and the per-job pipeline
//! - [`parser`] - HTML analysis and link classification
//! - [`models`] - Core data structures and types
//! - [`storage`] - Record store seam and its implementations
//! - [`error`] - Typed errors per concern
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sitecheck::config::Config;
//! use sitecheck::crawler::CrawlerService;
//! use sitecheck::storage::MemoryRecordStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let store = Arc::new(MemoryRecordStore::new());
//!     let record = store.create("https://example.com");
//!
//!     let service = CrawlerService::new(&config, store)?;
//!     service.start().await?;
//!     service.submit(record.id).await?;
//!     service.stop().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod error;
pub mod models;
pub mod parser;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::crawler::checker::LinkChecker;
    pub use crate::crawler::fetcher::PageFetcher;
    pub use crate::crawler::CrawlerService;
    pub use crate::error::{FetchError, JobError, ParseError, PoolError, StoreError};
    pub use crate::models::{BrokenLink, CrawlResult, UrlRecord, UrlStatus};
    pub use crate::parser::PageAnalyzer;
    pub use crate::storage::{MemoryRecordStore, RecordStore, SqliteRecordStore};
}

// Direct re-exports for convenience
pub use crawler::CrawlerService;
pub use models::{CrawlResult, UrlRecord, UrlStatus};
