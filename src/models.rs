//! Core data structures for URL records and crawl results
//!
//! The crawler core does not own URL records; it reads and writes them
//! through the [`crate::storage::RecordStore`] seam. The types here mirror
//! the record layout of that store plus the ephemeral per-job result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Processing status of a URL record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlStatus {
    /// Submitted and waiting for a worker
    Queued,
    /// Claimed by a worker, crawl in progress
    Running,
    /// Crawl finished, metrics persisted
    Done,
    /// Crawl failed, cause in the record's error field
    Error,
}

impl UrlStatus {
    /// String representation used by the store and logs
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlStatus::Queued => "queued",
            UrlStatus::Running => "running",
            UrlStatus::Done => "done",
            UrlStatus::Error => "error",
        }
    }
}

impl std::str::FromStr for UrlStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "queued" => UrlStatus::Queued,
            "running" => UrlStatus::Running,
            "done" => UrlStatus::Done,
            _ => UrlStatus::Error,
        })
    }
}

impl std::fmt::Display for UrlStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A link whose liveness probe classified it as broken
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenLink {
    /// Resolved absolute URL of the link
    pub url: String,
    /// Probe status code (500 for transport failures)
    pub code: u16,
}

/// Heading tag counts keyed by tag name (h1..h6)
pub type HeadingCounts = BTreeMap<String, u32>;

/// A persisted URL record, owned by the record store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlRecord {
    pub id: u64,
    /// Page address; immutable once created
    pub address: String,
    pub title: String,
    pub html_version: String,
    pub heading_counts: HeadingCounts,
    pub internal_links: u32,
    pub external_links: u32,
    pub broken_links: Vec<BrokenLink>,
    pub has_login_form: bool,
    pub status: UrlStatus,
    /// Human-readable cause of the last failure, if any
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UrlRecord {
    /// Create a fresh record for a newly submitted address
    #[must_use]
    pub fn new(id: u64, address: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            address: address.into(),
            title: String::new(),
            html_version: String::new(),
            heading_counts: HeadingCounts::new(),
            internal_links: 0,
            external_links: 0,
            broken_links: Vec::new(),
            has_login_form: false,
            status: UrlStatus::Queued,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Number of broken links, derived from the list
    #[must_use]
    pub fn broken_count(&self) -> usize {
        self.broken_links.len()
    }
}

/// Metrics extracted from a single page
///
/// Ephemeral: produced by the analyzer, translated into a partial update
/// against the owning [`UrlRecord`], then discarded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub title: String,
    pub html_version: String,
    pub heading_counts: HeadingCounts,
    pub internal_links: u32,
    pub external_links: u32,
    pub broken_links: Vec<BrokenLink>,
    pub has_login_form: bool,
}

impl CrawlResult {
    /// Heading count map with all six tags present and zeroed
    #[must_use]
    pub fn empty_headings() -> HeadingCounts {
        (1..=6).map(|i| (format!("h{i}"), 0)).collect()
    }
}
