//! Error types for the sitecheck crawler
//!
//! Pool and queue errors are returned synchronously to callers of
//! `start`/`submit`. Per-job pipeline errors are never raised to a caller;
//! they end up in the record's status/error fields.

use thiserror::Error;

/// Errors returned by the lifecycle controller and job queue
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// start() called while the pool is already running
    #[error("crawler service is already running")]
    AlreadyRunning,

    /// submit() called while the pool is stopped
    #[error("crawler service is not running")]
    NotRunning,

    /// Bounded queue is at capacity; caller decides whether to drop or log
    #[error("job queue is full")]
    QueueFull,
}

/// Errors that can occur while fetching a page
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport-level request failure
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response carried a non-200 status
    #[error("HTTP status {0}")]
    Status(u16),

    /// Per-job timeout elapsed before the response arrived
    #[error("request timed out")]
    Timeout,

    /// Pool was stopped while the fetch was in flight
    #[error("fetch cancelled by shutdown")]
    Cancelled,
}

/// Errors that can occur while analyzing a page
#[derive(Error, Debug)]
pub enum ParseError {
    /// The record's own address could not be parsed as a base URL
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

/// Errors raised by record store implementations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Aggregate per-job pipeline error
///
/// Rendered into the record's error field; the variant message is what a
/// reader of the store later sees.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("persist failed: {0}")]
    Store(#[from] StoreError),
}
