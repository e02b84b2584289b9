//! Per-job crawl pipeline
//!
//! Each worker executes one job end-to-end: load the record, guard its
//! status, mark it running, fetch under the pool timeout, analyze, persist.
//! Every step is a hard gate; pipeline errors are never raised to a caller,
//! they land in the record's status/error fields.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};

use crate::crawler::fetcher::PageFetcher;
use crate::error::{FetchError, JobError};
use crate::models::{CrawlResult, UrlRecord, UrlStatus};
use crate::parser::PageAnalyzer;
use crate::storage::RecordStore;

/// Shared handles a worker needs to run jobs
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub store: Arc<dyn RecordStore>,
    pub fetcher: Arc<PageFetcher>,
    pub analyzer: Arc<PageAnalyzer>,
    pub request_timeout: Duration,
}

/// Worker loop: drain the queue until it closes or the pool is cancelled
pub(crate) async fn run(
    worker_id: usize,
    queue: Arc<Mutex<mpsc::Receiver<u64>>>,
    mut cancel: watch::Receiver<bool>,
    ctx: WorkerContext,
) {
    tracing::debug!(worker_id, "worker started");

    loop {
        let next = {
            let mut rx = queue.lock().await;
            tokio::select! {
                id = rx.recv() => id,
                () = cancelled(&mut cancel) => None,
            }
        };

        let Some(id) = next else { break };
        process_job(worker_id, id, &mut cancel, &ctx).await;
    }

    tracing::debug!(worker_id, "worker shutting down");
}

/// Resolve once the cancellation signal flips to true
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    while !*cancel.borrow_and_update() {
        // A dropped sender also means shutdown
        if cancel.changed().await.is_err() {
            return;
        }
    }
}

/// Execute one job; best-effort, so load failures abort silently
async fn process_job(
    worker_id: usize,
    id: u64,
    cancel: &mut watch::Receiver<bool>,
    ctx: &WorkerContext,
) {
    let record = match ctx.store.get_by_id(id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            tracing::warn!(id, "record not found, skipping job");
            return;
        }
        Err(e) => {
            tracing::warn!(id, error = %e, "failed to load record");
            return;
        }
    };

    // Guard against a duplicate enqueue of an already-processed or
    // in-flight job
    if record.status != UrlStatus::Queued {
        tracing::debug!(id, status = %record.status, "record not queued, skipping job");
        return;
    }

    if let Err(e) = ctx.store.update_status(id, UrlStatus::Running, None).await {
        tracing::warn!(id, error = %e, "failed to mark record running");
        return;
    }

    match run_pipeline(&record, cancel, ctx).await {
        Ok(result) => {
            if let Err(e) = ctx.store.update_result(id, &result).await {
                record_failure(ctx, id, &JobError::from(e).to_string()).await;
                return;
            }
            tracing::info!(
                worker_id,
                id,
                address = %record.address,
                internal = result.internal_links,
                external = result.external_links,
                broken = result.broken_links.len(),
                "job completed"
            );
        }
        Err(err) => {
            let cause = err.to_string();
            tracing::warn!(worker_id, id, address = %record.address, error = %cause, "job failed");
            record_failure(ctx, id, &cause).await;
        }
    }
}

/// Fetch and analyze; the fetch races the pool-wide cancellation signal
async fn run_pipeline(
    record: &UrlRecord,
    cancel: &mut watch::Receiver<bool>,
    ctx: &WorkerContext,
) -> Result<CrawlResult, JobError> {
    let html = tokio::select! {
        () = cancelled(cancel) => return Err(FetchError::Cancelled.into()),
        fetched = tokio::time::timeout(ctx.request_timeout, ctx.fetcher.fetch(&record.address)) => {
            match fetched {
                Ok(result) => result.map_err(JobError::from)?,
                Err(_) => return Err(FetchError::Timeout.into()),
            }
        }
    };

    let result = ctx.analyzer.analyze(&html, &record.address).await?;
    Ok(result)
}

/// Write the error status; a failure here is logged, not retried
async fn record_failure(ctx: &WorkerContext, id: u64, cause: &str) {
    if let Err(e) = ctx
        .store
        .update_status(id, UrlStatus::Error, Some(cause))
        .await
    {
        tracing::warn!(id, error = %e, "failed to record job failure");
    }
}
