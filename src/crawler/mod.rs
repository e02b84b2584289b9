//! Crawl orchestration: bounded job queue, fixed worker pool, lifecycle
//!
//! [`CrawlerService`] owns the whole pool. Jobs are opaque record ids; an
//! external submitter enqueues an id, a worker dequeues it and runs the
//! fetch → analyze → persist pipeline against the record store. Lifecycle
//! is `stopped → running → stopped` with no intermediate states.

pub mod checker;
pub mod fetcher;
mod worker;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::config::{Config, CrawlerConfig};
use crate::crawler::checker::LinkChecker;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::worker::WorkerContext;
use crate::error::PoolError;
use crate::parser::PageAnalyzer;
use crate::storage::RecordStore;

/// Explicit pool state; all ownership of the running machinery lives in
/// the Running variant
enum PoolState {
    Stopped,
    Running(RunningPool),
}

struct RunningPool {
    /// Bounded FIFO of pending job ids; dropping this closes the queue
    queue_tx: mpsc::Sender<u64>,

    /// Cancellation signal broadcast to all workers
    cancel_tx: watch::Sender<bool>,

    /// One handle per spawned worker, joined on stop
    workers: Vec<JoinHandle<()>>,
}

/// Crawl orchestration service
///
/// Thread-safe: `submit` takes a read lock on the pool state so it can run
/// concurrently with other submitters, while `start`/`stop` take the write
/// lock.
pub struct CrawlerService {
    config: CrawlerConfig,
    store: Arc<dyn RecordStore>,
    fetcher: Arc<PageFetcher>,
    analyzer: Arc<PageAnalyzer>,
    state: RwLock<PoolState>,
}

impl CrawlerService {
    /// Build a service over the given record store
    ///
    /// HTTP clients for fetching and probing are constructed once here and
    /// shared by all workers.
    pub fn new(config: &Config, store: Arc<dyn RecordStore>) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let fetcher = PageFetcher::new(&config.crawler.user_agent, config.request_timeout())
            .context("Failed to create page fetcher")?;

        let checker = LinkChecker::new(&config.crawler.user_agent, config.link_check_timeout())
            .context("Failed to create link checker")?;

        Ok(Self {
            config: config.crawler.clone(),
            store,
            fetcher: Arc::new(fetcher),
            analyzer: Arc::new(PageAnalyzer::new(checker)),
            state: RwLock::new(PoolState::Stopped),
        })
    }

    /// Start the worker pool
    ///
    /// # Errors
    ///
    /// Returns `PoolError::AlreadyRunning` if the pool is already running.
    pub async fn start(&self) -> Result<(), PoolError> {
        let mut state = self.state.write().await;
        if matches!(*state, PoolState::Running(_)) {
            return Err(PoolError::AlreadyRunning);
        }

        let (queue_tx, queue_rx) = mpsc::channel::<u64>(self.config.queue_size);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let queue_rx = Arc::new(Mutex::new(queue_rx));

        let workers = (0..self.config.workers)
            .map(|worker_id| {
                let ctx = WorkerContext {
                    store: Arc::clone(&self.store),
                    fetcher: Arc::clone(&self.fetcher),
                    analyzer: Arc::clone(&self.analyzer),
                    request_timeout: std::time::Duration::from_secs(
                        self.config.request_timeout_secs,
                    ),
                };
                tokio::spawn(worker::run(
                    worker_id,
                    Arc::clone(&queue_rx),
                    cancel_rx.clone(),
                    ctx,
                ))
            })
            .collect();

        *state = PoolState::Running(RunningPool {
            queue_tx,
            cancel_tx,
            workers,
        });

        tracing::info!(workers = self.config.workers, "crawler service started");
        Ok(())
    }

    /// Stop the pool and wait for every worker to exit
    ///
    /// Idempotent; a second call is a no-op. Closes the queue, broadcasts
    /// cancellation and blocks until the drain completes. In-flight jobs
    /// finish or hit their own timeout before their worker exits.
    pub async fn stop(&self) {
        let mut state = self.state.write().await;
        let pool = match std::mem::replace(&mut *state, PoolState::Stopped) {
            PoolState::Running(pool) => pool,
            PoolState::Stopped => return,
        };

        drop(pool.queue_tx);
        let _ = pool.cancel_tx.send(true);

        for handle in pool.workers {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "worker task panicked during shutdown");
            }
        }

        tracing::info!("crawler service stopped");
    }

    /// Submit a job id to the queue
    ///
    /// Non-blocking: a full queue is backpressure the caller must handle.
    ///
    /// # Errors
    ///
    /// - `PoolError::NotRunning` when the pool is stopped
    /// - `PoolError::QueueFull` when the bounded queue is at capacity
    pub async fn submit(&self, id: u64) -> Result<(), PoolError> {
        let state = self.state.read().await;
        let PoolState::Running(pool) = &*state else {
            return Err(PoolError::NotRunning);
        };

        pool.queue_tx.try_send(id).map_err(|e| match e {
            TrySendError::Full(_) => {
                tracing::debug!(id, "job queue full, rejecting submission");
                PoolError::QueueFull
            }
            TrySendError::Closed(_) => PoolError::NotRunning,
        })
    }

    /// Whether the pool is currently running
    pub async fn is_running(&self) -> bool {
        matches!(*self.state.read().await, PoolState::Running(_))
    }
}
