use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sitecheck::config::Config;
use sitecheck::crawler::CrawlerService;
use sitecheck::error::PoolError;
use sitecheck::models::UrlStatus;
use sitecheck::storage::{RecordStore, SqliteRecordStore};

#[derive(Parser)]
#[command(
    name = "sitecheck",
    version,
    about = "URL analysis crawler: fetches pages and extracts structural metrics",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl one or more URLs and print their metrics
    Crawl {
        /// URLs to analyze
        #[arg(required = true)]
        urls: Vec<String>,

        /// SQLite database path (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Number of concurrent workers (overrides config)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Per-job fetch timeout in seconds (overrides config)
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// List all stored URL records
    List {
        /// SQLite database path (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Reset a record to queued so the next crawl run picks it up again
    Rerun {
        /// Record id
        id: u64,

        /// SQLite database path (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    match cli.command {
        Commands::Crawl {
            urls,
            db,
            workers,
            timeout,
        } => crawl(config, urls, db, workers, timeout).await,
        Commands::List { db } => list(config, db),
        Commands::Rerun { id, db } => rerun(config, id, db),
    }
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("sitecheck=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("sitecheck=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

fn open_store(config: &Config, db: Option<PathBuf>) -> Result<Arc<SqliteRecordStore>> {
    let path = db.unwrap_or_else(|| config.database.sqlite_path.clone());
    let store = SqliteRecordStore::new(&path)
        .with_context(|| format!("Failed to open record store at {}", path.display()))?;
    Ok(Arc::new(store))
}

async fn crawl(
    mut config: Config,
    urls: Vec<String>,
    db: Option<PathBuf>,
    workers: Option<usize>,
    timeout: Option<u64>,
) -> Result<()> {
    if let Some(workers) = workers {
        config.crawler.workers = workers;
    }
    if let Some(timeout) = timeout {
        config.crawler.request_timeout_secs = timeout;
    }

    let store = open_store(&config, db)?;

    let ids: Vec<u64> = urls
        .iter()
        .map(|url| store.create(url).map(|record| record.id))
        .collect::<std::result::Result<_, _>>()
        .context("Failed to create URL records")?;

    let dyn_store: Arc<dyn RecordStore> = store.clone();
    let service = CrawlerService::new(&config, dyn_store)?;
    service
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start crawler: {e}"))?;

    for &id in &ids {
        match service.submit(id).await {
            Ok(()) => {}
            Err(PoolError::QueueFull) => {
                tracing::warn!(id, "queue full, job dropped");
            }
            Err(e) => {
                service.stop().await;
                anyhow::bail!("failed to submit job {id}: {e}");
            }
        }
    }

    wait_for_completion(&store, &ids, &config).await?;
    service.stop().await;

    for &id in &ids {
        if let Some(record) = store.get_by_id(id).await? {
            print_record(&record);
        }
    }

    Ok(())
}

/// Poll the store until every submitted record reaches a terminal status
async fn wait_for_completion(
    store: &Arc<SqliteRecordStore>,
    ids: &[u64],
    config: &Config,
) -> Result<()> {
    // Per-job fetch timeout plus headroom for link probes
    let deadline =
        tokio::time::Instant::now() + config.request_timeout() + Duration::from_secs(120);

    loop {
        let mut pending = 0;
        for &id in ids {
            match store.get_by_id(id).await? {
                Some(record) => {
                    if !matches!(record.status, UrlStatus::Done | UrlStatus::Error) {
                        pending += 1;
                    }
                }
                None => {}
            }
        }

        if pending == 0 {
            return Ok(());
        }

        if tokio::time::Instant::now() >= deadline {
            tracing::warn!(pending, "timed out waiting for jobs to finish");
            return Ok(());
        }

        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}

fn print_record(record: &sitecheck::models::UrlRecord) {
    println!("[{}] {} ({})", record.id, record.address, record.status);
    match record.status {
        UrlStatus::Done => {
            println!("  title:          {}", record.title);
            println!("  html version:   {}", record.html_version);
            let headings: Vec<String> = record
                .heading_counts
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(|(tag, count)| format!("{tag}={count}"))
                .collect();
            println!(
                "  headings:       {}",
                if headings.is_empty() {
                    "none".to_string()
                } else {
                    headings.join(" ")
                }
            );
            println!("  internal links: {}", record.internal_links);
            println!("  external links: {}", record.external_links);
            println!("  login form:     {}", record.has_login_form);
            println!("  broken links:   {}", record.broken_count());
            for link in &record.broken_links {
                println!("    {} ({})", link.url, link.code);
            }
        }
        UrlStatus::Error => {
            println!("  error: {}", record.error.as_deref().unwrap_or("unknown"));
        }
        _ => {}
    }
}

fn list(config: Config, db: Option<PathBuf>) -> Result<()> {
    let store = open_store(&config, db)?;
    let records = store.list().context("Failed to list records")?;

    if records.is_empty() {
        println!("No records.");
        return Ok(());
    }

    for record in records {
        println!(
            "[{}] {} status={} internal={} external={} broken={}",
            record.id,
            record.address,
            record.status,
            record.internal_links,
            record.external_links,
            record.broken_count()
        );
    }
    Ok(())
}

fn rerun(config: Config, id: u64, db: Option<PathBuf>) -> Result<()> {
    let store = open_store(&config, db)?;
    if store.reset(id).context("Failed to reset record")? {
        println!("Record {id} reset to queued.");
    } else {
        println!("Record {id} not found.");
    }
    Ok(())
}
