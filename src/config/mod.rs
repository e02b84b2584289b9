//! Configuration management for the sitecheck crawler
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Crawler configuration
    pub crawler: CrawlerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Crawler-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent workers draining the job queue
    pub workers: usize,

    /// Capacity of the bounded job queue
    pub queue_size: usize,

    /// Per-job page fetch timeout in seconds
    pub request_timeout_secs: u64,

    /// Timeout for link liveness probes in seconds
    pub link_check_timeout_secs: u64,

    /// User agent string sent with fetches and probes
    pub user_agent: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub sqlite_path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let workers = std::env::var("SITECHECK_WORKERS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(5);

        let queue_size = std::env::var("SITECHECK_QUEUE_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(100);

        let request_timeout_secs = std::env::var("SITECHECK_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let link_check_timeout_secs = std::env::var("SITECHECK_LINK_CHECK_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(10);

        let user_agent = std::env::var("SITECHECK_USER_AGENT")
            .unwrap_or_else(|_| format!("sitecheck/{}", env!("CARGO_PKG_VERSION")));

        let sqlite_path = std::env::var("SITECHECK_SQLITE_PATH")
            .unwrap_or_else(|_| String::from("data/sitecheck.db"))
            .into();

        let log_level =
            std::env::var("SITECHECK_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));

        let log_format =
            std::env::var("SITECHECK_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        Ok(Self {
            crawler: CrawlerConfig {
                workers,
                queue_size,
                request_timeout_secs,
                link_check_timeout_secs,
                user_agent,
            },
            database: DatabaseConfig { sqlite_path },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.crawler.workers == 0 {
            anyhow::bail!("workers must be greater than 0");
        }

        if self.crawler.queue_size == 0 {
            anyhow::bail!("queue_size must be greater than 0");
        }

        if self.crawler.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if self.crawler.link_check_timeout_secs == 0 {
            anyhow::bail!("link_check_timeout_secs must be greater than 0");
        }

        Ok(())
    }

    /// Get page fetch timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.crawler.request_timeout_secs)
    }

    /// Get link probe timeout as Duration
    #[must_use]
    pub fn link_check_timeout(&self) -> Duration {
        Duration::from_secs(self.crawler.link_check_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig {
                workers: 5,
                queue_size: 100,
                request_timeout_secs: 30,
                link_check_timeout_secs: 10,
                user_agent: format!("sitecheck/{}", env!("CARGO_PKG_VERSION")),
            },
            database: DatabaseConfig {
                sqlite_path: PathBuf::from("data/sitecheck.db"),
            },
            logging: LoggingConfig {
                level: String::from("info"),
                format: String::from("text"),
            },
        }
    }
}
