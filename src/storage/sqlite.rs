//! SQLite record store
//!
//! Persistent [`RecordStore`] used by the CLI. Uses a `Mutex` to ensure
//! thread-safety for the SQLite connection and WAL mode for better
//! concurrency. Heading counts and the broken link list are stored as JSON
//! text columns.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;
use crate::models::{BrokenLink, CrawlResult, HeadingCounts, UrlRecord, UrlStatus};
use crate::storage::RecordStore;

/// SQLite implementation of [`RecordStore`]
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

/// Raw row as stored, before the JSON columns are decoded
struct RawRecord {
    id: u64,
    address: String,
    title: String,
    html_version: String,
    heading_counts: String,
    internal_links: u32,
    external_links: u32,
    broken_list: String,
    has_login_form: bool,
    status: String,
    error: String,
    created_at: String,
    updated_at: String,
}

impl SqliteRecordStore {
    /// Open (or create) a store at the given path
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;

        tracing::info!(path = %path.display(), "SQLite record store initialized");
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS urls (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    address TEXT NOT NULL,
                    title TEXT NOT NULL DEFAULT '',
                    html_version TEXT NOT NULL DEFAULT '',
                    heading_counts TEXT NOT NULL DEFAULT '{}',
                    internal_links INTEGER NOT NULL DEFAULT 0,
                    external_links INTEGER NOT NULL DEFAULT 0,
                    broken_links INTEGER NOT NULL DEFAULT 0,
                    broken_list TEXT NOT NULL DEFAULT '[]',
                    has_login_form INTEGER NOT NULL DEFAULT 0,
                    status TEXT NOT NULL DEFAULT 'queued',
                    error TEXT NOT NULL DEFAULT '',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_urls_status ON urls(status);
            "#,
        )?;
        Ok(())
    }

    /// Create a new queued record for an address and return it
    pub fn create(&self, address: &str) -> Result<UrlRecord, StoreError> {
        let now = Utc::now();
        let id = {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO urls (address, status, created_at, updated_at)
                 VALUES (?1, 'queued', ?2, ?3)",
                params![address, now.to_rfc3339(), now.to_rfc3339()],
            )?;
            conn.last_insert_rowid() as u64
        };

        let mut record = UrlRecord::new(id, address);
        record.created_at = now;
        record.updated_at = now;
        Ok(record)
    }

    /// Delete a record; returns whether it existed
    pub fn delete(&self, id: u64) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute("DELETE FROM urls WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    /// Reset a record to queued for a rerun; returns whether it existed
    pub fn reset(&self, id: u64) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE urls SET status = 'queued', error = '', updated_at = ?2 WHERE id = ?1",
            params![id, Utc::now().to_rfc3339()],
        )?;
        Ok(affected > 0)
    }

    /// All records ordered by id
    pub fn list(&self) -> Result<Vec<UrlRecord>, StoreError> {
        let raw_rows = {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, address, title, html_version, heading_counts,
                        internal_links, external_links, broken_list,
                        has_login_form, status, error, created_at, updated_at
                 FROM urls ORDER BY id",
            )?;
            let rows = stmt.query_map([], Self::map_raw)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        raw_rows.into_iter().map(Self::decode).collect()
    }

    fn map_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
        Ok(RawRecord {
            id: row.get(0)?,
            address: row.get(1)?,
            title: row.get(2)?,
            html_version: row.get(3)?,
            heading_counts: row.get(4)?,
            internal_links: row.get(5)?,
            external_links: row.get(6)?,
            broken_list: row.get(7)?,
            has_login_form: row.get(8)?,
            status: row.get(9)?,
            error: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    fn decode(raw: RawRecord) -> Result<UrlRecord, StoreError> {
        let heading_counts: HeadingCounts = serde_json::from_str(&raw.heading_counts)?;
        let broken_links: Vec<BrokenLink> = serde_json::from_str(&raw.broken_list)?;
        // Infallible parse; unknown values map to Error
        let status: UrlStatus = raw.status.parse().unwrap_or(UrlStatus::Error);

        Ok(UrlRecord {
            id: raw.id,
            address: raw.address,
            title: raw.title,
            html_version: raw.html_version,
            heading_counts,
            internal_links: raw.internal_links,
            external_links: raw.external_links,
            broken_links,
            has_login_form: raw.has_login_form,
            status,
            error: if raw.error.is_empty() {
                None
            } else {
                Some(raw.error)
            },
            created_at: parse_timestamp(&raw.created_at),
            updated_at: parse_timestamp(&raw.updated_at),
        })
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn get_by_id(&self, id: u64) -> Result<Option<UrlRecord>, StoreError> {
        let raw = {
            let conn = self.conn.lock().unwrap();
            conn.query_row(
                "SELECT id, address, title, html_version, heading_counts,
                        internal_links, external_links, broken_list,
                        has_login_form, status, error, created_at, updated_at
                 FROM urls WHERE id = ?1",
                params![id],
                Self::map_raw,
            )
            .optional()?
        };

        raw.map(Self::decode).transpose()
    }

    async fn update_status(
        &self,
        id: u64,
        status: UrlStatus,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE urls SET status = ?2, error = ?3, updated_at = ?4 WHERE id = ?1",
            params![
                id,
                status.as_str(),
                error.unwrap_or(""),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    async fn update_result(&self, id: u64, result: &CrawlResult) -> Result<(), StoreError> {
        let heading_counts = serde_json::to_string(&result.heading_counts)?;
        let broken_list = serde_json::to_string(&result.broken_links)?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE urls SET
                title = ?2,
                html_version = ?3,
                heading_counts = ?4,
                internal_links = ?5,
                external_links = ?6,
                broken_links = ?7,
                broken_list = ?8,
                has_login_form = ?9,
                status = 'done',
                error = '',
                updated_at = ?10
             WHERE id = ?1",
            params![
                id,
                result.title,
                result.html_version,
                heading_counts,
                result.internal_links,
                result.external_links,
                result.broken_links.len() as u32,
                broken_list,
                result.has_login_form,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }
}
