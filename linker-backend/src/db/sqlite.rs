use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::Row;
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::config::defaults;

pub type DbConn = PooledConnection<SqliteConnectionManager>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    Pool(r2d2::Error),
    Json(serde_json::Error),
}

pub type DbResult<T> = Result<T, DbError>;

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::Sqlite(e) => write!(f, "SQLite error: {}", e),
            DbError::Pool(e) => write!(f, "Connection pool error: {}", e),
            DbError::Json(e) => write!(f, "JSON column error: {}", e),
        }
    }
}

impl std::error::Error for DbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DbError::Sqlite(e) => Some(e),
            DbError::Pool(e) => Some(e),
            DbError::Json(e) => Some(e),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        DbError::Sqlite(e)
    }
}

impl From<r2d2::Error> for DbError {
    fn from(e: r2d2::Error) -> Self {
        DbError::Pool(e)
    }
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::Json(e)
    }
}

pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    pub fn new(database_url: &str) -> DbResult<Self> {
        Self::with_pool_size(database_url, defaults::DB_POOL_SIZE)
    }

    /// `:memory:` always gets a single long-lived connection, since every
    /// in-memory connection is its own database.
    pub fn with_pool_size(database_url: &str, pool_size: u32) -> DbResult<Self> {
        let in_memory = database_url == ":memory:";

        let manager = if in_memory {
            SqliteConnectionManager::memory()
        } else {
            // Create parent directory if it doesn't exist
            if let Some(parent) = Path::new(database_url).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).ok();
                }
            }
            SqliteConnectionManager::file(database_url)
        }
        .with_init(|conn| conn.busy_timeout(Duration::from_millis(5000)));

        let builder = Pool::builder();
        let pool = if in_memory {
            builder
                .max_size(1)
                .max_lifetime(None)
                .idle_timeout(None)
                .build(manager)?
        } else {
            builder.max_size(pool_size.max(1)).build(manager)?
        };

        let db = Self { pool };
        db.init(!in_memory)?;
        Ok(db)
    }

    pub fn conn(&self) -> DbResult<DbConn> {
        Ok(self.pool.get()?)
    }

    fn init(&self, wal: bool) -> DbResult<()> {
        let conn = self.conn()?;

        if wal {
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            log::debug!("SQLite journal mode: {}", mode);
        }

        // Pairing records: one per client token, never hard-deleted.
        // AUTOINCREMENT everywhere so ids are never reused after deletes.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS pairing_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                client_token TEXT UNIQUE NOT NULL,
                code TEXT,
                code_expires TEXT,
                linked INTEGER NOT NULL DEFAULT 0,
                wallet_token TEXT,
                current_rpc TEXT,
                current_accounts TEXT,
                pending_call TEXT,
                app_info TEXT,
                return_url TEXT,
                linked_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        // Source of truth for code uniqueness
        conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_pairing_records_code
             ON pairing_records(code) WHERE code IS NOT NULL",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_pairing_records_wallet
             ON pairing_records(wallet_token)",
            [],
        )?;

        // Browser tab sessions (permissive: duplicates per record are fine)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS linked_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_token TEXT UNIQUE NOT NULL,
                pairing_record_id INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_linked_sessions_record
             ON linked_sessions(pairing_record_id)",
            [],
        )?;

        // Browser-side mailbox
        conn.execute(
            "CREATE TABLE IF NOT EXISTS client_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_client_messages_session
             ON client_messages(session_id, id)",
            [],
        )?;

        // Wallet-side mailbox
        conn.execute(
            "CREATE TABLE IF NOT EXISTS wallet_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                wallet_token TEXT NOT NULL,
                current_accounts TEXT NOT NULL,
                kind TEXT NOT NULL,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_wallet_messages_wallet
             ON wallet_messages(wallet_token, id)",
            [],
        )?;

        // Push endpoints for waking wallet devices
        conn.execute(
            "CREATE TABLE IF NOT EXISTS notification_endpoints (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                eth_address TEXT NOT NULL,
                device_token TEXT NOT NULL,
                endpoint TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(eth_address, device_token)
            )",
            [],
        )?;

        Ok(())
    }
}

// ============================================
// Column helpers shared by the table modules
// ============================================

fn conversion_error<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

pub(crate) fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

pub(crate) fn opt_timestamp_column(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

pub(crate) fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn opt_json_column<T: DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| serde_json::from_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

/// True when `e` is a UNIQUE constraint violation
pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
