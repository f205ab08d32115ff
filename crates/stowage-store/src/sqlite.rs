//! Durable backend using SQLite.
//!
//! Every pair lives in a single `items` table. Enumeration order is rowid
//! order, so a key keeps its position when its value is replaced.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, info};

use crate::backend::{StorageBackend, pair_size};
use crate::error::{BackendError, BackendResult};

/// Current schema version for migrations.
const SCHEMA_VERSION: i32 = 1;

/// Durable backend backed by a SQLite file.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    quota: Option<usize>,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("quota", &self.quota)
            .finish_non_exhaustive()
    }
}

impl SqliteBackend {
    /// Open or create a backend at the given path.
    ///
    /// Creates parent directories and the schema if they don't exist.
    pub fn open(path: impl AsRef<Path>, quota: Option<usize>) -> BackendResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;

        let backend = Self {
            conn: Mutex::new(conn),
            quota,
        };
        backend.initialize()?;

        debug!(path = %path.display(), ?quota, "Durable backend opened");
        Ok(backend)
    }

    /// Create a backend over an in-memory database (useful for testing).
    pub fn open_in_memory(quota: Option<usize>) -> BackendResult<Self> {
        let backend = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            quota,
        };
        backend.initialize()?;

        debug!("In-memory durable backend created");
        Ok(backend)
    }

    /// Configured quota, if any.
    pub fn quota(&self) -> Option<usize> {
        self.quota
    }

    fn initialize(&self) -> BackendResult<()> {
        let conn = self.conn.lock();

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let current_version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);
        if current_version >= SCHEMA_VERSION {
            debug!(version = current_version, "Schema up to date");
            return Ok(());
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            );
            "#,
        )?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrated durable backend schema"
        );
        Ok(())
    }
}

/// Bytes used by every pair, optionally excluding one key.
fn used_bytes(conn: &Connection, excluding: &str) -> rusqlite::Result<usize> {
    let used: i64 = conn.query_row(
        "SELECT COALESCE(SUM(length(CAST(key AS BLOB)) + length(CAST(value AS BLOB))), 0)
         FROM items WHERE key != ?1",
        params![excluding],
        |row| row.get(0),
    )?;
    Ok(usize::try_from(used).unwrap_or(usize::MAX))
}

impl StorageBackend for SqliteBackend {
    fn set_item(&self, key: &str, value: &str) -> BackendResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        if let Some(quota) = self.quota {
            let needed = used_bytes(&tx, key)?.saturating_add(pair_size(key, value));
            if needed > quota {
                // Dropping the transaction rolls it back.
                return Err(BackendError::QuotaExceeded { needed, quota });
            }
        }

        tx.execute(
            "INSERT INTO items (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get_item(&self, key: &str) -> BackendResult<Option<String>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM items WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn remove_item(&self, key: &str) -> BackendResult<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM items WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn len(&self) -> BackendResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn key(&self, index: usize) -> BackendResult<Option<String>> {
        let Ok(offset) = i64::try_from(index) else {
            return Ok(None);
        };
        let conn = self.conn.lock();
        let key = conn
            .query_row(
                "SELECT key FROM items ORDER BY rowid LIMIT 1 OFFSET ?1",
                params![offset],
                |row| row.get(0),
            )
            .optional()?;
        Ok(key)
    }

    fn keys(&self) -> BackendResult<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT key FROM items ORDER BY rowid")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keys)
    }
}
