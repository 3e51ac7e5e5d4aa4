//! IndexStore: SQLite note table plus an FTS5 mirror
//!
//! One database file holds `notes` (one row per note, embedding as a blob)
//! and `notes_fts`, a full-text projection of (path, title, tags, headings,
//! body). Every mutation touches both tables inside a single transaction,
//! so a reader never sees one updated without the other.

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;

/// Handle to the persisted index. Pass it by reference; there is no global store.
pub struct IndexStore {
    conn: Mutex<Connection>,
}

impl IndexStore {
    /// Open or create the index database at `db_path`, creating the parent
    /// directory and the schema if needed. Enables WAL so readers can
    /// coexist with the single writer.
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        // journal_mode returns the resulting mode as a row
        let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        log::debug!("[INDEX] Opened {} (journal_mode={})", db_path.display(), mode);

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;
        Ok(store)
    }

    /// Open a private in-memory index (tests, dry runs)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.create_schema()?;
        Ok(store)
    }

    /// Close the database, surfacing any error from the final flush
    pub fn close(self) -> Result<(), StoreError> {
        let conn = self.conn.into_inner().map_err(|_| StoreError::LockPoisoned)?;
        conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS notes (
                path      TEXT PRIMARY KEY,
                title     TEXT NOT NULL DEFAULT '',
                tags      TEXT NOT NULL DEFAULT '',
                headings  TEXT NOT NULL DEFAULT '',
                wikilinks TEXT NOT NULL DEFAULT '',
                body      TEXT NOT NULL DEFAULT '',
                mod_time  INTEGER NOT NULL DEFAULT 0,
                embedding BLOB
            );

            CREATE VIRTUAL TABLE IF NOT EXISTS notes_fts USING fts5(
                path,
                title,
                tags,
                headings,
                body,
                tokenize='porter unicode61'
            );",
        )?;
        Ok(())
    }
}
