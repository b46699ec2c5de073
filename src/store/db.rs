// SPDX-License-Identifier: MPL-2.0

use crate::config::APP_NAME;
use crate::store::StoreError;
use crate::store::schema::SCHEMA;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Handle to the session and context database
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Path(format!("failed to create data dir: {}", e)))?;
        }

        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open the database at the default location
    /// Path: ~/.local/share/pagectx/pagectx.db
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(&Self::default_path()?)
    }

    /// Private database that vanishes with the handle
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        // Execute the schema (all CREATE IF NOT EXISTS)
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// XDG data directory location for the database
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| StoreError::Path("could not find data directory".to_string()))?;

        Ok(data_dir.join(APP_NAME).join(format!("{APP_NAME}.db")))
    }

    /// Access connection for operations. Every statement runs under this
    /// lock, so a transaction taken here is serialized against all writers.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves SQLite consistent; keep going.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_parent_dirs_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pagectx.db");
        let db = Db::open(&path).unwrap();
        assert!(path.exists());

        let tables: i64 = db
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
                 AND name IN ('sessions', 'delegated_credentials', 'contexts')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pagectx.db");
        drop(Db::open(&path).unwrap());
        assert!(Db::open(&path).is_ok());
    }
}
