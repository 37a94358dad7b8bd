use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use duckdb::Connection;
use spanwatch_core::error::{Result, SpanwatchError};

use crate::schema::SCHEMA_SQL;

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    db_path: String,
}

const MEMORY_PATH: &str = ":memory:";

impl Store {
    /// Opens (or creates) the database file and applies the schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SpanwatchError::Io(format!("create db dir {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| SpanwatchError::Store(format!("open duckdb {}: {e}", path.display())))?;
        Self::init(conn, path.display().to_string())
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SpanwatchError::Store(format!("open in-memory duckdb: {e}")))?;
        Self::init(conn, MEMORY_PATH.to_string())
    }

    fn init(conn: Connection, db_path: String) -> Result<Self> {
        if db_path != MEMORY_PATH {
            conn.execute_batch("PRAGMA threads=4;")
                .map_err(|e| SpanwatchError::Store(format!("set pragmas: {e}")))?;
        }
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| SpanwatchError::Store(format!("apply schema: {e}")))?;
        tracing::debug!(db = %db_path, "store opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
        })
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Every write runs in its own transaction, so a poisoned lock still
    /// guards a consistent connection.
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_store_initializes() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.db_path(), ":memory:");
        let conn = store.conn();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables
                 WHERE table_name IN ('traces', 'spans', 'service_dependencies')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }

    #[test]
    fn file_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/spanwatch.duckdb");
        let store = Store::open(&path).unwrap();
        assert!(path.exists());
        assert!(store.db_path().ends_with("spanwatch.duckdb"));
    }
}
