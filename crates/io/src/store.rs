// SQLite-backed key-value store for audit history and weight points

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use shipaudit_audit::storage::{Storage, StorageError};

use crate::IoError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS kv (
    key   TEXT PRIMARY KEY,
    value BLOB NOT NULL
);
";

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open (or create) the store, creating parent directories as needed.
    pub fn open(path: &Path) -> Result<Self, IoError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| IoError::Store(format!("{}: {e}", parent.display())))?;
            }
        }
        let conn = Connection::open(path).map_err(|e| IoError::Store(e.to_string()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, IoError> {
        let conn = Connection::open_in_memory().map_err(|e| IoError::Store(e.to_string()))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, IoError> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| IoError::Store(e.to_string()))?;
        Ok(Self { conn })
    }
}

impl Storage for SqliteStorage {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .optional();
        match value {
            Ok(v) => v,
            Err(e) => {
                log::warn!("store read of {key} failed: {e}");
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.conn
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map(|_| ())
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map(|_| ())
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipaudit_audit::history::{AuditHistory, AuditRecord};
    use shipaudit_audit::model::AnalysisResult;
    use tempfile::tempdir;

    #[test]
    fn set_get_overwrite_remove() {
        let mut store = SqliteStorage::open_in_memory().unwrap();
        assert!(store.get("k").is_none());
        store.set("k", b"one").unwrap();
        store.set("k", b"two").unwrap();
        assert_eq!(store.get("k").unwrap(), b"two");
        store.remove("k").unwrap();
        assert!(store.get("k").is_none());
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dir/shipaudit.db");
        {
            let mut store = SqliteStorage::open(&path).unwrap();
            store.set("shipaudit.audit_history", b"[]").unwrap();
        }
        let store = SqliteStorage::open(&path).unwrap();
        assert_eq!(store.get("shipaudit.audit_history").unwrap(), b"[]");
    }

    #[test]
    fn backs_audit_history() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shipaudit.db");
        let result = AnalysisResult {
            discrepancies: vec![],
            total_overcharge: 0.0,
            total_rows: 4,
            total_billed: 200.0,
        };
        {
            let mut history = AuditHistory::new(SqliteStorage::open(&path).unwrap());
            let at = "2024-03-01T10:00:00Z".parse().unwrap();
            history.record(AuditRecord::from_result(&result, "Xpress", "mar.csv", at));
        }
        let history = AuditHistory::new(SqliteStorage::open(&path).unwrap());
        let records = history.load();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_rows, 4);
    }

    #[test]
    fn unopenable_path_is_an_error() {
        let dir = tempdir().unwrap();
        // a directory cannot be opened as a database file
        assert!(matches!(
            SqliteStorage::open(dir.path()).err(),
            Some(IoError::Store(_))
        ));
    }
}
