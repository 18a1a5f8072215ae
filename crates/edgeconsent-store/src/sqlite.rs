//! SQLite-backed preference store.
//!
//! Several named datastores can share one database file; each `SqliteStore`
//! handle is scoped to a single datastore name.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::schema::SCHEMA_SQL;
use crate::PreferenceStore;
use edgeconsent_core::{Error, Result};

/// Persistent store for one named datastore.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    datastore: String,
}

impl SqliteStore {
    /// Open or create the database at `db_path`, scoped to `datastore`.
    pub fn open(db_path: impl AsRef<Path>, datastore: impl Into<String>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Storage(e.to_string()))?;
        }

        let conn = Self::create_connection(db_path)?;
        Self::init_schema(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: db_path.to_path_buf(),
            datastore: datastore.into(),
        };

        info!(
            "SqliteStore initialized: datastore={}, keys={}, path={}",
            store.datastore,
            store.count_keys()?,
            store.db_path.display()
        );

        Ok(store)
    }

    /// Open an in-memory database (nothing survives the handle).
    pub fn open_in_memory(datastore: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::Database(e.to_string()))?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
            datastore: datastore.into(),
        })
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Number of keys held by this datastore.
    pub fn count_keys(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT COUNT(*) FROM preferences WHERE datastore = ?1")
            .map_err(|e| Error::Database(e.to_string()))?;
        let count = stmt
            .query_row(params![self.datastore], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count)
    }
}

impl PreferenceStore for SqliteStore {
    fn name(&self) -> &str {
        &self.datastore
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT value FROM preferences WHERE datastore = ?1 AND key = ?2")
            .map_err(|e| Error::Database(e.to_string()))?;
        let value = stmt
            .query_row(params![self.datastore, key], |row| row.get(0))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO preferences (datastore, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(datastore, key) DO UPDATE
             SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .map_err(|e| Error::Database(e.to_string()))?
        .execute(params![self.datastore, key, value, now])
        .map_err(|e| Error::Database(e.to_string()))?;
        debug!("Stored {} bytes under {}/{}", value.len(), self.datastore, key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let affected = conn
            .execute(
                "DELETE FROM preferences WHERE datastore = ?1 AND key = ?2",
                params![self.datastore, key],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(affected > 0)
    }
}
