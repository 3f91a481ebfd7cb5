//! Durable key/value storage.
//!
//! The tracker stores only ever see the [`DurableStore`] trait: JSON values
//! under string keys, with failures logged and reported as `None`/`false`
//! instead of errors. [`KvStore`] is the SQLite implementation.

use std::path::Path;
use std::rc::Rc;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::storage::schema::{CURRENT_VERSION, SCHEMA, SCHEMA_VERSION_TABLE};

/// Keyed persistence with JSON marshaling.
///
/// Implementors provide the raw string operations; the typed accessors are
/// layered on top and never panic or return errors to the caller.
pub trait DurableStore {
    /// Raw JSON text stored under `key`.
    fn get_raw(&self, key: &str) -> Option<String>;

    /// Store raw JSON text under `key`. Returns false on failure.
    fn set_raw(&self, key: &str, json: &str) -> bool;

    /// Delete `key`. Returns false on failure.
    fn remove(&self, key: &str) -> bool;

    /// Decode the value under `key`, or `None` if absent or undecodable.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let json = self.get_raw(key)?;
        match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Failed to decode stored value for {}: {}", key, e);
                None
            }
        }
    }

    /// Encode and store `value` under `key`. Returns false on failure.
    fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(json) => self.set_raw(key, &json),
            Err(e) => {
                tracing::warn!("Failed to encode value for {}: {}", key, e);
                false
            }
        }
    }
}

impl<T: DurableStore + ?Sized> DurableStore for &T {
    fn get_raw(&self, key: &str) -> Option<String> {
        (**self).get_raw(key)
    }

    fn set_raw(&self, key: &str, json: &str) -> bool {
        (**self).set_raw(key, json)
    }

    fn remove(&self, key: &str) -> bool {
        (**self).remove(key)
    }
}

impl<T: DurableStore + ?Sized> DurableStore for Rc<T> {
    fn get_raw(&self, key: &str) -> Option<String> {
        (**self).get_raw(key)
    }

    fn set_raw(&self, key: &str, json: &str) -> bool {
        (**self).set_raw(key, json)
    }

    fn remove(&self, key: &str) -> bool {
        (**self).remove(key)
    }
}

/// SQLite-backed key/value store.
pub struct KvStore {
    conn: Connection,
}

impl KvStore {
    /// Open or create a store at the given path.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::IoError(e.to_string()))?;
        }

        let conn =
            Connection::open(path).map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        let store = Self { conn };
        store.initialize()?;

        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        let store = Self { conn };
        store.initialize()?;

        Ok(store)
    }

    /// Initialize the database schema.
    fn initialize(&self) -> Result<(), StorageError> {
        self.conn
            .execute_batch(SCHEMA_VERSION_TABLE)
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

        let current_version = self.get_schema_version()?;

        if current_version < CURRENT_VERSION {
            self.migrate(current_version)?;
        }

        Ok(())
    }

    /// Get the current schema version.
    fn get_schema_version(&self) -> Result<i32, StorageError> {
        let result: SqliteResult<i32> = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        );

        match result {
            Ok(version) => Ok(version),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(e) => Err(StorageError::QueryFailed(e.to_string())),
        }
    }

    /// Run database migrations.
    fn migrate(&self, from_version: i32) -> Result<(), StorageError> {
        if from_version < 1 {
            self.conn
                .execute_batch(SCHEMA)
                .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

            self.conn
                .execute(
                    "INSERT INTO schema_version (version, applied_at) VALUES (?, datetime('now'))",
                    [CURRENT_VERSION],
                )
                .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

            tracing::info!("Key/value store migrated to version {}", CURRENT_VERSION);
        }

        Ok(())
    }

    /// List stored keys.
    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM kv_entries ORDER BY key")
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        rows.collect::<SqliteResult<Vec<_>>>()
            .map_err(|e| StorageError::QueryFailed(e.to_string()))
    }
}

impl DurableStore for KvStore {
    fn get_raw(&self, key: &str) -> Option<String> {
        let result = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional();

        match result {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", key, e);
                None
            }
        }
    }

    fn set_raw(&self, key: &str, json: &str) -> bool {
        let result = self.conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE
             SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, json, Utc::now().to_rfc3339()],
        );

        match result {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Failed to write {}: {}", key, e);
                false
            }
        }
    }

    fn remove(&self, key: &str) -> bool {
        match self
            .conn
            .execute("DELETE FROM kv_entries WHERE key = ?1", params![key])
        {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Failed to remove {}: {}", key, e);
                false
            }
        }
    }
}

/// Backing store errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),
}
