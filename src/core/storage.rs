//! SQLite-backed key/value storage for session state
//!
//! Every logical record (counts, load metadata, report header, ...) is a JSON
//! document stored under a versioned key in a single `kv` table. Writes are
//! single upserts, so a reader never observes a half-written record.
//!
//! Corrupt or unparseable documents read back as their `Default` rather than
//! failing: losing a damaged record is recoverable, refusing to start is not.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Database file name inside the data directory
pub const DB_FILE: &str = "tally.db";

/// Count observations, keyed by item key
pub const COUNTS_KEY: &str = "counts_v1";
/// Metadata of the last successful catalog load
pub const META_KEY: &str = "meta_v1";
/// User-entered report header fields
pub const HEADER_KEY: &str = "header_v1";
/// Raw text of the last loaded source, used to rebuild the catalog
pub const CATALOG_KEY: &str = "catalog_v1";
/// Currently selected item key
pub const SELECTION_KEY: &str = "selection_v1";
/// Short `@N` aliases from the last listing
pub const SHORT_IDS_KEY: &str = "shortids_v1";

/// Errors from the storage layer
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to serialize '{key}': {source}")]
    Serialize {
        key: String,
        source: serde_json::Error,
    },

    #[error("Failed to prepare data directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata recorded for each successful catalog load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadMeta {
    pub source_name: String,
    pub signature: String,
    pub loaded_at: DateTime<Utc>,
    pub total: usize,
}

/// Free-text fields printed at the top of reports
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportHeader {
    /// Store/branch being counted
    pub unit: String,
    /// Person accountable for the count
    pub responsible: String,
}

/// Durable key/value store
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open (or create) the database inside `data_dir`
    pub fn open(data_dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(data_dir)?;
        let conn = Connection::open(data_dir.join(DB_FILE))?;
        Self::init(conn)
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )?;
        Ok(Self { conn })
    }

    /// Raw document text for a key
    pub fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Store raw document text under a key
    pub fn put_raw(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Decode a record, falling back to `T::default()` if absent or corrupt
    pub fn read_or_default<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        self.read(key).unwrap_or_default()
    }

    /// Decode a record; `None` if absent, unreadable or corrupt
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.get_raw(key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "failed to read record; using default");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "corrupt record; using default");
                None
            }
        }
    }

    /// Encode and store a record
    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        self.put_raw(key, &encode(key, value)?)
    }

    /// Store several pre-encoded records in one transaction
    pub fn write_batch(&self, records: &[(&str, String)]) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();
        for (key, value) in records {
            tx.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// JSON-encode a record for [`Storage::write_batch`]
pub fn encode<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|source| StorageError::Serialize {
        key: key.to_string(),
        source,
    })
}
