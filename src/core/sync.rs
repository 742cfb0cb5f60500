//! Multi-device count synchronization
//!
//! The merge policy lives in [`crate::core::counts`]; this module only moves
//! observations around. A [`SyncChannel`] is an injected capability so the
//! rest of the engine never depends on a concrete transport.
//!
//! Sessions are scoped by date and unit: everyone counting "Loja 3" today
//! shares `20261019_Loja_3`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::counts::{Observation, Stamp};
use crate::core::identity::ItemKey;

/// Longest session/user token kept by [`safe_key`]
pub const SAFE_KEY_MAX: usize = 80;

/// Errors raised by a sync transport
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Sync I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Sync document {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Restrict a token to `[A-Za-z0-9_.-]`, at most 80 characters
///
/// Empty input becomes `anon`.
pub fn safe_key(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .take(SAFE_KEY_MAX)
        .collect();
    if cleaned.is_empty() {
        "anon".to_string()
    } else {
        cleaned
    }
}

/// Session identifier for a date and unit (`YYYYMMDD` or `YYYYMMDD_unit`)
pub fn session_id(date: NaiveDate, unit: &str) -> String {
    let base = date.format("%Y%m%d").to_string();
    if unit.trim().is_empty() {
        base
    } else {
        format!("{}_{}", base, safe_key(unit))
    }
}

/// Outbound write emitted after every local save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundWrite {
    pub counted: i64,
    pub user: String,
    pub ts: Stamp,
}

impl OutboundWrite {
    /// Build the outbound form of a local observation
    pub fn from_observation(obs: &Observation) -> Self {
        Self {
            counted: obs.counted,
            user: safe_key(obs.user.as_deref().unwrap_or("")),
            ts: obs.ts,
        }
    }
}

/// Session metadata announced to other devices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionMeta {
    pub unit: String,
    pub responsible: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Transport for exchanging observations with other counters
pub trait SyncChannel {
    /// Push one local write
    fn publish(&mut self, key: &ItemKey, write: &OutboundWrite) -> Result<(), SyncError>;

    /// Record session metadata
    fn announce(&mut self, meta: &SessionMeta) -> Result<(), SyncError>;

    /// Current remote observations as a `{key: {counted, ts, user}}` object
    fn fetch(&self) -> Result<serde_json::Value, SyncError>;
}

/// The document shared by all devices of one session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionDocument {
    pub meta: SessionMeta,
    pub counts: BTreeMap<String, OutboundWrite>,
}

impl SessionDocument {
    /// Apply a write unless the document already holds a newer one
    pub fn apply(&mut self, key: &ItemKey, write: &OutboundWrite) -> bool {
        match self.counts.get(key.as_str()) {
            Some(existing) if existing.ts > write.ts => false,
            _ => {
                self.counts.insert(key.to_string(), write.clone());
                true
            }
        }
    }

    fn counts_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.counts).unwrap_or_else(|_| serde_json::json!({}))
    }
}

/// In-process channel, mostly for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryChannel {
    pub document: SessionDocument,
    /// Every write published, in order
    pub published: Vec<(ItemKey, OutboundWrite)>,
}

impl SyncChannel for MemoryChannel {
    fn publish(&mut self, key: &ItemKey, write: &OutboundWrite) -> Result<(), SyncError> {
        self.published.push((key.clone(), write.clone()));
        self.document.apply(key, write);
        Ok(())
    }

    fn announce(&mut self, meta: &SessionMeta) -> Result<(), SyncError> {
        self.document.meta = meta.clone();
        Ok(())
    }

    fn fetch(&self) -> Result<serde_json::Value, SyncError> {
        Ok(self.document.counts_json())
    }
}

/// Channel backed by one JSON document per session in a shared directory
///
/// Any folder every device can reach works (network share, synced drive).
#[derive(Debug, Clone)]
pub struct FileChannel {
    path: PathBuf,
}

impl FileChannel {
    /// Channel for `session` inside `dir`
    pub fn new(dir: &Path, session: &str) -> Self {
        Self {
            path: dir.join(format!("{}.json", safe_key(session))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the session document; a missing file is an empty session
    pub fn read_document(&self) -> Result<SessionDocument, SyncError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SessionDocument::default())
            }
            Err(source) => {
                return Err(SyncError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&content).map_err(|source| SyncError::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn write_document(&self, doc: &SessionDocument) -> Result<(), SyncError> {
        let io_err = |source| SyncError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(doc).map_err(|source| SyncError::Json {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl SyncChannel for FileChannel {
    fn publish(&mut self, key: &ItemKey, write: &OutboundWrite) -> Result<(), SyncError> {
        let mut doc = self.read_document()?;
        if doc.apply(key, write) {
            debug!(%key, path = %self.path.display(), "published count");
            self.write_document(&doc)?;
        }
        Ok(())
    }

    fn announce(&mut self, meta: &SessionMeta) -> Result<(), SyncError> {
        let mut doc = self.read_document()?;
        doc.meta = meta.clone();
        self.write_document(&doc)
    }

    fn fetch(&self) -> Result<serde_json::Value, SyncError> {
        Ok(self.read_document()?.counts_json())
    }
}
