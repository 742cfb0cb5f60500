//! Application state for one counting device
//!
//! A [`Workspace`] owns the catalog, the count store, the current selection
//! and the storage they persist to. All mutation goes through its methods,
//! and every mutation writes through to storage before returning.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::core::catalog::{Catalog, Item, LoadError};
use crate::core::columns::ColumnMap;
use crate::core::config::Config;
use crate::core::counts::{
    count_from_f64, Clock, CountStore, MergeOutcome, Observation, StoredEntry, SystemClock,
};
use crate::core::identity::ItemKey;
use crate::core::metrics::{metrics_for, Metric};
use crate::core::number::{parse_number, NumberError, NumberPolicy};
use crate::core::shortid::{resolve_reference, ShortIdIndex};
use crate::core::storage::{
    encode, LoadMeta, ReportHeader, Storage, StorageError, CATALOG_KEY, COUNTS_KEY, HEADER_KEY,
    META_KEY, SELECTION_KEY, SHORT_IDS_KEY,
};
use crate::core::sync::{session_id, OutboundWrite, SessionMeta, SyncChannel, SyncError};

/// Reasons a count is rejected before anything is mutated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error("No item selected; pass an item reference or select one first")]
    NoSelection,

    #[error("Unknown item: {0}")]
    UnknownItem(String),

    #[error("Enter a quantity")]
    Empty,

    #[error("Invalid quantity '{0}': expected a non-negative number")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("No sync directory configured (set sync_dir in config or TALLY_SYNC_DIR)")]
    NoChannel,
}

/// Per-device settings the workspace needs
#[derive(Debug, Clone, Default)]
pub struct WorkspaceOptions {
    /// Name recorded on local counts
    pub user: String,
    pub columns: ColumnMap,
    pub policy: NumberPolicy,
    /// Export loaded by [`Workspace::ensure_catalog`] on first use
    pub default_source: Option<PathBuf>,
}

impl From<&Config> for WorkspaceOptions {
    fn from(config: &Config) -> Self {
        Self {
            user: config.user_name(),
            columns: config.columns.clone(),
            policy: config.number_policy(),
            default_source: Some(config.default_source()),
        }
    }
}

/// Summary of a successful catalog load
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub items: usize,
    pub skipped: usize,
    pub signature: String,
    /// Counts exist that were recorded against a different source
    pub signature_changed: bool,
    /// The previous selection is not in the new catalog
    pub selection_cleared: bool,
}

/// A count accepted by [`Workspace::save_count`]
#[derive(Debug, Clone, PartialEq)]
pub struct SavedCount {
    pub key: ItemKey,
    pub observation: Observation,
    pub metric: Metric,
}

pub struct Workspace {
    storage: Storage,
    catalog: Catalog,
    counts: CountStore,
    selection: Option<ItemKey>,
    short_ids: ShortIdIndex,
    header: ReportHeader,
    options: WorkspaceOptions,
    channel: Option<Box<dyn SyncChannel>>,
}

impl Workspace {
    /// Restore a workspace from storage
    pub fn open(storage: Storage, options: WorkspaceOptions) -> Self {
        Self::open_with_clock(storage, options, Box::new(SystemClock))
    }

    /// Restore a workspace whose counts are stamped by `clock`
    pub fn open_with_clock(storage: Storage, options: WorkspaceOptions, clock: Box<dyn Clock>) -> Self {
        let entries: BTreeMap<ItemKey, StoredEntry> = storage.read_or_default(COUNTS_KEY);
        let counts = CountStore::from_entries(entries, clock);

        let catalog = match storage.read::<String>(CATALOG_KEY) {
            Some(text) => match Catalog::load(&text, &options.columns, options.policy) {
                Ok(loaded) => loaded.catalog,
                Err(e) => {
                    warn!(error = %e, "stored catalog no longer parses; starting empty");
                    Catalog::default()
                }
            },
            None => Catalog::default(),
        };

        let selection = storage
            .read::<Option<ItemKey>>(SELECTION_KEY)
            .flatten()
            .filter(|key| catalog.contains(key.as_str()));
        let short_ids = storage
            .read_or_default::<ShortIdIndex>(SHORT_IDS_KEY)
            .reindex();
        let header = storage.read_or_default(HEADER_KEY);

        Self {
            storage,
            catalog,
            counts,
            selection,
            short_ids,
            header,
            options,
            channel: None,
        }
    }

    /// Attach a sync channel; every later save is published to it
    pub fn with_channel(mut self, channel: Box<dyn SyncChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn has_channel(&self) -> bool {
        self.channel.is_some()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn counts(&self) -> &CountStore {
        &self.counts
    }

    pub fn short_ids(&self) -> &ShortIdIndex {
        &self.short_ids
    }

    pub fn user(&self) -> &str {
        &self.options.user
    }

    pub fn selection(&self) -> Option<&ItemKey> {
        self.selection.as_ref()
    }

    /// The selected item, if it is still in the catalog
    pub fn selected_item(&self) -> Option<&Item> {
        self.selection
            .as_ref()
            .and_then(|key| self.catalog.get(key.as_str()))
    }

    pub fn header(&self) -> &ReportHeader {
        &self.header
    }

    /// Metadata of the last successful load
    pub fn meta(&self) -> Option<LoadMeta> {
        self.storage.read(META_KEY)
    }

    /// Resolve an item reference (`@N`, key, product or access code)
    pub fn resolve(&self, reference: &str) -> Option<ItemKey> {
        resolve_reference(reference, &self.catalog, &self.short_ids)
    }

    /// Item and metric for a reference
    pub fn lookup(&self, reference: &str) -> Option<(&Item, Metric)> {
        let key = self.resolve(reference)?;
        let item = self.catalog.get(key.as_str())?;
        Some((item, metrics_for(item, &self.counts)))
    }

    /// Session identifier for `date` and the current unit
    pub fn session_id(&self, date: NaiveDate) -> String {
        session_id(date, &self.header.unit)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Replace the catalog with one parsed from `text`
    ///
    /// Parsing and persistence both happen before any in-memory state is
    /// replaced, so a failed load leaves everything as it was.
    pub fn load_source(&mut self, text: &str, source_name: &str) -> Result<LoadReport, WorkspaceError> {
        let loaded = Catalog::load(text, &self.options.columns, self.options.policy)?;

        let signature_changed = !self.counts.is_empty()
            && self
                .meta()
                .is_some_and(|previous| previous.signature != loaded.signature);
        if signature_changed {
            warn!(
                source = source_name,
                "source differs from the one existing counts were recorded against"
            );
        }

        let selection = self
            .selection
            .clone()
            .filter(|key| loaded.catalog.contains(key.as_str()));
        let selection_cleared = self.selection.is_some() && selection.is_none();

        let meta = LoadMeta {
            source_name: source_name.to_string(),
            signature: loaded.signature.clone(),
            loaded_at: Utc::now(),
            total: loaded.catalog.len(),
        };
        let short_ids = ShortIdIndex::new();
        self.storage.write_batch(&[
            (CATALOG_KEY, encode(CATALOG_KEY, text)?),
            (META_KEY, encode(META_KEY, &meta)?),
            (SELECTION_KEY, encode(SELECTION_KEY, &selection)?),
            (SHORT_IDS_KEY, encode(SHORT_IDS_KEY, &short_ids)?),
        ])?;

        info!(source = source_name, items = meta.total, "catalog loaded");
        let report = LoadReport {
            items: loaded.catalog.len(),
            skipped: loaded.skipped,
            signature: loaded.signature,
            signature_changed,
            selection_cleared,
        };
        self.catalog = loaded.catalog;
        self.selection = selection;
        self.short_ids = short_ids;
        Ok(report)
    }

    /// Read and load a stock export from disk
    ///
    /// The source is recorded under `name`, or the file name when `None`.
    pub fn load_file(&mut self, path: &Path, name: Option<&str>) -> Result<LoadReport, WorkspaceError> {
        let bytes = fs::read(path).map_err(LoadError::from)?;
        let name = match name {
            Some(name) => name.to_string(),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        };
        self.load_source(&String::from_utf8_lossy(&bytes), &name)
    }

    /// Load the default source if nothing has ever been loaded
    ///
    /// Returns `Ok(None)` when a catalog is already present or no default
    /// source is configured.
    pub fn ensure_catalog(&mut self) -> Result<Option<LoadReport>, WorkspaceError> {
        if !self.catalog.is_empty() || self.meta().is_some() {
            return Ok(None);
        }
        let Some(path) = self.options.default_source.clone() else {
            return Ok(None);
        };
        let report = self.load_file(&path, None)?;
        info!(path = %path.display(), items = report.items, "default source loaded");
        Ok(Some(report))
    }

    /// Make `reference` the current item
    pub fn select(&mut self, reference: &str) -> Result<ItemKey, WorkspaceError> {
        let key = self
            .resolve(reference)
            .ok_or_else(|| SaveError::UnknownItem(reference.trim().to_string()))?;
        self.storage.write(SELECTION_KEY, &Some(&key))?;
        self.selection = Some(key.clone());
        Ok(key)
    }

    /// Record a count for `reference`, or the selection when `None`
    ///
    /// The raw input is validated (empty vs invalid) before anything is
    /// mutated. Fractions are rounded to the nearest unit.
    pub fn save_count(&mut self, reference: Option<&str>, raw: &str) -> Result<SavedCount, WorkspaceError> {
        let key = self.target(reference)?;
        let counted = parse_count(raw)?;

        let user = self.options.user.clone();
        let observation = self.commit_counts(|counts| counts.set_count(&key, counted, Some(&user)))?;
        self.publish(&key, &observation);

        let metric = self
            .catalog
            .get(key.as_str())
            .map(|item| metrics_for(item, &self.counts))
            .unwrap_or_else(|| Metric::compute(0, 0.0, Some(counted)));
        info!(%key, counted, status = %metric.status, "count saved");
        Ok(SavedCount {
            key,
            observation,
            metric,
        })
    }

    /// Remove the count for `reference`, or the selection when `None`
    ///
    /// Returns the key and whether there was a count to remove.
    pub fn clear_count(&mut self, reference: Option<&str>) -> Result<(ItemKey, bool), WorkspaceError> {
        let key = self.target(reference)?;
        let removed = self.commit_counts(|counts| counts.clear(&key))?;
        info!(%key, removed, "count cleared");
        Ok((key, removed))
    }

    /// Remove every count and persist the empty store
    pub fn clear_all(&mut self) -> Result<usize, WorkspaceError> {
        let removed = self.counts.len();
        self.commit_counts(CountStore::clear_all)?;
        info!(removed, "all counts cleared");
        Ok(removed)
    }

    /// Merge a `{key: {counted, ts, user}}` payload from other counters
    pub fn merge_remote(&mut self, payload: &serde_json::Value) -> Result<MergeOutcome, WorkspaceError> {
        let before = self.counts.entries().clone();
        let outcome = self.counts.merge_remote_json(payload);
        if outcome.applied > 0 {
            if let Err(e) = self.persist_counts() {
                self.counts.restore(before);
                return Err(e.into());
            }
        }
        info!(
            applied = outcome.applied,
            changed = outcome.changed,
            stale = outcome.stale,
            malformed = outcome.malformed,
            "remote counts merged"
        );
        Ok(outcome)
    }

    /// Update the report header; `None` keeps the current value
    pub fn set_header(
        &mut self,
        unit: Option<String>,
        responsible: Option<String>,
    ) -> Result<&ReportHeader, WorkspaceError> {
        let mut header = self.header.clone();
        if let Some(unit) = unit {
            header.unit = unit.trim().to_string();
        }
        if let Some(responsible) = responsible {
            header.responsible = responsible.trim().to_string();
        }
        self.storage.write(HEADER_KEY, &header)?;
        self.header = header;
        Ok(&self.header)
    }

    /// Remember the order of a listing so `@N` refers to its rows
    pub fn remember_listing<'a>(&mut self, keys: impl IntoIterator<Item = &'a ItemKey>) -> Result<(), WorkspaceError> {
        let mut index = ShortIdIndex::new();
        index.rebuild(keys);
        self.storage.write(SHORT_IDS_KEY, &index)?;
        self.short_ids = index;
        Ok(())
    }

    // =========================================================================
    // Sync
    // =========================================================================

    /// Fetch remote counts from the channel and merge them
    pub fn pull(&mut self) -> Result<MergeOutcome, WorkspaceError> {
        let payload = self.channel.as_ref().ok_or(WorkspaceError::NoChannel)?.fetch()?;
        self.merge_remote(&payload)
    }

    /// Publish every local count and the session metadata
    ///
    /// Unlike the publish after a save, failures here are returned.
    pub fn push(&mut self) -> Result<usize, WorkspaceError> {
        let meta = SessionMeta {
            unit: self.header.unit.clone(),
            responsible: self.header.responsible.clone(),
            source_name: self.meta().map(|m| m.source_name),
            updated_at: Some(Utc::now()),
        };
        let writes: Vec<(ItemKey, OutboundWrite)> = self
            .counts
            .observations()
            .map(|(key, obs)| (key.clone(), OutboundWrite::from_observation(&obs)))
            .collect();

        let channel = self.channel.as_mut().ok_or(WorkspaceError::NoChannel)?;
        channel.announce(&meta)?;
        for (key, write) in &writes {
            channel.publish(key, write)?;
        }
        info!(published = writes.len(), "counts pushed");
        Ok(writes.len())
    }

    fn target(&self, reference: Option<&str>) -> Result<ItemKey, SaveError> {
        match reference {
            Some(reference) => self
                .resolve(reference)
                .ok_or_else(|| SaveError::UnknownItem(reference.trim().to_string())),
            None => {
                let key = self.selection.clone().ok_or(SaveError::NoSelection)?;
                if self.catalog.contains(key.as_str()) {
                    Ok(key)
                } else {
                    Err(SaveError::UnknownItem(key.to_string()))
                }
            }
        }
    }

    /// Apply `change` to the store and persist it, undoing it if the write fails
    fn commit_counts<T>(&mut self, change: impl FnOnce(&mut CountStore) -> T) -> Result<T, StorageError> {
        let before = self.counts.entries().clone();
        let result = change(&mut self.counts);
        if let Err(e) = self.persist_counts() {
            self.counts.restore(before);
            return Err(e);
        }
        Ok(result)
    }

    fn persist_counts(&self) -> Result<(), StorageError> {
        self.storage.write(COUNTS_KEY, self.counts.entries())
    }

    fn publish(&mut self, key: &ItemKey, observation: &Observation) {
        let Some(channel) = self.channel.as_mut() else {
            return;
        };
        let write = OutboundWrite::from_observation(observation);
        if let Err(e) = channel.publish(key, &write) {
            warn!(%key, error = %e, "failed to publish count; it is saved locally");
        }
    }
}

/// Validate hand-typed count input
fn parse_count(raw: &str) -> Result<i64, SaveError> {
    let value = match parse_number(raw, NumberPolicy::Strict) {
        Ok(value) => value,
        Err(NumberError::Empty) => return Err(SaveError::Empty),
        Err(NumberError::Invalid(text)) => return Err(SaveError::Invalid(text)),
    };
    if value < 0.0 {
        return Err(SaveError::Invalid(raw.trim().to_string()));
    }
    count_from_f64(value).ok_or_else(|| SaveError::Invalid(raw.trim().to_string()))
}
