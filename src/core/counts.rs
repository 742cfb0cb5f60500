//! Count store - physically counted quantities per item
//!
//! Each item key holds at most one entry. An entry is either an observation
//! (a counted quantity with attribution) or a tombstone left by clearing a
//! count. Both carry the logical timestamp last seen for the key, which is
//! what the last-writer-wins merge compares against.
//!
//! # Merge Semantics
//!
//! Local saves always win and stamp `max(now, last_seen + 1)`, so per-key
//! stamps never go backwards. Remote observations are applied unless their
//! stamp is strictly older than the last seen stamp for the key; equal stamps
//! re-apply, which makes merging the same payload twice a no-op.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::identity::ItemKey;
use crate::core::number::{parse_number, NumberPolicy};

/// Logical timestamp (milliseconds); totally ordered per key
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Stamp(pub i64);

impl Stamp {
    pub const ZERO: Stamp = Stamp(0);

    /// The next stamp after this one
    pub fn successor(self) -> Stamp {
        Stamp(self.0.saturating_add(1))
    }
}

impl std::fmt::Display for Stamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of fresh stamps for local writes
pub trait Clock: Send + Sync {
    fn now(&self) -> Stamp;
}

/// Wall-clock milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Stamp {
        Stamp(Utc::now().timestamp_millis())
    }
}

/// Settable clock for deterministic tests and replays
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self(AtomicI64::new(start))
    }

    pub fn set(&self, value: i64) {
        self.0.store(value, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Stamp {
        Stamp(self.0.load(Ordering::SeqCst))
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Stamp {
        (**self).now()
    }
}

/// Largest count magnitude accepted; beyond this `f64` loses integer precision
pub const MAX_COUNT: i64 = (1 << 53) - 1;

/// Round a decoded quantity to a count, `None` if not finite or out of range
pub fn count_from_f64(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let rounded = value.round();
    (rounded.abs() <= MAX_COUNT as f64).then_some(rounded as i64)
}

/// One recorded physical count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub counted: i64,
    pub user: Option<String>,
    pub ts: Stamp,
}

/// Stored form of an entry; `counted: null` marks a cleared count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    #[serde(default)]
    pub counted: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default)]
    pub ts: Stamp,
}

/// An observation arriving from another counter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObservation {
    pub counted: i64,
    pub ts: Stamp,
    pub user: Option<String>,
}

impl RemoteObservation {
    /// Decode a loosely typed `{counted, ts, user}` payload
    ///
    /// Returns `None` when `counted` is missing, not numeric or beyond
    /// [`MAX_COUNT`]. A missing `ts` reads as [`Stamp::ZERO`].
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let obj = value.as_object()?;
        let counted = match obj.get("counted")? {
            serde_json::Value::Number(n) => n.as_f64()?,
            serde_json::Value::String(s) => parse_number(s, NumberPolicy::Strict).ok()?,
            _ => return None,
        };
        let ts = obj.get("ts").and_then(|t| t.as_i64()).unwrap_or(0);
        let user = obj
            .get("user")
            .and_then(|u| u.as_str())
            .map(str::to_string);
        Some(Self {
            counted: count_from_f64(counted)?,
            ts: Stamp(ts),
            user,
        })
    }
}

/// Outcome of merging a remote observation set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Keys whose counted value actually changed
    pub changed: usize,
    /// Keys accepted (including re-applications of the same value)
    pub applied: usize,
    /// Keys discarded because their stamp was older than the last seen one
    pub stale: usize,
    /// Keys skipped because the payload was malformed
    pub malformed: usize,
}

impl MergeOutcome {
    /// Whether any local value changed
    pub fn changed(&self) -> bool {
        self.changed > 0
    }
}

/// Mapping from item key to its latest count entry
pub struct CountStore {
    entries: BTreeMap<ItemKey, StoredEntry>,
    clock: Box<dyn Clock>,
}

impl std::fmt::Debug for CountStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountStore")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl Default for CountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CountStore {
    /// Create an empty store stamped by the system clock
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    /// Create an empty store with a custom clock
    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            entries: BTreeMap::new(),
            clock,
        }
    }

    /// Rebuild a store from its persisted form
    pub fn from_entries(entries: BTreeMap<ItemKey, StoredEntry>, clock: Box<dyn Clock>) -> Self {
        Self { entries, clock }
    }

    /// The persisted form of the store
    pub fn entries(&self) -> &BTreeMap<ItemKey, StoredEntry> {
        &self.entries
    }

    /// Swap in a previously taken copy of [`entries`](Self::entries)
    pub fn restore(&mut self, entries: BTreeMap<ItemKey, StoredEntry>) {
        self.entries = entries;
    }

    /// The current observation for a key; `None` means "not yet counted"
    pub fn get(&self, key: &str) -> Option<Observation> {
        let entry = self.entries.get(key)?;
        Some(Observation {
            counted: entry.counted?,
            user: entry.user.clone(),
            ts: entry.ts,
        })
    }

    /// The counted quantity for a key, if any
    pub fn counted(&self, key: &str) -> Option<i64> {
        self.entries.get(key).and_then(|e| e.counted)
    }

    /// Last logical timestamp seen for a key (observation or tombstone)
    pub fn last_seen(&self, key: &str) -> Option<Stamp> {
        self.entries.get(key).map(|e| e.ts)
    }

    /// All current observations
    pub fn observations(&self) -> impl Iterator<Item = (&ItemKey, Observation)> + '_ {
        self.entries.iter().filter_map(|(k, e)| {
            e.counted.map(|counted| {
                (
                    k,
                    Observation {
                        counted,
                        user: e.user.clone(),
                        ts: e.ts,
                    },
                )
            })
        })
    }

    /// Number of keys holding an observation
    pub fn len(&self) -> usize {
        self.entries.values().filter(|e| e.counted.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fresh_stamp(&self, key: &str) -> Stamp {
        let now = self.clock.now();
        match self.last_seen(key) {
            Some(seen) if seen >= now => seen.successor(),
            _ => now,
        }
    }

    /// Record a local count, unconditionally replacing any previous value
    pub fn set_count(&mut self, key: &ItemKey, counted: i64, user: Option<&str>) -> Observation {
        let ts = self.fresh_stamp(key.as_str());
        let user = user.map(str::to_string);
        debug!(%key, counted, %ts, "count set");
        self.entries.insert(
            key.clone(),
            StoredEntry {
                counted: Some(counted),
                user: user.clone(),
                ts,
            },
        );
        Observation { counted, user, ts }
    }

    /// Remove the count for a key, leaving a tombstone at a fresh stamp
    ///
    /// Returns whether there was a count to remove.
    pub fn clear(&mut self, key: &ItemKey) -> bool {
        let had_count = self.counted(key.as_str()).is_some();
        let ts = self.fresh_stamp(key.as_str());
        debug!(%key, %ts, "count cleared");
        self.entries.insert(
            key.clone(),
            StoredEntry {
                counted: None,
                user: None,
                ts,
            },
        );
        had_count
    }

    /// Remove every entry, tombstones included
    pub fn clear_all(&mut self) {
        debug!(entries = self.entries.len(), "all counts cleared");
        self.entries.clear();
    }

    /// Merge observations from other counters (last writer wins per key)
    pub fn merge_remote<I>(&mut self, incoming: I) -> MergeOutcome
    where
        I: IntoIterator<Item = (ItemKey, RemoteObservation)>,
    {
        let mut outcome = MergeOutcome::default();
        for (key, remote) in incoming {
            if let Some(seen) = self.last_seen(key.as_str()) {
                if remote.ts < seen {
                    debug!(%key, remote_ts = %remote.ts, %seen, "discarding stale remote count");
                    outcome.stale += 1;
                    continue;
                }
            }

            let previous = self.counted(key.as_str());
            if previous != Some(remote.counted) {
                outcome.changed += 1;
            }
            outcome.applied += 1;
            self.entries.insert(
                key,
                StoredEntry {
                    counted: Some(remote.counted),
                    user: remote.user,
                    ts: remote.ts,
                },
            );
        }
        outcome
    }

    /// Merge a loosely typed `{key: {counted, ts, user}}` payload
    ///
    /// Malformed keys are skipped individually.
    pub fn merge_remote_json(&mut self, payload: &serde_json::Value) -> MergeOutcome {
        let Some(map) = payload.as_object() else {
            warn!("remote payload is not an object; ignoring");
            return MergeOutcome::default();
        };

        let mut malformed = 0;
        let decoded: Vec<_> = map
            .iter()
            .filter_map(|(key, value)| match RemoteObservation::from_json(value) {
                Some(remote) => Some((ItemKey::from(key.as_str()), remote)),
                None => {
                    warn!(key = key.as_str(), "skipping malformed remote count");
                    malformed += 1;
                    None
                }
            })
            .collect();

        let mut outcome = self.merge_remote(decoded);
        outcome.malformed = malformed;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn store_at(start: i64) -> (CountStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start));
        (CountStore::with_clock(Box::new(clock.clone())), clock)
    }

    fn key(s: &str) -> ItemKey {
        ItemKey::from(s)
    }

    fn remote(counted: i64, ts: i64, user: &str) -> RemoteObservation {
        RemoteObservation {
            counted,
            ts: Stamp(ts),
            user: Some(user.to_string()),
        }
    }

    #[test]
    fn test_absent_is_distinct_from_zero() {
        let (mut store, _) = store_at(1_000);
        assert_eq!(store.counted("P:1"), None);
        store.set_count(&key("P:1"), 0, Some("ana"));
        assert_eq!(store.counted("P:1"), Some(0));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_set_count_overwrites_and_stamps() {
        let (mut store, clock) = store_at(1_000);
        let first = store.set_count(&key("P:1"), 5, Some("ana"));
        assert_eq!(first.ts, Stamp(1_000));

        clock.set(2_000);
        let second = store.set_count(&key("P:1"), 7, Some("bia"));
        assert_eq!(second.ts, Stamp(2_000));

        let obs = store.get("P:1").unwrap();
        assert_eq!(obs.counted, 7);
        assert_eq!(obs.user.as_deref(), Some("bia"));
    }

    #[test]
    fn test_local_stamps_never_go_backwards() {
        let (mut store, clock) = store_at(5_000);
        store.merge_remote([(key("P:1"), remote(3, 9_000, "bia"))]);

        let local = store.set_count(&key("P:1"), 4, Some("ana"));
        assert_eq!(local.ts, Stamp(9_001));

        clock.set(100);
        let again = store.set_count(&key("P:1"), 6, Some("ana"));
        assert_eq!(again.ts, Stamp(9_002));
    }

    #[test]
    fn test_clear_leaves_not_counted() {
        let (mut store, _) = store_at(1_000);
        store.set_count(&key("P:1"), 5, None);
        assert!(store.clear(&key("P:1")));
        assert_eq!(store.get("P:1"), None);
        assert!(store.is_empty());
        assert!(!store.clear(&key("P:1")));
    }

    #[test]
    fn test_clear_blocks_older_remote_writes() {
        let (mut store, clock) = store_at(1_000);
        store.set_count(&key("P:1"), 5, None);
        clock.set(3_000);
        store.clear(&key("P:1"));

        let outcome = store.merge_remote([(key("P:1"), remote(5, 2_000, "bia"))]);
        assert!(!outcome.changed());
        assert_eq!(outcome.stale, 1);
        assert_eq!(store.counted("P:1"), None);
    }

    #[test]
    fn test_clear_all_empties_store() {
        let (mut store, _) = store_at(1_000);
        for i in 0..5 {
            store.set_count(&key(&format!("P:{}", i)), i, None);
        }
        store.clear(&key("P:0"));
        store.clear_all();
        assert!(store.is_empty());
        assert!(store.entries().is_empty());
    }

    #[test]
    fn test_merge_applies_newer_remote() {
        let (mut store, _) = store_at(1_000);
        store.set_count(&key("P:1"), 5, Some("ana"));

        let outcome = store.merge_remote([(key("P:1"), remote(8, 2_000, "bia"))]);
        assert!(outcome.changed());
        let obs = store.get("P:1").unwrap();
        assert_eq!(obs.counted, 8);
        assert_eq!(obs.user.as_deref(), Some("bia"));
        assert_eq!(obs.ts, Stamp(2_000));
    }

    #[test]
    fn test_merge_discards_stale_remote() {
        let (mut store, _) = store_at(5_000);
        store.set_count(&key("P:1"), 5, Some("ana"));

        let outcome = store.merge_remote([(key("P:1"), remote(8, 4_999, "bia"))]);
        assert!(!outcome.changed());
        assert_eq!(outcome.stale, 1);
        assert_eq!(store.counted("P:1"), Some(5));
        assert_eq!(store.last_seen("P:1"), Some(Stamp(5_000)));
    }

    #[test]
    fn test_merge_same_value_newer_stamp_advances_without_change() {
        let (mut store, _) = store_at(1_000);
        store.set_count(&key("P:1"), 5, Some("ana"));

        let outcome = store.merge_remote([(key("P:1"), remote(5, 3_000, "bia"))]);
        assert!(!outcome.changed());
        assert_eq!(outcome.applied, 1);
        assert_eq!(store.last_seen("P:1"), Some(Stamp(3_000)));

        let stale = store.merge_remote([(key("P:1"), remote(9, 2_000, "caio"))]);
        assert!(!stale.changed());
        assert_eq!(store.counted("P:1"), Some(5));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let (mut store, _) = store_at(1_000);
        let payload = json!({
            "P:1": {"counted": 4, "ts": 10, "user": "bia"},
            "P:2": {"counted": 0, "ts": 11, "user": "caio"}
        });

        assert!(store.merge_remote_json(&payload).changed());
        let second = store.merge_remote_json(&payload);
        assert!(!second.changed());
        assert_eq!(second.applied, 2);
        assert_eq!(store.counted("P:2"), Some(0));
    }

    #[test]
    fn test_merge_skips_malformed_keys_individually() {
        let (mut store, _) = store_at(1_000);
        let payload = json!({
            "P:1": {"ts": 10, "user": "bia"},
            "P:2": {"counted": "lots", "ts": 10},
            "P:3": {"counted": null, "ts": 10},
            "P:4": "garbage",
            "P:5": {"counted": "12", "ts": 10},
            "P:6": {"counted": 7.6}
        });

        let outcome = store.merge_remote_json(&payload);
        assert_eq!(outcome.malformed, 4);
        assert_eq!(outcome.changed, 2);
        assert_eq!(store.counted("P:1"), None);
        assert_eq!(store.counted("P:5"), Some(12));
        assert_eq!(store.counted("P:6"), Some(8));
        assert_eq!(store.last_seen("P:6"), Some(Stamp::ZERO));
    }

    #[test]
    fn test_merge_rejects_out_of_range_counts() {
        let (mut store, _) = store_at(1_000);
        let payload = json!({
            "P:1": {"counted": -1e300, "ts": 5},
            "P:2": {"counted": 1e19, "ts": 5},
            "P:3": {"counted": "99999999999999999999", "ts": 5},
            "P:4": {"counted": 9_007_199_254_740_991_i64, "ts": 5}
        });

        let outcome = store.merge_remote_json(&payload);
        assert_eq!(outcome.malformed, 3);
        assert_eq!(outcome.applied, 1);
        assert_eq!(store.counted("P:1"), None);
        assert_eq!(store.counted("P:4"), Some(MAX_COUNT));
    }

    #[test]
    fn test_count_from_f64_bounds() {
        assert_eq!(count_from_f64(7.5), Some(8));
        assert_eq!(count_from_f64(-2.4), Some(-2));
        assert_eq!(count_from_f64(f64::NAN), None);
        assert_eq!(count_from_f64(f64::INFINITY), None);
        assert_eq!(count_from_f64(1e16), None);
    }

    #[test]
    fn test_merge_non_object_payload_is_ignored() {
        let (mut store, _) = store_at(1_000);
        let outcome = store.merge_remote_json(&json!([1, 2, 3]));
        assert_eq!(outcome, MergeOutcome::default());
    }

    #[test]
    fn test_stored_entry_roundtrip_keeps_tombstones() {
        let (mut store, _) = store_at(1_000);
        store.set_count(&key("P:1"), 3, Some("ana"));
        store.set_count(&key("P:2"), 4, None);
        store.clear(&key("P:2"));

        let json = serde_json::to_string(store.entries()).unwrap();
        let entries: BTreeMap<ItemKey, StoredEntry> = serde_json::from_str(&json).unwrap();
        let restored = CountStore::from_entries(entries, Box::new(SystemClock));

        assert_eq!(restored.get("P:1"), store.get("P:1"));
        assert_eq!(restored.counted("P:2"), None);
        assert_eq!(restored.last_seen("P:2"), store.last_seen("P:2"));
    }
}
