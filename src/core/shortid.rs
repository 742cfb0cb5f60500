//! Short `@N` aliases for items
//!
//! Item keys such as `D:arroz tipo 1 5kg` are awkward to type, so every
//! listing numbers its rows and remembers the mapping. A later command can
//! then say `tally count @3 12`.
//!
//! The index is persisted in storage and rebuilt whenever items are listed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::catalog::Catalog;
use crate::core::identity::ItemKey;

/// Mapping of `@N` aliases to item keys
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ShortIdIndex {
    /// Maps N to the item key listed at that position
    entries: HashMap<u32, ItemKey>,
    /// Maps item key to its alias number (reverse lookup)
    #[serde(skip)]
    reverse: HashMap<ItemKey, u32>,
    /// Next alias number to hand out
    next_id: u32,
}

impl ShortIdIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            reverse: HashMap::new(),
            next_id: 1,
        }
    }

    /// Restore the reverse lookup after deserializing
    pub fn reindex(mut self) -> Self {
        self.reverse = self.entries.iter().map(|(n, k)| (k.clone(), *n)).collect();
        if self.next_id == 0 {
            self.next_id = self.entries.keys().max().map_or(1, |n| n + 1);
        }
        self
    }

    /// Clear and renumber from the given keys, in order
    pub fn rebuild<'a>(&mut self, keys: impl IntoIterator<Item = &'a ItemKey>) {
        self.entries.clear();
        self.reverse.clear();
        self.next_id = 1;
        for key in keys {
            self.add(key.clone());
        }
    }

    /// Add a key and return its alias number (existing keys keep theirs)
    pub fn add(&mut self, key: ItemKey) -> u32 {
        if let Some(&existing) = self.reverse.get(&key) {
            return existing;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, key.clone());
        self.reverse.insert(key, id);
        id
    }

    /// Resolve `@N` or a bare number to an item key
    pub fn resolve(&self, reference: &str) -> Option<&ItemKey> {
        let reference = reference.trim();
        let num_str = reference.strip_prefix('@').unwrap_or(reference);
        if num_str.is_empty() || !num_str.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        num_str.parse::<u32>().ok().and_then(|n| self.entries.get(&n))
    }

    /// The alias number for a key, if it was listed
    pub fn get_short_id(&self, key: &ItemKey) -> Option<u32> {
        self.reverse.get(key).copied()
    }

    /// Format an alias for display ("@3"), or blank if the key has none
    pub fn format(&self, key: &ItemKey) -> String {
        self.get_short_id(key)
            .map(|n| format!("@{}", n))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve a user-supplied item reference against a catalog
///
/// Tries, in order: an `@N` alias (a bare number is an alias only when it
/// is not also a product or access code), an exact item key, then a
/// product or access code.
pub fn resolve_reference(reference: &str, catalog: &Catalog, index: &ShortIdIndex) -> Option<ItemKey> {
    let reference = reference.trim();
    if reference.starts_with('@') {
        return index.resolve(reference).cloned();
    }
    if let Some(item) = catalog.get(reference) {
        return Some(item.key.clone());
    }
    if let Some(item) = catalog.find_by_code(reference) {
        return Some(item.key.clone());
    }
    index.resolve(reference).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::Item;

    fn keys(raw: &[&str]) -> Vec<ItemKey> {
        raw.iter().map(|k| ItemKey::from(*k)).collect()
    }

    #[test]
    fn test_add_and_resolve() {
        let mut index = ShortIdIndex::new();
        assert_eq!(index.add(ItemKey::from("P:100")), 1);
        assert_eq!(index.add(ItemKey::from("A:555")), 2);

        assert_eq!(index.resolve("@1").map(|k| k.as_str()), Some("P:100"));
        assert_eq!(index.resolve("2").map(|k| k.as_str()), Some("A:555"));
        assert_eq!(index.resolve("@99"), None);
        assert_eq!(index.resolve("@"), None);
        assert_eq!(index.resolve("P:100"), None);
    }

    #[test]
    fn test_no_duplicates() {
        let mut index = ShortIdIndex::new();
        let first = index.add(ItemKey::from("P:1"));
        let again = index.add(ItemKey::from("P:1"));
        assert_eq!(first, again);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_rebuild_renumbers() {
        let mut index = ShortIdIndex::new();
        index.add(ItemKey::from("P:old"));

        let fresh = keys(&["P:1", "P:2", "P:3"]);
        index.rebuild(&fresh);
        assert_eq!(index.len(), 3);
        assert_eq!(index.resolve("@3").map(|k| k.as_str()), Some("P:3"));
        assert_eq!(index.get_short_id(&ItemKey::from("P:old")), None);
        assert_eq!(index.format(&ItemKey::from("P:2")), "@2");
    }

    #[test]
    fn test_serde_roundtrip_restores_reverse_lookup() {
        let mut index = ShortIdIndex::new();
        index.rebuild(&keys(&["P:1", "P:2"]));

        let json = serde_json::to_string(&index).unwrap();
        let restored = serde_json::from_str::<ShortIdIndex>(&json).unwrap().reindex();
        assert_eq!(restored.get_short_id(&ItemKey::from("P:2")), Some(2));
        assert_eq!(restored.resolve("@1").map(|k| k.as_str()), Some("P:1"));
    }

    #[test]
    fn test_resolve_reference_order() {
        let catalog = Catalog::from_items(vec![
            Item::new(Some("100".into()), Some("7891".into()), "Arroz", 1, 1.0),
            Item::new(None, None, "Sal Grosso", 1, 1.0),
        ]);
        let mut index = ShortIdIndex::new();
        index.rebuild(catalog.iter().map(|i| &i.key));

        let resolve = |r: &str| resolve_reference(r, &catalog, &index).map(|k| k.to_string());
        assert_eq!(resolve("@2").as_deref(), Some("D:sal grosso"));
        assert_eq!(resolve("D:sal grosso").as_deref(), Some("D:sal grosso"));
        assert_eq!(resolve("100").as_deref(), Some("P:100"));
        assert_eq!(resolve("7891").as_deref(), Some("P:100"));
        assert_eq!(resolve("1").as_deref(), Some("P:100"));
        assert_eq!(resolve("2").as_deref(), Some("D:sal grosso"));
        assert_eq!(resolve("nope"), None);
    }
}
