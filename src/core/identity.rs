//! Item identity - stable keys derived from catalog rows
//!
//! Keys take the form `PREFIX:value` so that a product code can never collide
//! with an identical-looking access code or description:
//! - `P:` trimmed product code
//! - `A:` trimmed access code
//! - `D:` normalized description (first 60 characters)

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Maximum number of characters kept from a normalized description
pub const DESCRIPTION_KEY_LEN: usize = 60;

/// Which identifying field a key was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    ProductCode,
    AccessCode,
    Description,
}

impl KeySource {
    /// The key prefix for this source
    pub fn prefix(&self) -> &'static str {
        match self {
            KeySource::ProductCode => "P",
            KeySource::AccessCode => "A",
            KeySource::Description => "D",
        }
    }
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::ProductCode => write!(f, "product code"),
            KeySource::AccessCode => write!(f, "access code"),
            KeySource::Description => write!(f, "description"),
        }
    }
}

/// Stable identity of a catalog item
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(String);

impl ItemKey {
    /// Build a key from its source and (already normalized) value
    pub fn new(source: KeySource, value: &str) -> Self {
        Self(format!("{}:{}", source.prefix(), value))
    }

    /// Which field this key was derived from, if it carries a known prefix
    pub fn source(&self) -> Option<KeySource> {
        match self.0.split_once(':').map(|(p, _)| p) {
            Some("P") => Some(KeySource::ProductCode),
            Some("A") => Some(KeySource::AccessCode),
            Some("D") => Some(KeySource::Description),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::borrow::Borrow<str> for ItemKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Derive the identity key for an item from its identifying fields
///
/// Product code wins over access code, which wins over the description.
pub fn derive_key(product_code: Option<&str>, access_code: Option<&str>, name: &str) -> ItemKey {
    if let Some(code) = non_blank(product_code) {
        return ItemKey::new(KeySource::ProductCode, code);
    }
    if let Some(code) = non_blank(access_code) {
        return ItemKey::new(KeySource::AccessCode, code);
    }
    let normalized: String = normalize_text(name)
        .chars()
        .take(DESCRIPTION_KEY_LEN)
        .collect();
    ItemKey::new(KeySource::Description, &normalized)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Lowercase, strip diacritics and collapse whitespace
///
/// Used for description keys and for catalog search, so "Açúcar  Refinado"
/// and "acucar refinado" compare equal.
pub fn normalize_text(s: &str) -> String {
    let folded: String = s
        .trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}
