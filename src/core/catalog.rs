//! Item catalog - the system-of-record stock snapshot
//!
//! A catalog is built in one go from the text of a semicolon-delimited export
//! and is never mutated afterwards; loading a new source replaces it.

use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::columns::{ColumnIndex, ColumnMap};
use crate::core::identity::{derive_key, normalize_text, ItemKey};
use crate::core::number::{parse_number, NumberError, NumberPolicy};

/// Number of UTF-16 code units covered by the content signature
pub const SIGNATURE_SPAN: usize = 200_000;

/// One catalog line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Derived identity, fixed at load time
    pub key: ItemKey,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,

    pub name: String,

    /// Expected quantity according to the system of record
    pub system_qty: i64,

    /// Opaque "days since last entry" text, shown as-is
    #[serde(default)]
    pub days_since_last_entry: String,

    /// Non-negative unit cost
    pub unit_cost: f64,
}

impl Item {
    /// Build an item, deriving its key from the identifying fields
    pub fn new(
        product_code: Option<String>,
        access_code: Option<String>,
        name: impl Into<String>,
        system_qty: i64,
        unit_cost: f64,
    ) -> Self {
        let name = name.into();
        let product_code = product_code.filter(|c| !c.trim().is_empty());
        let access_code = access_code.filter(|c| !c.trim().is_empty());
        let key = derive_key(product_code.as_deref(), access_code.as_deref(), &name);
        Self {
            key,
            product_code,
            access_code,
            name,
            system_qty,
            days_since_last_entry: String::new(),
            unit_cost: unit_cost.max(0.0),
        }
    }

    /// Display code: product code, else access code, else the key
    pub fn display_code(&self) -> &str {
        self.product_code
            .as_deref()
            .or(self.access_code.as_deref())
            .unwrap_or(self.key.as_str())
    }
}

/// Errors that abort a catalog load
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to parse stock export: {0}")]
    Parse(#[from] csv::Error),

    #[error("Stock export has no '{0}' column")]
    MissingColumn(String),

    #[error("Invalid {field} '{value}' on line {line}: {source}")]
    InvalidNumber {
        field: &'static str,
        value: String,
        line: u64,
        source: NumberError,
    },

    #[error("Failed to read stock export: {0}")]
    Io(#[from] std::io::Error),
}

/// The result of a successful load
#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub catalog: Catalog,
    /// Change-detection signature of the raw source text
    pub signature: String,
    /// Rows dropped because they were blank or summary lines
    pub skipped: usize,
}

/// The immutable set of items from one source
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<Item>,
}

impl Catalog {
    /// Build a catalog directly from items (in source order)
    pub fn from_items(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// Parse a semicolon-delimited stock export
    ///
    /// Rows with an empty name or a name starting with "TOTAL" are skipped.
    /// Any structural failure aborts the whole load so that callers never see
    /// a partially built catalog.
    pub fn load(
        text: &str,
        columns: &ColumnMap,
        policy: NumberPolicy,
    ) -> Result<LoadedCatalog, LoadError> {
        let signature = signature_for_text(text);
        let body = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut reader = ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .flexible(true)
            .from_reader(body.as_bytes());

        let headers = reader.headers()?.clone();
        let index = columns
            .resolve(&headers)
            .ok_or_else(|| LoadError::MissingColumn(columns.name.clone()))?;

        let mut items = Vec::new();
        let mut skipped = 0;
        for record in reader.records() {
            let record = record?;
            match parse_row(&record, &index, policy)? {
                Some(item) => items.push(item),
                None => skipped += 1,
            }
        }

        info!(items = items.len(), skipped, %signature, "catalog parsed");
        Ok(LoadedCatalog {
            catalog: Self { items },
            signature,
            skipped,
        })
    }

    /// Look up the first item with the given key
    pub fn get(&self, key: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.key.as_str() == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Find an item by its product code or access code
    pub fn find_by_code(&self, code: &str) -> Option<&Item> {
        let code = code.trim();
        self.items
            .iter()
            .find(|i| i.product_code.as_deref() == Some(code))
            .or_else(|| {
                self.items
                    .iter()
                    .find(|i| i.access_code.as_deref() == Some(code))
            })
    }

    /// Items whose codes or name contain the query (accent/case-insensitive)
    pub fn search(&self, query: &str) -> Vec<&Item> {
        let needle = normalize_text(query);
        if needle.is_empty() {
            return self.items.iter().collect();
        }
        self.items
            .iter()
            .filter(|item| {
                let haystack = normalize_text(&format!(
                    "{} {} {}",
                    item.product_code.as_deref().unwrap_or(""),
                    item.access_code.as_deref().unwrap_or(""),
                    item.name
                ));
                haystack.contains(&needle)
            })
            .collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn parse_row(
    record: &StringRecord,
    index: &ColumnIndex,
    policy: NumberPolicy,
) -> Result<Option<Item>, LoadError> {
    let name = ColumnIndex::cell(record, Some(index.name));
    if name.is_empty() || name.to_uppercase().starts_with("TOTAL") {
        debug!(line = record_line(record), name, "skipping row");
        return Ok(None);
    }

    let number = |field: &'static str, raw: &str| {
        parse_number(raw, policy).map_err(|source| LoadError::InvalidNumber {
            field,
            value: raw.to_string(),
            line: record_line(record),
            source,
        })
    };

    let system_qty = number("stock quantity", ColumnIndex::cell(record, index.system_qty))?;
    let unit_cost = match index.cost_cell(record) {
        Some(raw) => number("unit cost", raw)?,
        None => 0.0,
    };

    let owned = |s: &str| Some(s.to_string()).filter(|s| !s.is_empty());
    let mut item = Item::new(
        owned(ColumnIndex::cell(record, index.product_code)),
        owned(ColumnIndex::cell(record, index.access_code)),
        name,
        system_qty.round() as i64,
        unit_cost,
    );
    item.days_since_last_entry =
        ColumnIndex::cell(record, index.days_since_last_entry).to_string();
    Ok(Some(item))
}

fn record_line(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

/// Lightweight change-detection signature of a source text
///
/// A 32-bit rolling hash (`h * 31 + unit`) over the first
/// [`SIGNATURE_SPAN`] UTF-16 code units. Only good enough to warn that a
/// different file was loaded; large files can collide past the span.
pub fn signature_for_text(text: &str) -> String {
    let hash = text
        .encode_utf16()
        .take(SIGNATURE_SPAN)
        .fold(0i32, |h, unit| {
            h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit))
        });
    hash.to_string()
}
