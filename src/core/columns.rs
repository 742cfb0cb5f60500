//! Header-name to field mapping for tabular stock exports
//!
//! The expected headers live in one table instead of being scattered through
//! the loader, so a different export layout only needs a different
//! [`ColumnMap`] (typically from the `columns:` section of the config file).

use csv::StringRecord;
use serde::{Deserialize, Serialize};

/// Header names recognized in a stock export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub product_code: String,
    pub access_code: String,
    pub name: String,
    pub system_qty: String,
    pub days_since_last_entry: String,
    /// Cost columns in order of preference
    pub cost: Vec<String>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            product_code: "Código Produto".to_string(),
            access_code: "Código Acesso".to_string(),
            name: "Produto".to_string(),
            system_qty: "Quantidade em Estoque".to_string(),
            days_since_last_entry: "Dias Ult. Entrada".to_string(),
            cost: vec![
                "Custo Liq. Unitário".to_string(),
                "Valor Custo Bruto".to_string(),
            ],
        }
    }
}

/// Column positions resolved against an actual header row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIndex {
    pub product_code: Option<usize>,
    pub access_code: Option<usize>,
    pub name: usize,
    pub system_qty: Option<usize>,
    pub days_since_last_entry: Option<usize>,
    pub cost: Vec<usize>,
}

impl ColumnMap {
    /// Locate each configured header; `None` when the name column is absent
    pub fn resolve(&self, headers: &StringRecord) -> Option<ColumnIndex> {
        let find = |wanted: &str| headers.iter().position(|h| h.trim() == wanted);

        Some(ColumnIndex {
            product_code: find(&self.product_code),
            access_code: find(&self.access_code),
            name: find(&self.name)?,
            system_qty: find(&self.system_qty),
            days_since_last_entry: find(&self.days_since_last_entry),
            cost: self.cost.iter().filter_map(|c| find(c)).collect(),
        })
    }
}

impl ColumnIndex {
    /// Trimmed cell at an optional position; missing columns read as ""
    pub fn cell<'r>(record: &'r StringRecord, at: Option<usize>) -> &'r str {
        at.and_then(|i| record.get(i)).map(str::trim).unwrap_or("")
    }

    /// First non-blank cost cell following the preference chain
    pub fn cost_cell<'r>(&self, record: &'r StringRecord) -> Option<&'r str> {
        self.cost
            .iter()
            .map(|&i| Self::cell(record, Some(i)))
            .find(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> StringRecord {
        StringRecord::from(names.to_vec())
    }

    #[test]
    fn test_resolve_default_headers() {
        let map = ColumnMap::default();
        let idx = map
            .resolve(&headers(&[
                "Código Produto",
                "Produto",
                "Quantidade em Estoque",
                "Valor Custo Bruto",
            ]))
            .unwrap();
        assert_eq!(idx.product_code, Some(0));
        assert_eq!(idx.name, 1);
        assert_eq!(idx.system_qty, Some(2));
        assert_eq!(idx.access_code, None);
        assert_eq!(idx.cost, vec![3]);
    }

    #[test]
    fn test_missing_name_column_fails() {
        let map = ColumnMap::default();
        assert!(map.resolve(&headers(&["Código Produto", "Qtd"])).is_none());
    }

    #[test]
    fn test_cost_chain_prefers_primary_then_secondary() {
        let map = ColumnMap::default();
        let idx = map
            .resolve(&headers(&["Produto", "Valor Custo Bruto", "Custo Liq. Unitário"]))
            .unwrap();
        assert_eq!(idx.cost, vec![2, 1]);

        let both = StringRecord::from(vec!["Arroz", "3,00", "2,50"]);
        assert_eq!(idx.cost_cell(&both), Some("2,50"));

        let primary_blank = StringRecord::from(vec!["Arroz", "3,00", " "]);
        assert_eq!(idx.cost_cell(&primary_blank), Some("3,00"));

        let none = StringRecord::from(vec!["Arroz", "", ""]);
        assert_eq!(idx.cost_cell(&none), None);
    }

    #[test]
    fn test_custom_map_from_yaml() {
        let yaml = "name: Description\nsystem_qty: Qty\ncost: [Cost]\n";
        let map: ColumnMap = serde_yml::from_str(yaml).unwrap();
        assert_eq!(map.name, "Description");
        assert_eq!(map.product_code, "Código Produto");

        let idx = map.resolve(&headers(&["Description", "Qty", "Cost"])).unwrap();
        assert_eq!(idx.system_qty, Some(1));
        assert_eq!(idx.cost, vec![2]);
    }
}
