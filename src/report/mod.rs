//! Reconciliation report
//!
//! A [`ReportSnapshot`] is a read-only copy of everything a report shows,
//! taken at one instant. Rendering never touches the engine state.

pub mod template;

pub use template::{ReportError, ReportRenderer};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::catalog::Catalog;
use crate::core::counts::CountStore;
use crate::core::metrics::{aggregate, rank_divergences, user_rollup, Aggregate, Category, DivergenceFilter, UserRollup};
use crate::core::storage::ReportHeader;
use crate::core::workspace::Workspace;

/// Number of divergences listed when not specified
pub const DEFAULT_TOP: usize = 10;

/// One divergent item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportLine {
    pub code: String,
    pub name: String,
    pub system_qty: i64,
    pub counted: i64,
    pub diff: i64,
    pub unit_cost: f64,
    pub impact: f64,
    pub category: Category,
}

/// Accountability line for one counter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserLine {
    pub user: String,
    #[serde(flatten)]
    pub rollup: UserRollup,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSnapshot {
    pub unit: String,
    pub responsible: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub aggregate: Aggregate,
    /// Largest absolute impacts first
    pub divergences: Vec<ReportLine>,
    /// Ordered by user name
    pub users: Vec<UserLine>,
}

impl ReportSnapshot {
    /// Snapshot the catalog and counts, keeping the `top_n` largest divergences
    pub fn build(catalog: &Catalog, store: &CountStore, header: &ReportHeader, top_n: usize) -> Self {
        let divergences = rank_divergences(catalog, store, DivergenceFilter::Divergent)
            .into_iter()
            .take(top_n)
            .filter_map(|ranked| {
                Some(ReportLine {
                    code: ranked.item.display_code().to_string(),
                    name: ranked.item.name.clone(),
                    system_qty: ranked.item.system_qty,
                    counted: ranked.metric.counted?,
                    diff: ranked.metric.diff?,
                    unit_cost: ranked.item.unit_cost,
                    impact: ranked.metric.impact?,
                    category: ranked.metric.category,
                })
            })
            .collect();

        let users = user_rollup(catalog, store)
            .into_iter()
            .map(|(user, rollup)| UserLine { user, rollup })
            .collect();

        Self {
            unit: header.unit.clone(),
            responsible: header.responsible.clone(),
            source_name: None,
            generated_at: Utc::now(),
            aggregate: aggregate(catalog, store),
            divergences,
            users,
        }
    }

    /// Snapshot a workspace, including the name of the loaded source
    pub fn from_workspace(ws: &Workspace, top_n: usize) -> Self {
        let mut snapshot = Self::build(ws.catalog(), ws.counts(), ws.header(), top_n);
        snapshot.source_name = ws.meta().map(|m| m.source_name);
        snapshot
    }
}
