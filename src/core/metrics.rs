//! Reconciliation metrics
//!
//! Everything here is a pure function of the catalog and the count store and
//! is recomputed on every query.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::catalog::Item;
use crate::core::counts::CountStore;

/// Attribution used for observations without a user
pub const UNKNOWN_USER: &str = "unknown";

/// Reconciliation status of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Divergent,
    Missing,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Ok => write!(f, "OK"),
            Status::Divergent => write!(f, "DIVERGENT"),
            Status::Missing => write!(f, "MISSING"),
        }
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "OK" => Ok(Status::Ok),
            "DIVERGENT" => Ok(Status::Divergent),
            "MISSING" => Ok(Status::Missing),
            other => Err(format!("Unknown status: {}", other)),
        }
    }
}

/// Status refined by the sign of the difference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Missing,
    Ok,
    /// Counted more than the system expects
    Over,
    /// Counted less than the system expects
    Under,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Missing => write!(f, "missing"),
            Category::Ok => write!(f, "ok"),
            Category::Over => write!(f, "over"),
            Category::Under => write!(f, "under"),
        }
    }
}

/// Derived per-item reconciliation values
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metric {
    pub counted: Option<i64>,
    /// `counted - system_qty`
    pub diff: Option<i64>,
    /// `diff * unit_cost`
    pub impact: Option<f64>,
    pub status: Status,
    pub category: Category,
}

impl Metric {
    /// Compute the metric for a system quantity and an optional count
    pub fn compute(system_qty: i64, unit_cost: f64, counted: Option<i64>) -> Self {
        let Some(counted) = counted else {
            return Self {
                counted: None,
                diff: None,
                impact: None,
                status: Status::Missing,
                category: Category::Missing,
            };
        };

        let diff = counted.saturating_sub(system_qty);
        let (status, category) = match diff {
            0 => (Status::Ok, Category::Ok),
            d if d > 0 => (Status::Divergent, Category::Over),
            _ => (Status::Divergent, Category::Under),
        };
        Self {
            counted: Some(counted),
            diff: Some(diff),
            impact: Some(diff as f64 * unit_cost),
            status,
            category,
        }
    }

    pub fn has_count(&self) -> bool {
        self.counted.is_some()
    }

    /// Absolute monetary impact, 0 when not counted
    pub fn abs_impact(&self) -> f64 {
        self.impact.map(f64::abs).unwrap_or(0.0)
    }
}

/// Metric for one item against the store
pub fn metrics_for(item: &Item, store: &CountStore) -> Metric {
    Metric::compute(
        item.system_qty,
        item.unit_cost,
        store.counted(item.key.as_str()),
    )
}

/// Whole-catalog rollup
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Aggregate {
    pub total: usize,
    pub counted: usize,
    pub missing: usize,
    pub ok: usize,
    pub divergent: usize,
    /// Signed sum of impacts
    pub net_impact: f64,
    /// Sum of absolute impacts
    pub abs_impact: f64,
}

impl Aggregate {
    /// Fraction of items counted, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.counted as f64 / self.total as f64
        }
    }
}

/// Single-pass rollup across all items
pub fn aggregate<'a, I>(items: I, store: &CountStore) -> Aggregate
where
    I: IntoIterator<Item = &'a Item>,
{
    let mut agg = Aggregate::default();
    for item in items {
        agg.total += 1;
        let metric = metrics_for(item, store);
        match metric.status {
            Status::Missing => {
                agg.missing += 1;
                continue;
            }
            Status::Ok => agg.ok += 1,
            Status::Divergent => agg.divergent += 1,
        }
        agg.counted += 1;
        let impact = metric.impact.unwrap_or(0.0);
        agg.net_impact += impact;
        agg.abs_impact += impact.abs();
    }
    agg
}

/// Category predicate for divergence rankings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DivergenceFilter {
    All,
    Ok,
    Over,
    Under,
    /// Over or under
    #[default]
    Divergent,
    Missing,
}

impl DivergenceFilter {
    pub fn matches(&self, category: Category) -> bool {
        match self {
            DivergenceFilter::All => true,
            DivergenceFilter::Ok => category == Category::Ok,
            DivergenceFilter::Over => category == Category::Over,
            DivergenceFilter::Under => category == Category::Under,
            DivergenceFilter::Divergent => {
                matches!(category, Category::Over | Category::Under)
            }
            DivergenceFilter::Missing => category == Category::Missing,
        }
    }
}

/// An item with its metric, as listed in rankings
#[derive(Debug, Clone, Serialize)]
pub struct Ranked<'a> {
    pub item: &'a Item,
    pub metric: Metric,
    pub abs_impact: f64,
}

/// Items matching the filter, largest absolute impact first
///
/// The sort is stable, so equal impacts keep catalog order.
pub fn rank_divergences<'a, I>(
    items: I,
    store: &CountStore,
    filter: DivergenceFilter,
) -> Vec<Ranked<'a>>
where
    I: IntoIterator<Item = &'a Item>,
{
    let mut ranked: Vec<Ranked<'a>> = items
        .into_iter()
        .map(|item| {
            let metric = metrics_for(item, store);
            Ranked {
                item,
                metric,
                abs_impact: metric.abs_impact(),
            }
        })
        .filter(|r| filter.matches(r.metric.category))
        .collect();
    ranked.sort_by(|a, b| b.abs_impact.total_cmp(&a.abs_impact));
    ranked
}

/// Accountability totals for one counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UserRollup {
    pub items: usize,
    pub divergent: usize,
    pub abs_impact: f64,
}

/// Per-user totals over every counted item, keyed by user name
pub fn user_rollup<'a, I>(items: I, store: &CountStore) -> BTreeMap<String, UserRollup>
where
    I: IntoIterator<Item = &'a Item>,
{
    let mut by_user: BTreeMap<String, UserRollup> = BTreeMap::new();
    for item in items {
        let Some(obs) = store.get(item.key.as_str()) else {
            continue;
        };
        let metric = Metric::compute(item.system_qty, item.unit_cost, Some(obs.counted));
        let user = obs
            .user
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_USER.to_string());

        let entry = by_user.entry(user).or_default();
        entry.items += 1;
        if metric.status == Status::Divergent {
            entry.divergent += 1;
        }
        entry.abs_impact += metric.abs_impact();
    }
    by_user
}
