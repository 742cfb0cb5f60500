//! Filter enums for CLI commands
//!
//! Shared by `list` and `div` so both accept the same status names.

use clap::ValueEnum;

use crate::core::metrics::{Category, DivergenceFilter};

/// Reconciliation status filter
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum StatusFilter {
    /// Every item - default for listings
    #[default]
    All,
    /// Counted and matching the system
    Ok,
    /// Counted and different from the system (over or under)
    Divergent,
    /// Counted more than the system expects
    Over,
    /// Counted less than the system expects
    Under,
    /// Not counted yet
    Missing,
}

impl StatusFilter {
    /// Check if a category matches this filter
    pub fn matches(&self, category: Category) -> bool {
        DivergenceFilter::from(*self).matches(category)
    }
}

impl From<StatusFilter> for DivergenceFilter {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::All => DivergenceFilter::All,
            StatusFilter::Ok => DivergenceFilter::Ok,
            StatusFilter::Divergent => DivergenceFilter::Divergent,
            StatusFilter::Over => DivergenceFilter::Over,
            StatusFilter::Under => DivergenceFilter::Under,
            StatusFilter::Missing => DivergenceFilter::Missing,
        }
    }
}

impl std::fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusFilter::All => write!(f, "all"),
            StatusFilter::Ok => write!(f, "ok"),
            StatusFilter::Divergent => write!(f, "divergent"),
            StatusFilter::Over => write!(f, "over"),
            StatusFilter::Under => write!(f, "under"),
            StatusFilter::Missing => write!(f, "missing"),
        }
    }
}
