//! Core module - reconciliation engine types and state

pub mod catalog;
pub mod columns;
pub mod config;
pub mod counts;
pub mod export;
pub mod identity;
pub mod metrics;
pub mod number;
pub mod shortid;
pub mod storage;
pub mod sync;
pub mod workspace;

pub use catalog::{Catalog, Item, LoadError};
pub use columns::ColumnMap;
pub use config::Config;
pub use counts::{Clock, CountStore, MergeOutcome, Observation, Stamp};
pub use identity::{derive_key, ItemKey, KeySource};
pub use metrics::{Aggregate, Category, DivergenceFilter, Metric, Status};
pub use number::{parse_locale_number, NumberPolicy};
pub use shortid::ShortIdIndex;
pub use storage::{LoadMeta, ReportHeader, Storage, StorageError};
pub use sync::{FileChannel, MemoryChannel, SyncChannel, SyncError};
pub use workspace::{SaveError, Workspace, WorkspaceError, WorkspaceOptions};
