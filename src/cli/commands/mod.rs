//! CLI command implementations

pub mod clear;
pub mod completions;
pub mod count;
pub mod div;
pub mod export;
pub mod header;
pub mod list;
pub mod load;
pub mod report;
pub mod reset;
pub mod select;
pub mod show;
pub mod summary;
pub mod sync;
pub mod users;
