//! Tally: inventory count reconciliation
//!
//! Loads a stock snapshot exported from a system of record, records physical
//! counts against it, and reports where and by how much the two disagree.

pub mod cli;
pub mod core;
pub mod report;
