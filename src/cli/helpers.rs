//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use std::io::{self, BufRead, IsTerminal};

use chrono::Local;
use console::{style, StyledObject};
use miette::{IntoDiagnostic, Result};

use crate::cli::GlobalOpts;
use crate::core::config::Config;
use crate::core::metrics::Status;
use crate::core::storage::Storage;
use crate::core::sync::FileChannel;
use crate::core::workspace::{Workspace, WorkspaceOptions};

/// Load the configuration and overlay the global command-line flags
pub fn resolve_config(global: &GlobalOpts) -> Config {
    let mut config = Config::load();
    if let Some(user) = global.user.as_ref().filter(|u| !u.trim().is_empty()) {
        config.user = Some(user.trim().to_string());
    }
    if let Some(dir) = &global.data_dir {
        config.data_dir = Some(dir.clone());
    }
    if let Some(dir) = &global.sync_dir {
        config.sync_dir = Some(dir.clone());
    }
    config
}

/// Open the workspace for this device, attaching the file sync channel
/// when a sync directory is configured
pub fn open_workspace(global: &GlobalOpts) -> Result<Workspace> {
    let config = resolve_config(global);
    let storage = Storage::open(&config.data_dir()).into_diagnostic()?;
    let ws = Workspace::open(storage, WorkspaceOptions::from(&config));

    Ok(match &config.sync_dir {
        Some(dir) => {
            let session = ws.session_id(Local::now().date_naive());
            ws.with_channel(Box::new(FileChannel::new(dir, &session)))
        }
        None => ws,
    })
}

/// Truncate a string to max_len characters, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Signed difference ("+2", "-3", "0")
pub fn format_diff(diff: i64) -> String {
    if diff > 0 {
        format!("+{}", diff)
    } else {
        diff.to_string()
    }
}

/// Optional integer, "-" when absent
pub fn format_opt(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Status label coloured by outcome
pub fn styled_status(status: Status) -> StyledObject<String> {
    let label = status.to_string();
    match status {
        Status::Ok => style(label).green(),
        Status::Divergent => style(label).red(),
        Status::Missing => style(label).dim(),
    }
}

/// Escape a field for TSV output (tabs and newlines become spaces)
pub fn escape_tsv(s: &str) -> String {
    s.replace(['\t', '\n', '\r'], " ")
}

/// Read a single trimmed line from stdin if it is piped
///
/// Returns `None` when stdin is a terminal or empty.
pub fn read_stdin_line() -> Option<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return None;
    }
    stdin
        .lock()
        .lines()
        .map_while(|line| line.ok())
        .map(|line| line.trim().to_string())
        .find(|line| !line.is_empty())
}

/// Whether both stdin and stdout are attached to a terminal
pub fn is_interactive() -> bool {
    io::stdin().is_terminal() && io::stdout().is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
        assert_eq!(truncate_str("Feijão carioca", 9), "Feijão...");
    }

    #[test]
    fn test_format_diff() {
        assert_eq!(format_diff(2), "+2");
        assert_eq!(format_diff(-3), "-3");
        assert_eq!(format_diff(0), "0");
        assert_eq!(format_opt(None), "-");
    }

    #[test]
    fn test_escape_tsv() {
        assert_eq!(escape_tsv("simple"), "simple");
        assert_eq!(escape_tsv("with\ttab"), "with tab");
        assert_eq!(escape_tsv("two\nlines"), "two lines");
    }
}
