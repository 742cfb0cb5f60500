//! Command-line argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::{
    clear::ClearArgs, completions::CompletionsArgs, count::CountArgs, div::DivArgs,
    export::ExportArgs, header::HeaderArgs, list::ListArgs, load::LoadArgs, report::ReportArgs,
    reset::ResetArgs, select::SelectArgs, show::ShowArgs, sync::SyncCommands,
};

#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(version)]
#[command(about = "Reconcile physical inventory counts against a stock snapshot")]
#[command(long_about = "Tally loads a semicolon-delimited stock export, records what was \
actually counted on the shelf, and reports where the two disagree and what it costs.\n\n\
Items can be referenced by @N (from the last listing), product code, access code or key.")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(clap::Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Directory holding the session database
    #[arg(long, global = true, env = "TALLY_DATA_DIR", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Name recorded on counts made from this device
    #[arg(long, global = true, env = "TALLY_USER")]
    pub user: Option<String>,

    /// Shared directory used to exchange counts with other devices
    #[arg(long, global = true, env = "TALLY_SYNC_DIR", value_name = "DIR")]
    pub sync_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "auto")]
    pub output: OutputFormat,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table on a terminal, TSV for piped lists
    #[default]
    Auto,
    /// Human-readable table
    Table,
    /// JSON
    Json,
    /// Tab-separated values
    Tsv,
    /// Item keys only, one per line
    Id,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a stock export (replaces the current catalog)
    Load(LoadArgs),

    /// List catalog items
    List(ListArgs),

    /// Show one item with its count
    Show(ShowArgs),

    /// Select the item subsequent counts apply to
    Select(SelectArgs),

    /// Record a physical count
    Count(CountArgs),

    /// Remove the count of one item
    Clear(ClearArgs),

    /// Remove every count
    Reset(ResetArgs),

    /// Progress and monetary totals
    Summary,

    /// Divergences ranked by monetary impact
    Div(DivArgs),

    /// Per-counter accountability totals
    Users,

    /// Export every item with its count as semicolon-delimited text
    Export(ExportArgs),

    /// Render a Markdown report
    Report(ReportArgs),

    /// Show or set the report header
    Header(HeaderArgs),

    /// Exchange counts with other devices
    #[command(subcommand)]
    Sync(SyncCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
