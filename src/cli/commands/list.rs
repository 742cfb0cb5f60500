//! `tally list` command - List catalog items with their counts

use std::io::ErrorKind;

use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::warn;

use crate::cli::filters::StatusFilter;
use crate::cli::helpers::{escape_tsv, format_diff, format_opt, open_workspace, truncate_str};
use crate::cli::output::{effective_format, print_json};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::catalog::{Item, LoadError};
use crate::core::metrics::{metrics_for, Metric, Status};
use crate::core::number::format_money;
use crate::core::workspace::{Workspace, WorkspaceError};

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Search codes and names (accent and case-insensitive)
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Filter by reconciliation status
    #[arg(long, default_value = "all")]
    pub status: StatusFilter,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show count only
    #[arg(long)]
    pub count: bool,
}

/// One table row
#[derive(Tabled)]
pub struct ItemRow {
    #[tabled(rename = "#")]
    pub short: String,
    #[tabled(rename = "Code")]
    pub code: String,
    #[tabled(rename = "Product")]
    pub name: String,
    #[tabled(rename = "System")]
    pub system_qty: i64,
    #[tabled(rename = "Counted")]
    pub counted: String,
    #[tabled(rename = "Diff")]
    pub diff: String,
    #[tabled(rename = "Impact")]
    pub impact: String,
    #[tabled(rename = "Status")]
    pub status: Status,
}

pub fn run(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = open_workspace(global)?;
    require_catalog(&mut ws)?;

    let query = args.search.as_deref().unwrap_or("");
    let entries: Vec<(Item, Metric)> = ws
        .catalog()
        .search(query)
        .into_iter()
        .map(|item| (item.clone(), metrics_for(item, ws.counts())))
        .filter(|(_, metric)| args.status.matches(metric.category))
        .take(args.limit.unwrap_or(usize::MAX))
        .collect();

    if args.count {
        println!("{}", entries.len());
        return Ok(());
    }
    if entries.is_empty() {
        println!("No items found.");
        return Ok(());
    }

    ws.remember_listing(entries.iter().map(|(item, _)| &item.key))
        .into_diagnostic()?;
    print_items(&ws, &entries, global.output)?;

    if effective_format(global.output, true) == OutputFormat::Table {
        println!(
            "{} item(s). Use {} to record a count.",
            style(entries.len()).cyan(),
            style("tally count @N <QTY>").cyan()
        );
    }
    Ok(())
}

/// Make sure a catalog is present, loading the default source on first use
///
/// Fails with a manual-load hint when the default source is missing or
/// does not load.
pub fn require_catalog(ws: &mut Workspace) -> Result<()> {
    match ws.ensure_catalog() {
        Ok(Some(report)) => {
            let source = ws.meta().map(|m| m.source_name).unwrap_or_default();
            eprintln!(
                "{} Loaded {} items from {}",
                style("✓").green(),
                style(report.items).cyan(),
                style(source).yellow()
            );
        }
        Ok(None) => {}
        Err(WorkspaceError::Load(LoadError::Io(e))) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            warn!(error = %e, "default source did not load");
            eprintln!("{} Default source not loaded: {}", style("!").yellow().bold(), e);
        }
    }
    if ws.catalog().is_empty() {
        return Err(miette::miette!(
            "No catalog loaded. Run `tally load <FILE>` first."
        ));
    }
    Ok(())
}

/// JSON form of an item and its metric
pub fn item_json(ws: &Workspace, item: &Item, metric: &Metric) -> serde_json::Value {
    let observation = ws.counts().get(item.key.as_str());
    serde_json::json!({
        "short_id": ws.short_ids().format(&item.key),
        "key": item.key,
        "key_source": item.key.source(),
        "product_code": item.product_code,
        "access_code": item.access_code,
        "name": item.name,
        "system_qty": item.system_qty,
        "unit_cost": item.unit_cost,
        "days_since_last_entry": item.days_since_last_entry,
        "counted": metric.counted,
        "diff": metric.diff,
        "impact": metric.impact,
        "status": metric.status,
        "category": metric.category,
        "user": observation.as_ref().and_then(|o| o.user.clone()),
        "ts": observation.map(|o| o.ts),
    })
}

/// Print items in the requested list format
pub fn print_items(ws: &Workspace, entries: &[(Item, Metric)], format: OutputFormat) -> Result<()> {
    match effective_format(format, true) {
        OutputFormat::Json => {
            let json: Vec<serde_json::Value> = entries
                .iter()
                .map(|(item, metric)| item_json(ws, item, metric))
                .collect();
            print_json(&json)?;
        }
        OutputFormat::Id => {
            for (item, _) in entries {
                println!("{}", item.key);
            }
        }
        OutputFormat::Tsv => {
            println!("short_id\tkey\tcode\tname\tsystem\tcounted\tdiff\timpact\tstatus");
            for (item, metric) in entries {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    ws.short_ids().format(&item.key),
                    item.key,
                    escape_tsv(item.display_code()),
                    escape_tsv(&item.name),
                    item.system_qty,
                    metric.counted.map(|c| c.to_string()).unwrap_or_default(),
                    metric.diff.map(|d| d.to_string()).unwrap_or_default(),
                    metric.impact.map(format_money).unwrap_or_default(),
                    metric.status,
                );
            }
        }
        OutputFormat::Table | OutputFormat::Auto => {
            let rows: Vec<ItemRow> = entries
                .iter()
                .map(|(item, metric)| ItemRow {
                    short: ws.short_ids().format(&item.key),
                    code: truncate_str(item.display_code(), 16),
                    name: truncate_str(&item.name, 40),
                    system_qty: item.system_qty,
                    counted: format_opt(metric.counted),
                    diff: metric.diff.map(format_diff).unwrap_or_else(|| "-".to_string()),
                    impact: metric.impact.map(format_money).unwrap_or_else(|| "-".to_string()),
                    status: metric.status,
                })
                .collect();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{}", table);
        }
    }
    Ok(())
}
