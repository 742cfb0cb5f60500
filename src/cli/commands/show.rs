//! `tally show` command - Show one item with its count

use chrono::{DateTime, Local};
use console::style;
use miette::Result;

use crate::cli::commands::list::{item_json, require_catalog};
use crate::cli::helpers::{format_diff, open_workspace, styled_status};
use crate::cli::output::print_json;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::number::format_money;

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Item reference (@N, product code, access code or key); defaults to the selection
    pub reference: Option<String>,
}

pub fn run(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = open_workspace(global)?;
    require_catalog(&mut ws)?;

    let reference = match args.reference {
        Some(r) => r,
        None => ws
            .selection()
            .map(|k| k.to_string())
            .ok_or_else(|| miette::miette!("No item selected. Pass a reference or run `tally select`."))?,
    };
    let (item, metric) = ws
        .lookup(&reference)
        .ok_or_else(|| miette::miette!("Item '{}' not found", reference))?;

    match global.output {
        OutputFormat::Json => return print_json(&item_json(&ws, item, &metric)),
        OutputFormat::Id => {
            println!("{}", item.key);
            return Ok(());
        }
        _ => {}
    }

    println!("{}", style(&item.name).bold());
    println!("{}", style("─".repeat(60)).dim());
    match item.key.source() {
        Some(source) => println!("{}: {} {}", style("Key").bold(), item.key, style(format!("(from {})", source)).dim()),
        None => println!("{}: {}", style("Key").bold(), item.key),
    }
    if let Some(code) = &item.product_code {
        println!("{}: {}", style("Product code").bold(), code);
    }
    if let Some(code) = &item.access_code {
        println!("{}: {}", style("Access code").bold(), code);
    }
    if !item.days_since_last_entry.is_empty() {
        println!("{}: {}", style("Days since entry").bold(), item.days_since_last_entry);
    }
    println!("{}: {}", style("System qty").bold(), item.system_qty);
    println!("{}: {}", style("Unit cost").bold(), format_money(item.unit_cost));

    match metric.counted {
        Some(counted) => {
            println!("{}: {}", style("Counted").bold(), style(counted).cyan());
            if let Some(diff) = metric.diff {
                println!("{}: {}", style("Diff").bold(), format_diff(diff));
            }
            if let Some(impact) = metric.impact {
                println!("{}: {}", style("Impact").bold(), format_money(impact));
            }
            if let Some(obs) = ws.counts().get(item.key.as_str()) {
                let when = DateTime::from_timestamp_millis(obs.ts.0)
                    .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{}: {} {}",
                    style("Counted by").bold(),
                    obs.user.as_deref().unwrap_or("unknown"),
                    style(when).dim()
                );
            }
        }
        None => println!("{}: -", style("Counted").bold()),
    }
    println!("{}: {}", style("Status").bold(), styled_status(metric.status));
    Ok(())
}
