//! `tally summary` command - Progress and monetary totals

use console::style;
use miette::Result;

use crate::cli::helpers::open_workspace;
use crate::cli::output::print_json;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::metrics::aggregate;
use crate::core::number::format_money;

pub fn run(global: &GlobalOpts) -> Result<()> {
    let ws = open_workspace(global)?;
    let agg = aggregate(ws.catalog(), ws.counts());
    let meta = ws.meta();

    if global.output == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "source": meta.as_ref().map(|m| &m.source_name),
            "loaded_at": meta.as_ref().map(|m| m.loaded_at),
            "unit": ws.header().unit,
            "responsible": ws.header().responsible,
            "selection": ws.selection(),
            "aggregate": agg,
            "progress": agg.progress(),
        }));
    }

    if let Some(meta) = &meta {
        println!(
            "{} {} (loaded {})",
            style("Source:").bold(),
            meta.source_name,
            meta.loaded_at.format("%Y-%m-%d %H:%M")
        );
    } else {
        println!("{} none loaded", style("Source:").bold());
    }
    let header = ws.header();
    if !header.unit.is_empty() || !header.responsible.is_empty() {
        println!(
            "{} {}  {} {}",
            style("Unit:").bold(),
            header.unit,
            style("Responsible:").bold(),
            header.responsible
        );
    }
    if let Some(item) = ws.selected_item() {
        println!("{} {} {}", style("Selected:").bold(), style(&item.key).cyan(), item.name);
    }
    println!();

    println!(
        "{:<12} {}",
        style("Items").bold(),
        agg.total
    );
    println!(
        "{:<12} {} ({:.1}%)",
        style("Counted").bold(),
        style(agg.counted).cyan(),
        agg.progress() * 100.0
    );
    println!("{:<12} {}", style("Missing").bold(), style(agg.missing).dim());
    println!("{:<12} {}", style("OK").bold(), style(agg.ok).green());
    println!("{:<12} {}", style("Divergent").bold(), style(agg.divergent).red());
    println!();
    println!("{:<12} {}", style("Net impact").bold(), format_money(agg.net_impact));
    println!("{:<12} {}", style("Abs impact").bold(), format_money(agg.abs_impact));
    Ok(())
}
