//! `tally div` command - Divergences ranked by monetary impact

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::commands::list::{print_items, require_catalog};
use crate::cli::filters::StatusFilter;
use crate::cli::helpers::open_workspace;
use crate::cli::output::effective_format;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::catalog::Item;
use crate::core::metrics::{rank_divergences, Metric};
use crate::core::number::format_money;

#[derive(clap::Args, Debug)]
pub struct DivArgs {
    /// Which items to rank
    #[arg(long, short = 'f', default_value = "divergent")]
    pub filter: StatusFilter,

    /// Show only the N largest
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

pub fn run(args: DivArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = open_workspace(global)?;
    require_catalog(&mut ws)?;

    let entries: Vec<(Item, Metric)> =
        rank_divergences(ws.catalog(), ws.counts(), args.filter.into())
            .into_iter()
            .take(args.limit.unwrap_or(usize::MAX))
            .map(|ranked| (ranked.item.clone(), ranked.metric))
            .collect();

    if entries.is_empty() {
        println!("No divergences.");
        return Ok(());
    }

    ws.remember_listing(entries.iter().map(|(item, _)| &item.key))
        .into_diagnostic()?;
    print_items(&ws, &entries, global.output)?;

    if effective_format(global.output, true) == OutputFormat::Table {
        let total: f64 = entries.iter().map(|(_, m)| m.abs_impact()).sum();
        println!(
            "{} item(s), absolute impact {}",
            style(entries.len()).cyan(),
            style(format_money(total)).bold()
        );
    }
    Ok(())
}
