//! `tally users` command - Per-counter accountability totals

use miette::Result;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::cli::helpers::{escape_tsv, open_workspace};
use crate::cli::output::{effective_format, print_json};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::metrics::user_rollup;
use crate::core::number::format_money;

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "Counter")]
    user: String,
    #[tabled(rename = "Items")]
    items: usize,
    #[tabled(rename = "Divergent")]
    divergent: usize,
    #[tabled(rename = "Abs impact")]
    abs_impact: String,
}

pub fn run(global: &GlobalOpts) -> Result<()> {
    let ws = open_workspace(global)?;
    let rollup = user_rollup(ws.catalog(), ws.counts());

    if rollup.is_empty() {
        println!("No counts recorded.");
        return Ok(());
    }

    match effective_format(global.output, true) {
        OutputFormat::Json => print_json(&rollup)?,
        OutputFormat::Id => {
            for user in rollup.keys() {
                println!("{}", user);
            }
        }
        OutputFormat::Tsv => {
            println!("user\titems\tdivergent\tabs_impact");
            for (user, r) in &rollup {
                println!(
                    "{}\t{}\t{}\t{}",
                    escape_tsv(user),
                    r.items,
                    r.divergent,
                    format_money(r.abs_impact)
                );
            }
        }
        OutputFormat::Table | OutputFormat::Auto => {
            let rows: Vec<UserRow> = rollup
                .iter()
                .map(|(user, r)| UserRow {
                    user: user.clone(),
                    items: r.items,
                    divergent: r.divergent,
                    abs_impact: format_money(r.abs_impact),
                })
                .collect();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{}", table);
        }
    }
    Ok(())
}
