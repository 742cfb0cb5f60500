//! `tally header` command - Show or set the report header

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::open_workspace;
use crate::cli::output::print_json;
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct HeaderArgs {
    /// Store or branch being counted (also scopes the sync session)
    #[arg(long)]
    pub unit: Option<String>,

    /// Person accountable for the count
    #[arg(long)]
    pub responsible: Option<String>,
}

pub fn run(args: HeaderArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = open_workspace(global)?;
    let changed = args.unit.is_some() || args.responsible.is_some();
    if changed {
        ws.set_header(args.unit, args.responsible).into_diagnostic()?;
    }

    let header = ws.header();
    if global.output == OutputFormat::Json {
        return print_json(header);
    }
    if changed {
        println!("{} Header updated", style("✓").green());
    }
    println!("{}: {}", style("Unit").bold(), header.unit);
    println!("{}: {}", style("Responsible").bold(), header.responsible);
    Ok(())
}
