//! `tally clear` command - Remove the count of one item

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::commands::list::require_catalog;
use crate::cli::helpers::open_workspace;
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct ClearArgs {
    /// Item reference (@N, product code, access code or key); defaults to the selection
    pub reference: Option<String>,
}

pub fn run(args: ClearArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = open_workspace(global)?;
    require_catalog(&mut ws)?;

    let (key, removed) = ws
        .clear_count(args.reference.as_deref())
        .into_diagnostic()?;
    if removed {
        println!("{} Cleared count for {}", style("✓").green(), style(&key).cyan());
    } else {
        println!("{} had no count", style(&key).cyan());
    }
    Ok(())
}
