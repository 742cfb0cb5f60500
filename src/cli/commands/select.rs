//! `tally select` command - Choose the item subsequent counts apply to

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::commands::list::require_catalog;
use crate::cli::helpers::open_workspace;
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct SelectArgs {
    /// Item reference (@N, product code, access code or key)
    pub reference: String,
}

pub fn run(args: SelectArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = open_workspace(global)?;
    require_catalog(&mut ws)?;

    let key = ws.select(&args.reference).into_diagnostic()?;
    let name = ws
        .catalog()
        .get(key.as_str())
        .map(|i| i.name.clone())
        .unwrap_or_default();
    println!(
        "{} Selected {} {}",
        style("✓").green(),
        style(&key).cyan(),
        name
    );
    Ok(())
}
