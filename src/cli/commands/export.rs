//! `tally export` command - Semicolon-delimited export of every item

use std::fs;
use std::path::PathBuf;

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::commands::list::require_catalog;
use crate::cli::helpers::open_workspace;
use crate::cli::GlobalOpts;
use crate::core::export::export_csv;

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Write to this file instead of stdout
    #[arg(long, short = 'O')]
    pub out: Option<PathBuf>,
}

pub fn run(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = open_workspace(global)?;
    require_catalog(&mut ws)?;

    let text = export_csv(ws.catalog(), ws.counts()).into_diagnostic()?;
    match args.out {
        Some(path) => {
            fs::write(&path, text)
                .map_err(|e| miette::miette!("Cannot write {}: {}", path.display(), e))?;
            eprintln!(
                "{} Exported {} items to {}",
                style("✓").green(),
                ws.catalog().len(),
                style(path.display()).yellow()
            );
        }
        None => print!("{}", text),
    }
    Ok(())
}
