//! `tally report` command - Render the reconciliation report

use std::fs;
use std::path::PathBuf;

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::open_workspace;
use crate::cli::output::print_json;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::report::{ReportRenderer, ReportSnapshot, DEFAULT_TOP};

#[derive(clap::Args, Debug)]
pub struct ReportArgs {
    /// Write to this file instead of stdout
    #[arg(long, short = 'O')]
    pub out: Option<PathBuf>,

    /// Number of divergences listed
    #[arg(long, default_value_t = DEFAULT_TOP)]
    pub top: usize,
}

pub fn run(args: ReportArgs, global: &GlobalOpts) -> Result<()> {
    let ws = open_workspace(global)?;
    let snapshot = ReportSnapshot::from_workspace(&ws, args.top);

    if global.output == OutputFormat::Json && args.out.is_none() {
        return print_json(&snapshot);
    }

    let text = ReportRenderer::new()
        .and_then(|renderer| renderer.render(&snapshot))
        .into_diagnostic()?;
    match args.out {
        Some(path) => {
            fs::write(&path, text)
                .map_err(|e| miette::miette!("Cannot write {}: {}", path.display(), e))?;
            eprintln!("{} Report written to {}", style("✓").green(), style(path.display()).yellow());
        }
        None => print!("{}", text),
    }
    Ok(())
}
