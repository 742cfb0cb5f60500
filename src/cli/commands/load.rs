//! `tally load` command - Load a stock export

use std::io::Read;
use std::path::PathBuf;

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::open_workspace;
use crate::cli::output::print_json;
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct LoadArgs {
    /// Semicolon-delimited stock export ("-" reads stdin)
    pub file: PathBuf,

    /// Name recorded for the source (defaults to the file name)
    #[arg(long)]
    pub name: Option<String>,
}

pub fn run(args: LoadArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = open_workspace(global)?;
    let result = if args.file.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf).into_diagnostic()?;
        let name = args.name.as_deref().unwrap_or("stdin");
        ws.load_source(&String::from_utf8_lossy(&buf), name)
    } else {
        ws.load_file(&args.file, args.name.as_deref())
    };
    let report = result.map_err(|e| miette::miette!("Load failed, nothing was changed: {}", e))?;
    let source_name = ws.meta().map(|m| m.source_name).unwrap_or_default();

    if global.output == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "source": source_name,
            "items": report.items,
            "skipped": report.skipped,
            "signature": report.signature,
            "signature_changed": report.signature_changed,
            "selection_cleared": report.selection_cleared,
        }));
    }

    println!(
        "{} Loaded {} items from {}",
        style("✓").green(),
        style(report.items).cyan(),
        style(&source_name).yellow()
    );
    if report.skipped > 0 {
        println!("   {} blank or total rows skipped", style(report.skipped).dim());
    }
    if report.signature_changed {
        println!(
            "{} This file differs from the one the existing counts were recorded against.",
            style("!").yellow().bold()
        );
        println!(
            "   Run {} to start over if this is a new count.",
            style("tally reset").cyan()
        );
    }
    if report.selection_cleared {
        println!("   The selected item is not in this file; selection cleared.");
    }
    Ok(())
}
