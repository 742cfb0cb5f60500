//! `tally count` command - Record a physical count
//!
//! A reference that is counted successfully becomes the selection, so a run
//! of counts on the same item can omit it. Without a quantity the value is
//! prompted for on a terminal, or read from the first line of piped stdin.

use console::style;
use dialoguer::{theme::ColorfulTheme, Input};
use miette::{IntoDiagnostic, Result};

use crate::cli::commands::list::require_catalog;
use crate::cli::helpers::{format_diff, is_interactive, open_workspace, read_stdin_line, styled_status};
use crate::cli::output::print_json;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::number::format_money;
use crate::core::workspace::SaveError;

#[derive(clap::Args, Debug)]
pub struct CountArgs {
    /// Item reference (@N, product code, access code or key); defaults to the selection
    pub reference: Option<String>,

    /// Counted quantity ("12", "1.929,00")
    #[arg(allow_negative_numbers = true)]
    pub quantity: Option<String>,
}

pub fn run(args: CountArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = open_workspace(global)?;
    require_catalog(&mut ws)?;

    let item = match &args.reference {
        Some(reference) => ws
            .lookup(reference)
            .map(|(item, _)| item.clone())
            .ok_or_else(|| miette::miette!("{}", SaveError::UnknownItem(reference.trim().to_string())))?,
        None => ws
            .selected_item()
            .cloned()
            .ok_or_else(|| miette::miette!("{}", SaveError::NoSelection))?,
    };

    let raw = match args.quantity {
        Some(q) => q,
        None if is_interactive() => Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Counted quantity for {} (system {})", item.name, item.system_qty))
            .allow_empty(true)
            .interact_text()
            .into_diagnostic()?,
        None => read_stdin_line().unwrap_or_default(),
    };

    let saved = ws.save_count(args.reference.as_deref(), &raw).into_diagnostic()?;
    if let Some(reference) = &args.reference {
        ws.select(reference).into_diagnostic()?;
    }

    if global.output == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "key": saved.key,
            "counted": saved.observation.counted,
            "user": saved.observation.user,
            "ts": saved.observation.ts,
            "diff": saved.metric.diff,
            "impact": saved.metric.impact,
            "status": saved.metric.status,
            "category": saved.metric.category,
        }));
    }

    println!(
        "{} {} {}: counted {} (system {}, diff {}, impact {}) {}",
        style("✓").green(),
        style(&saved.key).cyan(),
        item.name,
        style(saved.observation.counted).bold(),
        item.system_qty,
        saved.metric.diff.map(format_diff).unwrap_or_default(),
        saved.metric.impact.map(format_money).unwrap_or_default(),
        styled_status(saved.metric.status)
    );
    Ok(())
}
