//! `tally reset` command - Remove every count

use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{is_interactive, open_workspace};
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct ResetArgs {
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn run(args: ResetArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = open_workspace(global)?;
    let counted = ws.counts().observations().count();

    if !args.yes {
        if !is_interactive() {
            return Err(miette::miette!(
                "Refusing to clear {} count(s) without confirmation; pass --yes",
                counted
            ));
        }
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Clear all {} count(s)?", counted))
            .default(false)
            .interact()
            .into_diagnostic()?;
        if !confirmed {
            println!("Nothing cleared.");
            return Ok(());
        }
    }

    ws.clear_all().into_diagnostic()?;
    println!("{} Cleared {} count(s)", style("✓").green(), style(counted).cyan());
    Ok(())
}
