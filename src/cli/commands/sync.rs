//! `tally sync` command - Exchange counts with other devices
//!
//! Devices counting the same unit on the same day share one session
//! document in the sync directory. Every `tally count` already publishes
//! its write; `push` republishes everything and `pull` merges what others
//! have written.

use chrono::Local;
use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{open_workspace, resolve_config};
use crate::cli::output::print_json;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::sync::{FileChannel, SyncChannel};

#[derive(Subcommand, Debug)]
pub enum SyncCommands {
    /// Publish every local count and the session header
    Push,

    /// Merge counts published by other devices
    Pull,

    /// Show the session and sync location
    Status,
}

pub fn run(cmd: SyncCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SyncCommands::Push => run_push(global),
        SyncCommands::Pull => run_pull(global),
        SyncCommands::Status => run_status(global),
    }
}

fn run_push(global: &GlobalOpts) -> Result<()> {
    let mut ws = open_workspace(global)?;
    let published = ws.push().into_diagnostic()?;

    if global.output == OutputFormat::Json {
        return print_json(&serde_json::json!({ "published": published }));
    }
    println!(
        "{} Published {} count(s) to session {}",
        style("✓").green(),
        style(published).cyan(),
        style(ws.session_id(Local::now().date_naive())).yellow()
    );
    Ok(())
}

fn run_pull(global: &GlobalOpts) -> Result<()> {
    let mut ws = open_workspace(global)?;
    let outcome = ws.pull().into_diagnostic()?;

    if global.output == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "applied": outcome.applied,
            "changed": outcome.changed,
            "stale": outcome.stale,
            "malformed": outcome.malformed,
        }));
    }
    println!(
        "{} Merged {} remote count(s), {} changed",
        style("✓").green(),
        style(outcome.applied).cyan(),
        style(outcome.changed).cyan()
    );
    if outcome.stale > 0 {
        println!("   {} older than local counts, ignored", style(outcome.stale).dim());
    }
    if outcome.malformed > 0 {
        println!("   {} malformed, skipped", style(outcome.malformed).yellow());
    }
    Ok(())
}

fn run_status(global: &GlobalOpts) -> Result<()> {
    let config = resolve_config(global);
    let ws = open_workspace(global)?;
    let session = ws.session_id(Local::now().date_naive());
    let local = ws.counts().observations().count();

    let channel = config.sync_dir.as_ref().map(|dir| FileChannel::new(dir, &session));
    let remote = match &channel {
        Some(channel) => Some(
            channel
                .fetch()
                .into_diagnostic()?
                .as_object()
                .map_or(0, |counts| counts.len()),
        ),
        None => None,
    };

    if global.output == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "session": session,
            "user": ws.user(),
            "path": channel.as_ref().map(|c| c.path().display().to_string()),
            "local_counts": local,
            "remote_counts": remote,
        }));
    }

    println!("{}: {}", style("Session").bold(), style(&session).yellow());
    println!("{}: {}", style("User").bold(), ws.user());
    match &channel {
        Some(channel) => println!("{}: {}", style("Document").bold(), channel.path().display()),
        None => println!(
            "{}: not configured (set {} or sync_dir in config)",
            style("Document").bold(),
            style("TALLY_SYNC_DIR").cyan()
        ),
    }
    println!("{}: {}", style("Local counts").bold(), local);
    if let Some(remote) = remote {
        println!("{}: {}", style("Remote counts").bold(), remote);
    }
    Ok(())
}
