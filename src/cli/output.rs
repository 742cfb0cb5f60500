//! Output formatting utilities

use std::io::IsTerminal;

use crate::cli::OutputFormat;

/// Determine the effective output format based on context
///
/// Lists piped to another program default to TSV; everything else to a
/// table.
pub fn effective_format(format: OutputFormat, is_list: bool) -> OutputFormat {
    match format {
        OutputFormat::Auto => {
            if is_list && !std::io::stdout().is_terminal() {
                OutputFormat::Tsv
            } else {
                OutputFormat::Table
            }
        }
        other => other,
    }
}

/// Print a value as pretty JSON
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> miette::Result<()> {
    use miette::IntoDiagnostic;
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}
