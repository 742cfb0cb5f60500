//! Report rendering using Tera

use std::collections::HashMap;

use rust_embed::Embed;
use tera::Tera;
use thiserror::Error;

use crate::core::number::format_money;
use crate::report::ReportSnapshot;

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

/// Name of the embedded report template
pub const REPORT_TEMPLATE: &str = "report.md.tera";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid report template: {0}")]
    Template(String),

    #[error("Report rendering error: {0}")]
    Render(String),
}

/// Markdown report renderer
pub struct ReportRenderer {
    tera: Tera,
}

impl ReportRenderer {
    /// Create a renderer with the embedded templates
    pub fn new() -> Result<Self, ReportError> {
        let mut tera = Tera::default();

        for file in EmbeddedTemplates::iter() {
            let filename = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(filename) {
                if let Ok(template_str) = std::str::from_utf8(&content.data) {
                    tera.add_raw_template(filename, template_str)
                        .map_err(|e| ReportError::Template(e.to_string()))?;
                }
            }
        }
        tera.register_filter("money", money_filter);

        Ok(Self { tera })
    }

    /// Render a snapshot as Markdown
    pub fn render(&self, snapshot: &ReportSnapshot) -> Result<String, ReportError> {
        if !self.tera.get_template_names().any(|n| n == REPORT_TEMPLATE) {
            return Ok(hardcoded_report(snapshot));
        }

        let mut context = tera::Context::from_serialize(snapshot)
            .map_err(|e| ReportError::Render(e.to_string()))?;
        context.insert("generated", &generated_label(snapshot));
        context.insert("progress", &progress_label(snapshot));

        self.tera
            .render(REPORT_TEMPLATE, &context)
            .map_err(|e| ReportError::Render(e.to_string()))
    }
}

fn money_filter(value: &tera::Value, _: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
    let n = value
        .as_f64()
        .ok_or_else(|| tera::Error::msg("money filter expects a number"))?;
    Ok(tera::Value::String(format_money(n)))
}

fn generated_label(snapshot: &ReportSnapshot) -> String {
    snapshot.generated_at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn progress_label(snapshot: &ReportSnapshot) -> String {
    format!("{:.1}%", snapshot.aggregate.progress() * 100.0).replace('.', ",")
}

fn hardcoded_report(snapshot: &ReportSnapshot) -> String {
    let agg = &snapshot.aggregate;
    let mut out = String::from("# Inventory count report\n\n");

    if !snapshot.unit.is_empty() {
        out.push_str(&format!("- **Unit:** {}\n", snapshot.unit));
    }
    if !snapshot.responsible.is_empty() {
        out.push_str(&format!("- **Responsible:** {}\n", snapshot.responsible));
    }
    if let Some(source) = &snapshot.source_name {
        out.push_str(&format!("- **Source:** {}\n", source));
    }
    out.push_str(&format!("- **Generated:** {}\n\n", generated_label(snapshot)));

    out.push_str(&format!(
        "## Summary\n\n\
         - Items: {}\n- Counted: {} ({})\n- Missing: {}\n- OK: {}\n- Divergent: {}\n\
         - Net impact: {}\n- Absolute impact: {}\n\n",
        agg.total,
        agg.counted,
        progress_label(snapshot),
        agg.missing,
        agg.ok,
        agg.divergent,
        format_money(agg.net_impact),
        format_money(agg.abs_impact),
    ));

    out.push_str("## Largest divergences\n\n");
    if snapshot.divergences.is_empty() {
        out.push_str("No divergences.\n");
    } else {
        for line in &snapshot.divergences {
            out.push_str(&format!(
                "- {} {}: system {}, counted {}, diff {:+}, impact {}\n",
                line.code,
                line.name,
                line.system_qty,
                line.counted,
                line.diff,
                format_money(line.impact),
            ));
        }
    }

    out.push_str("\n## Counters\n\n");
    for user in &snapshot.users {
        out.push_str(&format!(
            "- {}: {} items, {} divergent, {}\n",
            user.user,
            user.rollup.items,
            user.rollup.divergent,
            format_money(user.rollup.abs_impact),
        ));
    }
    out
}
