//! Output formatting and reporting

use colored::*;
use prodcmpt_core::{CmptReport, FixReport, Message, ProductCmptDelta, Severity};
use serde::Serialize;

use crate::OutputFormat;

/// Summary statistics of a check run
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckSummary {
    pub cmpts_checked: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
}

impl CheckSummary {
    pub fn from_reports(cmpts_checked: usize, reports: &[CmptReport]) -> Self {
        let mut summary = Self {
            cmpts_checked,
            ..Self::default()
        };
        for message in reports.iter().flat_map(|r| r.messages.iter()) {
            match message.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Info => summary.info += 1,
            }
        }
        summary
    }

    pub fn total_issues(&self) -> usize {
        self.errors + self.warnings + self.info
    }
}

/// Summary statistics of a delta run
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeltaSummary {
    pub cmpts_compared: usize,
    pub cmpts_with_delta: usize,
    pub entries: usize,
    pub entries_fixed: usize,
    pub cmpts_saved: usize,
}

/// Output formatter for the supported formats
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn print_check(&self, reports: &[CmptReport], summary: &CheckSummary) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Human => {
                for report in reports {
                    println!("{}", report.cmpt.bold());
                    for message in report.messages.iter() {
                        print_message(message);
                    }
                }
                print_check_summary(summary);
                Ok(())
            }
            OutputFormat::Json => print_json(&serde_json::json!({
                "components": reports,
                "summary": summary,
            })),
        }
    }

    pub fn print_delta(
        &self,
        deltas: &[ProductCmptDelta],
        fixes: &[(String, FixReport)],
        summary: &DeltaSummary,
    ) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Human => {
                for delta in deltas {
                    print!("{delta}");
                }
                for (cmpt, report) in fixes {
                    println!(
                        "{} {cmpt}: {} entries fixed, {} skipped",
                        "fixed".green(),
                        report.fixed,
                        report.skipped
                    );
                }
                print_delta_summary(summary);
                Ok(())
            }
            OutputFormat::Json => {
                let components: Vec<serde_json::Value> = deltas
                    .iter()
                    .map(|delta| {
                        let entries: Vec<serde_json::Value> = delta
                            .entries()
                            .map(|entry| {
                                serde_json::json!({
                                    "id": entry.id,
                                    "container": delta_label(delta, entry.container),
                                    "type": entry.delta_type.as_str(),
                                    "part": entry.part_name,
                                    "valueType": entry.value_type.map(|t| t.to_string()),
                                    "predecessor": entry.predecessor,
                                    "description": entry.description,
                                })
                            })
                            .collect();
                        serde_json::json!({ "component": delta.cmpt, "entries": entries })
                    })
                    .collect();
                print_json(&serde_json::json!({
                    "components": components,
                    "summary": summary,
                }))
            }
        }
    }
}

fn delta_label(delta: &ProductCmptDelta, container: prodcmpt_core::ContainerId) -> &str {
    match container {
        prodcmpt_core::ContainerId::Cmpt => &delta.root.label,
        prodcmpt_core::ContainerId::Generation(index) => delta
            .generations
            .get(index)
            .map_or(delta.root.label.as_str(), |g| g.label.as_str()),
    }
}

fn print_message(message: &Message) {
    let severity = match message.severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warning".yellow().bold(),
        Severity::Info => "info".blue().bold(),
    };
    println!("  {severity} {}: {}", message.code.dimmed(), message.text);
    for property in &message.invalid_properties {
        println!("    at {property}");
    }
}

fn print_check_summary(summary: &CheckSummary) {
    println!("\n{}", "Summary:".bold());
    println!("  Components checked: {}", summary.cmpts_checked);
    if summary.total_issues() == 0 {
        println!("  {}", "No issues found".green());
        return;
    }
    if summary.errors > 0 {
        println!("  Errors: {}", summary.errors.to_string().red());
    }
    if summary.warnings > 0 {
        println!("  Warnings: {}", summary.warnings.to_string().yellow());
    }
    if summary.info > 0 {
        println!("  Info: {}", summary.info.to_string().blue());
    }
}

fn print_delta_summary(summary: &DeltaSummary) {
    println!("\n{}", "Summary:".bold());
    println!("  Components compared: {}", summary.cmpts_compared);
    if summary.entries == 0 {
        println!("  {}", "No differences found".green());
        return;
    }
    println!(
        "  Differences: {} in {} components",
        summary.entries.to_string().yellow(),
        summary.cmpts_with_delta
    );
    if summary.entries_fixed > 0 {
        println!(
            "  Fixed: {} entries, {} components written",
            summary.entries_fixed.to_string().green(),
            summary.cmpts_saved
        );
    }
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
