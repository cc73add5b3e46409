//! Output formatting for CLI commands.
//!
//! This module renders analysis results, configurations and validation
//! reports as text or JSON. It only decides how things are drawn; ordering,
//! grouping and masking were settled by the analysis.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::analysis::{
    AnalysisResult, ChangeAction, PropertyChange, ReplacementType, ResourceAnalysis, RiskLevel,
    Value, SENSITIVE_PLACEHOLDER, UNKNOWN_PLACEHOLDER,
};
use crate::config::{AnalyzerConfig, ValidationResult};
use crate::plan::Action;

use super::commands::OutputFormat;

/// Longest address shown in a table cell.
const MAX_ADDRESS_WIDTH: usize = 60;

/// Longest value shown in an expanded property line.
const MAX_VALUE_WIDTH: usize = 80;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Resource row for table display.
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Resource")]
    address: String,
    #[tabled(rename = "Replace")]
    replacement: String,
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "Changes")]
    changes: String,
}

/// JSON envelope for an analysis.
#[derive(Serialize)]
struct AnalysisJson<'a> {
    config_hash: &'a str,
    #[serde(flatten)]
    result: &'a AnalysisResult,
}

/// JSON envelope for a configuration.
#[derive(Serialize)]
struct ConfigJson<'a> {
    config_hash: &'a str,
    config: &'a AnalyzerConfig,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats an analysis result for display.
    ///
    /// Property changes are listed for every resource when `detailed` is set,
    /// and for dangerous resources when the result asks for auto-expansion.
    #[must_use]
    pub fn format_analysis(&self, result: &AnalysisResult, config_hash: &str, detailed: bool) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&AnalysisJson { config_hash, result }).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_analysis_text(result, config_hash, detailed),
        }
    }

    /// Formats an analysis as text.
    fn format_analysis_text(result: &AnalysisResult, config_hash: &str, detailed: bool) -> String {
        let mut output = String::new();
        let stats = &result.statistics;

        let _ = write!(output, "\nPlan Analysis\n");
        let _ = write!(output, "   Config hash: {}\n\n", short(config_hash));

        if stats.changed() == 0 {
            let _ = writeln!(
                output,
                "{} No changes. Infrastructure matches the configuration.",
                "✓".green()
            );
        } else if result.group_by_provider {
            for group in &result.provider_groups {
                let _ = writeln!(
                    output,
                    "{} ({} resources)",
                    group.provider.bold(),
                    group.indices.len()
                );
                let resources = group.indices.iter().filter_map(|&i| result.per_resource.get(i));
                output.push_str(&Self::resource_table(resources));
                output.push_str("\n\n");
            }
        } else {
            let changed = result.per_resource.iter().filter(|r| r.action.is_change());
            output.push_str(&Self::resource_table(changed));
            output.push('\n');
        }

        // Dangerous resources
        let dangerous: Vec<&ResourceAnalysis> = result.dangerous().collect();
        if !dangerous.is_empty() {
            let _ = write!(output, "\n{} Dangerous changes:\n", "⚠".yellow());
            for resource in &dangerous {
                let _ = writeln!(
                    output,
                    "   - {} [{}]: {}",
                    resource.address,
                    Self::format_risk(resource.risk_level),
                    resource.danger_reason
                );
            }
        }

        // Property details
        let expanded: Vec<&ResourceAnalysis> = result
            .per_resource
            .iter()
            .filter(|r| r.action.is_change())
            .filter(|r| detailed || (result.auto_expand_dangerous && r.is_dangerous))
            .collect();
        if !expanded.is_empty() {
            output.push_str("\nProperty changes:\n");
            for resource in expanded {
                Self::write_property_changes(&mut output, resource);
            }
        }

        // Skipped resources
        if !result.warnings.is_empty() {
            let _ = write!(output, "\n{} Skipped resources:\n", "⚠".yellow());
            for warning in &result.warnings {
                let _ = writeln!(output, "   - {warning}");
            }
        }

        // Summary
        let _ = write!(
            output,
            "\nPlan: {} to add, {} to change, {} to destroy",
            stats.added.to_string().green(),
            stats.modified.to_string().yellow(),
            stats.removed.to_string().red()
        );
        if stats.replacements > 0 {
            let _ = write!(
                output,
                " ({} replacements, {} conditional)",
                stats.replacements, stats.conditionals
            );
        }
        let _ = writeln!(output, ".");
        if stats.high_risk > 0 {
            let _ = writeln!(
                output,
                "{} {} dangerous resource(s) need review.",
                "⚠".yellow(),
                stats.high_risk.to_string().red().bold()
            );
        }

        output
    }

    /// Builds a table for the given resources.
    fn resource_table<'r>(resources: impl Iterator<Item = &'r ResourceAnalysis>) -> String {
        let rows: Vec<ResourceRow> = resources
            .map(|r| ResourceRow {
                action: Self::format_action(r.action),
                address: truncate(&r.address, MAX_ADDRESS_WIDTH),
                replacement: Self::format_replacement(r.replacement_type),
                risk: Self::format_risk(r.risk_level),
                changes: if r.property_changes.truncated {
                    format!("{} (truncated)", r.property_changes.count)
                } else {
                    r.property_changes.count.to_string()
                },
            })
            .collect();

        Table::new(rows).to_string()
    }

    /// Writes the captured property changes of one resource.
    fn write_property_changes(output: &mut String, resource: &ResourceAnalysis) {
        let _ = writeln!(output, "\n   {} {}", Self::format_action(resource.action), resource.address);

        let analysis = &resource.property_changes;
        if analysis.changes.is_empty() && analysis.count == 0 {
            let _ = writeln!(output, "       {}", "(no attribute changes)".dimmed());
            return;
        }

        for change in &analysis.changes {
            let _ = writeln!(output, "       {}", Self::format_change(change));
        }

        let hidden = analysis.count.saturating_sub(analysis.changes.len());
        if hidden > 0 {
            let _ = writeln!(
                output,
                "       {}",
                format!("... {hidden} more change(s) not shown").dimmed()
            );
        }
    }

    /// Formats one property change line.
    fn format_change(change: &PropertyChange) -> String {
        let before = format_value(&change.before);
        let after = format_value(&change.after);
        match change.action {
            ChangeAction::Add => format!("{} {} = {after}", "+".green(), change.path),
            ChangeAction::Remove => format!("{} {} = {before}", "-".red(), change.path),
            ChangeAction::Update => format!("{} {}: {before} => {after}", "~".yellow(), change.path),
        }
    }

    /// Formats a validation report.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult, show_warnings: bool) -> String {
        match self.format {
            OutputFormat::Json => {
                let errors: Vec<String> = result.errors.iter().map(ToString::to_string).collect();
                let json = serde_json::json!({
                    "valid": result.is_valid(),
                    "errors": errors,
                    "warnings": result.warnings,
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = if result.is_valid() {
                    format!("{} Configuration is valid.\n", "✓".green())
                } else {
                    let mut text = format!("{} Configuration is invalid:\n", "✗".red());
                    for error in &result.errors {
                        let _ = writeln!(text, "   - {error}");
                    }
                    text
                };

                if result.warning_count() > 0 {
                    if show_warnings {
                        let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                        for warning in &result.warnings {
                            let _ = writeln!(output, "   - {warning}");
                        }
                    } else {
                        let _ = writeln!(
                            output,
                            "   {} warning(s); use --warnings to show them.",
                            result.warning_count()
                        );
                    }
                }

                output
            }
        }
    }

    /// Formats the effective configuration.
    #[must_use]
    pub fn format_config(&self, config: &AnalyzerConfig, config_hash: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&ConfigJson { config_hash, config }).unwrap_or_default()
            }
            OutputFormat::Text => {
                let yaml = serde_yaml::to_string(config).unwrap_or_default();
                format!("# Config hash: {config_hash}\n{yaml}")
            }
        }
    }

    /// Formats an action with color.
    fn format_action(action: Action) -> String {
        match action {
            Action::Create => "+create".green().to_string(),
            Action::Update => "~update".yellow().to_string(),
            Action::Replace => "-/+replace".magenta().to_string(),
            Action::Delete => "-delete".red().to_string(),
            Action::Read => "read".dimmed().to_string(),
            Action::NoOp => "no-op".dimmed().to_string(),
        }
    }

    /// Formats a risk level with color.
    fn format_risk(risk: RiskLevel) -> String {
        match risk {
            RiskLevel::Critical => "critical".red().bold().to_string(),
            RiskLevel::High => "high".red().to_string(),
            RiskLevel::Medium => "medium".yellow().to_string(),
            RiskLevel::Low => "low".green().to_string(),
        }
    }

    /// Formats a replacement classification.
    fn format_replacement(replacement: ReplacementType) -> String {
        match replacement {
            ReplacementType::Always => "yes".red().to_string(),
            ReplacementType::Conditional => "maybe".yellow().to_string(),
            ReplacementType::Never => "-".dimmed().to_string(),
        }
    }
}

/// Renders a captured value for a property line.
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".dimmed().to_string(),
        Value::String(s) if s == SENSITIVE_PLACEHOLDER || s == UNKNOWN_PLACEHOLDER => s.dimmed().to_string(),
        other => truncate(&other.render(), MAX_VALUE_WIDTH),
    }
}

/// First 8 characters of a hash.
fn short(hash: &str) -> &str {
    hash.char_indices().nth(8).map_or(hash, |(idx, _)| &hash[..idx])
}

/// Truncates a string to a maximum number of characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
