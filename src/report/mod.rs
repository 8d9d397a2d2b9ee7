//! Report generation with multiple output formats
//!
//! Architecture: Anti-Corruption Layer - Formatters translate domain objects to external formats
//! - ValidationReport (domain) is converted to various external representations
//! - Every format lists violations in report order
//! - The compiler format is the plain `<file>:[<line>,<column>] <message>` diagnostic stream

use crate::domain::violations::{GuardianError, GuardianResult, Severity, ValidationReport, Violation};
use serde_json::Value as JsonValue;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// Supported output formats for validation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable format grouped by file
    Human,
    /// JSON format for programmatic consumption
    Json,
    /// One diagnostic line per violation, as a compiler prints them
    Compiler,
    /// SARIF format for code scanning tools
    Sarif,
    /// GitHub Actions workflow commands
    GitHub,
}

impl OutputFormat {
    /// Get all available format names
    pub fn all_formats() -> &'static [&'static str] {
        &["human", "json", "compiler", "sarif", "github"]
    }
}

impl FromStr for OutputFormat {
    type Err = GuardianError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "compiler" => Ok(Self::Compiler),
            "sarif" => Ok(Self::Sarif),
            "github" => Ok(Self::GitHub),
            other => Err(GuardianError::config(format!(
                "Unknown output format '{other}', expected one of: {}",
                Self::all_formats().join(", ")
            ))),
        }
    }
}

/// Options for customizing report output
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Whether to use colored output (for human format)
    pub use_colors: bool,
    /// Whether to show violation suggestions
    pub show_suggestions: bool,
    /// Maximum number of violations to include
    pub max_violations: Option<usize>,
    /// Minimum severity level to include
    pub min_severity: Option<Severity>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            use_colors: true,
            show_suggestions: true,
            max_violations: None,
            min_severity: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Style {
    Bold,
    Dim,
    Red,
    Yellow,
    Cyan,
    Green,
}

impl Style {
    #[cfg(feature = "colors")]
    fn apply(self, text: &str) -> String {
        use colored::Colorize;
        match self {
            Self::Bold => text.bold().to_string(),
            Self::Dim => text.dimmed().to_string(),
            Self::Red => text.red().to_string(),
            Self::Yellow => text.yellow().to_string(),
            Self::Cyan => text.cyan().to_string(),
            Self::Green => text.green().to_string(),
        }
    }

    #[cfg(not(feature = "colors"))]
    fn apply(self, text: &str) -> String {
        text.to_string()
    }

    fn for_severity(severity: Severity) -> Self {
        match severity {
            Severity::Error => Self::Red,
            Severity::Warning => Self::Yellow,
            Severity::Info => Self::Cyan,
        }
    }
}

/// Main report formatter that dispatches to specific formatters
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    /// Create a new report formatter with options
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    /// Format a validation report in the specified format
    pub fn format_report(&self, report: &ValidationReport, format: OutputFormat) -> GuardianResult<String> {
        let filtered_violations = self.filter_violations(&report.violations);

        match format {
            OutputFormat::Human => Ok(self.format_human(report, &filtered_violations)),
            OutputFormat::Json => self.format_json(report, &filtered_violations),
            OutputFormat::Compiler => Ok(self.format_compiler(&filtered_violations)),
            OutputFormat::Sarif => self.format_sarif(&filtered_violations),
            OutputFormat::GitHub => Ok(self.format_github(&filtered_violations)),
        }
    }

    /// Write a formatted report to a writer
    pub fn write_report<W: Write>(
        &self,
        report: &ValidationReport,
        format: OutputFormat,
        mut writer: W,
    ) -> GuardianResult<()> {
        let formatted = self.format_report(report, format)?;
        writer.write_all(formatted.as_bytes())?;
        Ok(())
    }

    /// Filter violations based on report options, keeping their order
    fn filter_violations<'a>(&self, violations: &'a [Violation]) -> Vec<&'a Violation> {
        let mut filtered: Vec<&Violation> = violations
            .iter()
            .filter(|v| match self.options.min_severity {
                Some(min_severity) => v.severity >= min_severity,
                None => true,
            })
            .collect();

        if let Some(max) = self.options.max_violations {
            filtered.truncate(max);
        }

        filtered
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if !self.options.use_colors {
            return text.to_string();
        }

        style.apply(text)
    }

    /// Format report in human-readable format
    fn format_human(&self, report: &ValidationReport, violations: &[&Violation]) -> String {
        let mut output = String::new();

        if violations.is_empty() {
            output.push_str(&self.paint("No transactional boundary violations found", Style::Green));
            output.push('\n');
        } else {
            let header_style = if report.has_errors() { Style::Red } else { Style::Yellow };
            output.push_str(&self.paint("Transactional Boundary Violations Found", header_style));
            output.push_str("\n\n");

            for (file_path, file_violations) in group_by_file(violations) {
                output.push_str(&self.paint(&file_path.display().to_string(), Style::Bold));
                output.push('\n');

                for violation in file_violations {
                    let position = violation
                        .position()
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "[?,?]".to_string());

                    output.push_str(&format!(
                        "  {} [{}] {}\n",
                        self.paint(&position, Style::Dim),
                        self.paint(violation.severity.as_str(), Style::for_severity(violation.severity)),
                        violation.message
                    ));

                    if self.options.show_suggestions {
                        if let Some(suggestion) = &violation.suggested_fix {
                            output.push_str(&format!("    {}\n", self.paint(suggestion, Style::Green)));
                        }
                    }
                }

                output.push('\n');
            }
        }

        output.push_str(&self.format_summary(report));
        output
    }

    /// Format report in JSON format
    fn format_json(&self, report: &ValidationReport, violations: &[&Violation]) -> GuardianResult<String> {
        let json_violations: Vec<JsonValue> = violations
            .iter()
            .map(|v| {
                serde_json::json!({
                    "rule_id": v.rule_id,
                    "severity": v.severity.as_str(),
                    "file_path": v.file_path.display().to_string(),
                    "class_name": v.class_name,
                    "field_name": v.field_name,
                    "line_number": v.line_number,
                    "column_number": v.column_number,
                    "message": v.message,
                    "diagnostic": v.format_diagnostic(),
                    "suggested_fix": v.suggested_fix,
                    "detected_at": v.detected_at.to_rfc3339()
                })
            })
            .collect();

        let json_report = serde_json::json!({
            "violations": json_violations,
            "summary": {
                "models_analyzed": report.summary.models_analyzed,
                "classes_inspected": report.summary.classes_inspected,
                "classes_exempt": report.summary.classes_exempt,
                "violations_by_severity": {
                    "error": report.summary.violations_by_severity.error,
                    "warning": report.summary.violations_by_severity.warning,
                    "info": report.summary.violations_by_severity.info
                },
                "execution_time_ms": report.summary.execution_time_ms,
                "validated_at": report.summary.validated_at.to_rfc3339()
            },
            "config_fingerprint": report.config_fingerprint
        });

        serde_json::to_string_pretty(&json_report)
            .map_err(|e| GuardianError::config(format!("JSON serialization failed: {e}")))
    }

    /// One diagnostic per line, nothing else
    fn format_compiler(&self, violations: &[&Violation]) -> String {
        violations
            .iter()
            .map(|v| format!("{}\n", v.format_diagnostic()))
            .collect()
    }

    /// Format report in SARIF format
    fn format_sarif(&self, violations: &[&Violation]) -> GuardianResult<String> {
        let sarif_results: Vec<JsonValue> = violations
            .iter()
            .map(|v| {
                let level = match v.severity {
                    Severity::Error => "error",
                    Severity::Warning => "warning",
                    Severity::Info => "note",
                };

                let mut location = serde_json::json!({
                    "artifactLocation": {
                        "uri": v.file_path.display().to_string()
                    }
                });
                if let Some(position) = v.position() {
                    location["region"] = serde_json::json!({
                        "startLine": position.line,
                        "startColumn": position.column
                    });
                }

                serde_json::json!({
                    "ruleId": v.rule_id,
                    "level": level,
                    "message": {
                        "text": v.message
                    },
                    "locations": [{
                        "physicalLocation": location,
                        "logicalLocations": [{
                            "fullyQualifiedName": format!("{}.{}", v.class_name, v.field_name),
                            "kind": "member"
                        }]
                    }]
                })
            })
            .collect();

        let sarif_report = serde_json::json!({
            "version": "2.1.0",
            "$schema": "https://json.schemastore.org/sarif-2.1.0.json",
            "runs": [{
                "tool": {
                    "driver": {
                        "name": "tx-guardian",
                        "version": env!("CARGO_PKG_VERSION"),
                        "informationUri": "https://github.com/cloudfunnels/tx-guardian"
                    }
                },
                "results": sarif_results
            }]
        });

        serde_json::to_string_pretty(&sarif_report)
            .map_err(|e| GuardianError::config(format!("SARIF serialization failed: {e}")))
    }

    /// Format report for GitHub Actions
    fn format_github(&self, violations: &[&Violation]) -> String {
        let mut output = String::new();

        for violation in violations {
            let level = match violation.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Info => "notice",
            };

            let position_part = violation
                .position()
                .map(|p| format!(",line={},col={}", p.line, p.column))
                .unwrap_or_default();

            output.push_str(&format!(
                "::{} file={}{},title={}::{}\n",
                level,
                violation.file_path.display(),
                position_part,
                violation.rule_id,
                violation.message
            ));
        }

        output
    }

    /// Format the summary section
    fn format_summary(&self, report: &ValidationReport) -> String {
        let counts = &report.summary.violations_by_severity;
        let execution_time = (report.summary.execution_time_ms as f64) / 1000.0;

        let mut parts = Vec::new();
        if counts.error > 0 {
            let text = format!("{} error{}", counts.error, plural(counts.error));
            parts.push(self.paint(&text, Style::Red));
        }
        if counts.warning > 0 {
            let text = format!("{} warning{}", counts.warning, plural(counts.warning));
            parts.push(self.paint(&text, Style::Yellow));
        }
        if counts.info > 0 {
            parts.push(self.paint(&format!("{} info", counts.info), Style::Cyan));
        }
        if parts.is_empty() {
            parts.push(self.paint("0 violations", Style::Green));
        }

        format!(
            "{} {} in {} model{}, {} class{} inspected, {} exempt ({:.1}s)\n",
            self.paint("Summary:", Style::Bold),
            parts.join(", "),
            report.summary.models_analyzed,
            plural(report.summary.models_analyzed),
            report.summary.classes_inspected,
            if report.summary.classes_inspected == 1 { "" } else { "es" },
            report.summary.classes_exempt,
            execution_time
        )
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Group violations by file, files in order of first appearance
fn group_by_file<'a>(violations: &[&'a Violation]) -> Vec<(&'a Path, Vec<&'a Violation>)> {
    let mut groups: Vec<(&Path, Vec<&Violation>)> = Vec::new();

    for &violation in violations {
        let file_path = violation.file_path.as_path();
        match groups.iter_mut().find(|(path, _)| *path == file_path) {
            Some((_, group)) => group.push(violation),
            None => groups.push((file_path, vec![violation])),
        }
    }

    groups
}
