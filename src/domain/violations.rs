//! Core domain models for transactional violations and validation results
//!
//! Architecture: Rich Domain Models - Violations are values with behavior, not just data
//! - A violation knows the class and field responsible and renders its own diagnostic line
//! - ValidationReport acts as an aggregate root and keeps violations in emission order
//! - Errors of the analysis itself are kept apart from violations of the analyzed code

use crate::position::Position;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Severity levels for reported diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational messages
    Info,
    /// Reported, but the build still passes
    Warning,
    /// Errors that fail the build
    Error,
}

impl Severity {
    /// Errors fail the build gate, nothing else does
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Error)
    }

    /// Lowercase name used in every output format
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A component class holding a repository-typed field without a transaction boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Identifier of the rule that produced this violation
    pub rule_id: String,
    /// How the finding affects the build
    pub severity: Severity,
    /// Identifier of the source file declaring the class
    pub file_path: PathBuf,
    /// Simple name of the offending class
    pub class_name: String,
    /// Simple name of the offending field
    pub field_name: String,
    /// Line number (1-indexed) of the field, when the source could be read
    pub line_number: Option<u32>,
    /// Column number (1-indexed) of the field, when the source could be read
    pub column_number: Option<u32>,
    /// Diagnostic text, without the location prefix
    pub message: String,
    /// Suggested fix for the violation
    pub suggested_fix: Option<String>,
    /// Detection timestamp
    pub detected_at: DateTime<Utc>,
}

impl Violation {
    /// Create a new violation with an unknown position
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        file_path: PathBuf,
        class_name: impl Into<String>,
        field_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            file_path,
            class_name: class_name.into(),
            field_name: field_name.into(),
            line_number: None,
            column_number: None,
            message: message.into(),
            suggested_fix: None,
            detected_at: Utc::now(),
        }
    }

    /// Attach the resolved position of the offending field
    pub fn with_position(mut self, position: Position) -> Self {
        self.line_number = Some(position.line);
        self.column_number = Some(position.column);
        self
    }

    /// Add a suggested fix
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggested_fix = Some(suggestion.into());
        self
    }

    /// Position of the offending field, if it was resolved
    pub fn position(&self) -> Option<Position> {
        match (self.line_number, self.column_number) {
            (Some(line), Some(column)) => Some(Position { line, column }),
            _ => None,
        }
    }

    /// Whether this violation is blocking
    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }

    /// Render the compiler-style diagnostic line: `<file>:[<line>,<column>] <message>`
    ///
    /// An unresolved position renders as `[?,?]`.
    pub fn format_diagnostic(&self) -> String {
        let location = match self.position() {
            Some(position) => format!("[{},{}]", position.line, position.column),
            None => "[?,?]".to_string(),
        };

        format!("{}:{} {}", self.file_path.display(), location, self.message)
    }
}

/// Counters gathered over one validation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Number of program models analyzed
    pub models_analyzed: usize,
    /// Number of component classes inspected
    pub classes_inspected: usize,
    /// Number of component classes skipped because they are already transactional
    pub classes_exempt: usize,
    /// Violations per severity
    pub violations_by_severity: ViolationCounts,
    /// Wall time of the run in milliseconds
    pub execution_time_ms: u64,
    /// When the run started
    pub validated_at: DateTime<Utc>,
}

/// Per-severity violation counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViolationCounts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

impl ViolationCounts {
    /// Sum over every severity
    pub fn total(&self) -> usize {
        self.error + self.warning + self.info
    }

    /// Any error-level violations at all
    pub fn has_blocking(&self) -> bool {
        self.error > 0
    }

    /// Count one more violation of `severity`
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.error += 1,
            Severity::Warning => self.warning += 1,
            Severity::Info => self.info += 1,
        }
    }
}

/// Diagnostics of one or more models plus run metadata
///
/// Violations stay in the order they were added: candidate order first,
/// field declaration order within a class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Violations in report order
    pub violations: Vec<Violation>,
    /// Summary statistics
    pub summary: ValidationSummary,
    /// Fingerprint of the configuration that produced the report
    pub config_fingerprint: Option<String>,
}

impl ValidationReport {
    /// Empty report stamped with the current time
    pub fn new() -> Self {
        Self {
            violations: Vec::new(),
            summary: ValidationSummary {
                validated_at: Utc::now(),
                ..Default::default()
            },
            config_fingerprint: None,
        }
    }

    /// Append a violation and count it
    pub fn add_violation(&mut self, violation: Violation) {
        self.summary.violations_by_severity.add(violation.severity);
        self.violations.push(violation);
    }

    /// Whether anything was reported
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Whether the build gate should fail
    pub fn has_errors(&self) -> bool {
        self.summary.violations_by_severity.has_blocking()
    }

    /// Violations of one severity, in report order
    pub fn violations_by_severity(&self, severity: Severity) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(move |v| v.severity == severity)
    }

    /// Set the number of models analyzed
    pub fn set_models_analyzed(&mut self, count: usize) {
        self.summary.models_analyzed = count;
    }

    /// Record class inspection counters
    pub fn record_classes(&mut self, inspected: usize, exempt: usize) {
        self.summary.classes_inspected += inspected;
        self.summary.classes_exempt += exempt;
    }

    /// Record the run's wall time
    pub fn set_execution_time(&mut self, duration_ms: u64) {
        self.summary.execution_time_ms = duration_ms;
    }

    /// Record which configuration produced the report
    pub fn set_config_fingerprint(&mut self, fingerprint: impl Into<String>) {
        self.config_fingerprint = Some(fingerprint.into());
    }

    /// Append another report to this one, keeping its violation order
    pub fn merge(&mut self, other: ValidationReport) {
        for violation in other.violations {
            self.add_violation(violation);
        }
        self.summary.models_analyzed += other.summary.models_analyzed;
        self.summary.classes_inspected += other.summary.classes_inspected;
        self.summary.classes_exempt += other.summary.classes_exempt;
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Failures of model loading, position resolution and configuration
#[derive(Debug, thiserror::Error)]
pub enum GuardianError {
    /// Configuration is unreadable or invalid
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Underlying I/O failure
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Program model document could not be loaded or parsed
    #[error("Model error in {file}: {message}")]
    Model { file: String, message: String },

    /// Text of a source file could not be obtained
    #[error("Source unavailable for {source_id}: {message}")]
    SourceUnavailable { source_id: String, message: String },

    /// Interface closure of a field's type could not be computed
    #[error("Unresolved type for field {field}: {type_name}")]
    UnresolvedType { field: String, type_name: String },

    /// Offset lies beyond the end of the text
    #[error("Offset {offset} out of range for text of {length} UTF-16 code units")]
    OffsetOutOfRange { offset: usize, length: usize },

    /// Analysis failed for a specific model
    #[error("Analysis error in {file}: {message}")]
    Analysis { file: String, message: String },
}

impl GuardianError {
    /// Configuration error from a message
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a model error
    pub fn model(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Model {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Create a source unavailable error
    pub fn source_unavailable(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    /// Create an unresolved type error
    pub fn unresolved_type(field: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::UnresolvedType {
            field: field.into(),
            type_name: type_name.into(),
        }
    }

    /// Analysis error for a model or run
    pub fn analysis(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Analysis {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Whether the analysis can continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. } | Self::UnresolvedType { .. } | Self::OffsetOutOfRange { .. }
        )
    }
}

/// Result alias used throughout the crate
pub type GuardianResult<T> = Result<T, GuardianError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn sample_violation() -> Violation {
        Violation::new(
            "transactional_repository",
            Severity::Error,
            PathBuf::from("src/OrderService.java"),
            "OrderService",
            "orders",
            "OrderService bean is mandatory transactional since orders is a CrudRepository",
        )
    }

    #[test]
    fn test_violation_creation() {
        let violation = sample_violation();

        assert_eq!(violation.rule_id, "transactional_repository");
        assert_eq!(violation.severity, Severity::Error);
        assert_eq!(violation.file_path, Path::new("src/OrderService.java"));
        assert_eq!(violation.class_name, "OrderService");
        assert_eq!(violation.field_name, "orders");
        assert!(violation.position().is_none());
        assert!(violation.is_blocking());
    }

    #[test]
    fn test_diagnostic_with_position() {
        let violation = sample_violation().with_position(Position { line: 7, column: 5 });

        assert_eq!(
            violation.format_diagnostic(),
            "src/OrderService.java:[7,5] OrderService bean is mandatory transactional since orders is a CrudRepository"
        );
    }

    #[test]
    fn test_diagnostic_with_unknown_position() {
        let violation = sample_violation();

        assert!(violation.format_diagnostic().starts_with("src/OrderService.java:[?,?] "));
    }

    #[test]
    fn test_report_keeps_insertion_order() {
        let mut report = ValidationReport::new();

        let mut second = sample_violation();
        second.field_name = "payments".to_string();
        second.severity = Severity::Warning;

        report.add_violation(sample_violation());
        report.add_violation(second);

        assert!(report.has_violations());
        assert!(report.has_errors());
        assert_eq!(report.violations[0].field_name, "orders");
        assert_eq!(report.violations[1].field_name, "payments");
        assert_eq!(report.summary.violations_by_severity.total(), 2);
        assert_eq!(report.violations_by_severity(Severity::Warning).count(), 1);
    }

    #[test]
    fn test_merge_accumulates_counters() {
        let mut first = ValidationReport::new();
        first.add_violation(sample_violation());
        first.set_models_analyzed(1);
        first.record_classes(3, 1);

        let mut second = ValidationReport::new();
        second.set_models_analyzed(1);
        second.record_classes(2, 0);

        first.merge(second);

        assert_eq!(first.summary.models_analyzed, 2);
        assert_eq!(first.summary.classes_inspected, 5);
        assert_eq!(first.summary.classes_exempt, 1);
        assert_eq!(first.violations.len(), 1);
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(GuardianError::source_unavailable("a.java", "missing").is_recoverable());
        assert!(GuardianError::unresolved_type("repo", "com.acme.Repo").is_recoverable());
        assert!(GuardianError::OffsetOutOfRange { offset: 9, length: 3 }.is_recoverable());
        assert!(!GuardianError::config("bad").is_recoverable());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
        assert!(Severity::Error.is_blocking());
        assert!(!Severity::Warning.is_blocking());
    }
}
