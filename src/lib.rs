//! Tx Guardian - Transactional boundary enforcement for managed components
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - Pure rule and position logic in the domain, analyzer and position modules
//! - Model loading, source caching and report rendering stay at the edges
//! - Async validation API for build pipelines and editor integrations

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod domain;
pub mod model;
pub mod position;
pub mod report;

// Re-export main types for convenient access
pub use domain::violations::{
    GuardianError, GuardianResult, Severity, ValidationReport, ValidationSummary, Violation,
};

pub use domain::model::{Declaration, DeclarationKind, ProgramModel, ResolvedType, SourceFile};

pub use config::{ConfigBuilder, GuardianConfig, RuleConfig};

pub use analyzer::{AnalysisOptions, Analyzer, ModelRule, RuleOutcome, TransactionalRule};

pub use model::{LoadedModel, ModelDocument, ModelFormat};

pub use position::{LineIndex, Position};

pub use report::{OutputFormat, ReportFormatter, ReportOptions};

use std::path::Path;
use std::time::Instant;

/// Main Guardian validator providing high-level validation operations
pub struct GuardianValidator {
    analyzer: Analyzer,
    report_formatter: ReportFormatter,
}

impl GuardianValidator {
    /// Create a new validator with the given configuration
    pub fn new_with_config(config: GuardianConfig) -> GuardianResult<Self> {
        let analyzer = Analyzer::new(config)?;
        let report_formatter = ReportFormatter::default();

        Ok(Self { analyzer, report_formatter })
    }

    /// Create a validator with default configuration
    pub fn new() -> GuardianResult<Self> {
        Self::new_with_config(GuardianConfig::default())
    }

    /// Create a validator loading configuration from file
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> GuardianResult<Self> {
        let config = GuardianConfig::load_from_file(path)?;
        Self::new_with_config(config)
    }

    /// Set custom report formatter
    pub fn with_report_formatter(mut self, formatter: ReportFormatter) -> Self {
        self.report_formatter = formatter;
        self
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Validate a model that is already in memory
    pub fn validate_model(&self, model: &dyn ProgramModel) -> ValidationReport {
        self.analyzer.analyze_model(model, &AnalysisOptions::default())
    }

    /// Validate a single model document
    pub fn validate_file<P: AsRef<Path>>(&self, model_path: P) -> GuardianResult<ValidationReport> {
        self.analyzer.analyze_file(model_path, &AnalysisOptions::default())
    }

    /// Validate model files and directories with default options
    pub async fn validate_paths<P: AsRef<Path>>(&self, paths: &[P]) -> GuardianResult<ValidationReport> {
        self.validate_with_options(paths, &AnalysisOptions::default()).await
    }

    /// Validate model files and directories, reading documents asynchronously
    ///
    /// Reports are merged in discovery order.
    pub async fn validate_with_options<P: AsRef<Path>>(
        &self,
        paths: &[P],
        options: &AnalysisOptions,
    ) -> GuardianResult<ValidationReport> {
        let start_time = Instant::now();

        let mut model_paths = self.analyzer.discover_models(paths);
        if let Some(max_models) = options.max_models {
            model_paths.truncate(max_models);
        }

        let mut report = ValidationReport::new();
        for model_path in &model_paths {
            match load_model(model_path).await {
                Ok(model) => report.merge(self.analyzer.analyze_model(&model, options)),
                Err(e) => {
                    if options.fail_fast {
                        return Err(e);
                    }
                    tracing::warn!("Failed to analyze {}: {}", model_path.display(), e);
                }
            }
        }

        report.set_execution_time(start_time.elapsed().as_millis() as u64);
        report.set_config_fingerprint(self.analyzer.config_fingerprint());

        tracing::info!(
            "Validated {} models: {} violations",
            report.summary.models_analyzed,
            report.violations.len()
        );

        Ok(report)
    }

    /// Write a formatted validation report to `writer`
    pub fn write_report<W: std::io::Write>(
        &self,
        report: &ValidationReport,
        format: OutputFormat,
        writer: W,
    ) -> GuardianResult<()> {
        self.report_formatter.write_report(report, format, writer)
    }

    /// Format a validation report for output
    pub fn format_report(
        &self,
        report: &ValidationReport,
        format: OutputFormat,
    ) -> GuardianResult<String> {
        self.report_formatter.format_report(report, format)
    }
}

/// Read a model document with tokio and build it
async fn load_model(path: &Path) -> GuardianResult<LoadedModel> {
    let label = path.display().to_string();
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| GuardianError::model(&label, format!("Failed to read model: {e}")))?;

    LoadedModel::from_content(&label, &content, ModelFormat::from_path(path), path.parent())
}

/// Convenience function to validate model files with default settings
pub async fn validate_models<P: AsRef<Path>>(paths: &[P]) -> GuardianResult<ValidationReport> {
    let validator = GuardianValidator::new()?;
    validator.validate_paths(paths).await
}

/// Build gate for CI pipelines
///
/// Returns an error if any blocking violations are found.
pub async fn build_gate<P: AsRef<Path>>(paths: &[P]) -> GuardianResult<ValidationReport> {
    let report = validate_models(paths).await?;

    if report.has_errors() {
        let error_count = report.summary.violations_by_severity.error;
        return Err(GuardianError::analysis(
            "build gate",
            format!(
                "{} blocking violation{} found",
                error_count,
                if error_count == 1 { "" } else { "s" }
            ),
        ));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const GUARDED: &str = r#"{
        "sources": [{ "id": "Billing.java", "text": "@Component\n@Transactional\nclass Billing {\n  Repo orders;\n}\n" }],
        "types": [{ "name": "com.acme.Repo", "interfaces": ["org.springframework.data.repository.CrudRepository"] }],
        "declarations": [{
            "name": "Billing", "kind": "class", "source": "Billing.java",
            "annotations": ["org.springframework.stereotype.Component", "javax.transaction.Transactional"],
            "members": [{ "name": "orders", "kind": "field", "offset": 44, "type": { "name": "com.acme.Repo" } }]
        }]
    }"#;

    fn write_models(root: &Path) {
        let unguarded = GUARDED
            .replace("\\n@Transactional", "")
            .replace(", \"javax.transaction.Transactional\"", "")
            .replace("\"offset\": 44", "\"offset\": 29");

        fs::write(root.join("guarded.model.json"), GUARDED).unwrap();
        fs::write(root.join("unguarded.model.json"), unguarded).unwrap();
    }

    #[tokio::test]
    async fn test_validate_paths() {
        let temp_dir = TempDir::new().unwrap();
        write_models(temp_dir.path());

        let validator = GuardianValidator::new().unwrap();
        let report = validator.validate_paths(&[temp_dir.path()]).await.unwrap();

        assert_eq!(report.summary.models_analyzed, 2);
        assert_eq!(report.summary.classes_inspected, 2);
        assert_eq!(report.summary.classes_exempt, 1);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(
            report.violations[0].format_diagnostic(),
            "Billing.java:[3,3] Billing bean is mandatory transactional since orders is a CrudRepository"
        );
    }

    #[tokio::test]
    async fn test_async_and_sync_paths_agree() {
        let temp_dir = TempDir::new().unwrap();
        write_models(temp_dir.path());

        let validator = GuardianValidator::new().unwrap();
        let async_report = validator.validate_paths(&[temp_dir.path()]).await.unwrap();
        let sync_report = validator
            .analyzer()
            .analyze_paths(&[temp_dir.path()], &AnalysisOptions::default())
            .unwrap();

        let diagnostics = |r: &ValidationReport| {
            r.violations.iter().map(|v| v.format_diagnostic()).collect::<Vec<_>>()
        };
        assert_eq!(diagnostics(&async_report), diagnostics(&sync_report));
    }

    #[test]
    fn test_single_file_validation() {
        let temp_dir = TempDir::new().unwrap();
        let model_path = temp_dir.path().join("guarded.model.json");
        fs::write(&model_path, GUARDED).unwrap();

        let validator = GuardianValidator::new().unwrap();
        let report = validator.validate_file(&model_path).unwrap();

        assert!(!report.has_violations());
        assert_eq!(report.summary.classes_exempt, 1);
    }

    #[test]
    fn test_report_formatting() {
        let model = LoadedModel::from_content(
            "inline",
            &GUARDED.replace(", \"javax.transaction.Transactional\"", ""),
            ModelFormat::Json,
            None,
        )
        .unwrap();

        let validator = GuardianValidator::new().unwrap().with_report_formatter(ReportFormatter::new(
            ReportOptions { use_colors: false, ..Default::default() },
        ));
        let report = validator.validate_model(&model);

        let compiler = validator.format_report(&report, OutputFormat::Compiler).unwrap();
        assert_eq!(
            compiler,
            "Billing.java:[4,3] Billing bean is mandatory transactional since orders is a CrudRepository\n"
        );

        let json = validator.format_report(&report, OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed["violations"].is_array());
    }

    #[tokio::test]
    async fn test_build_gate() {
        let temp_dir = TempDir::new().unwrap();
        let clean = temp_dir.path().join("clean");
        let dirty = temp_dir.path().join("dirty");
        fs::create_dir_all(&clean).unwrap();
        fs::create_dir_all(&dirty).unwrap();
        fs::write(clean.join("app.model.json"), GUARDED).unwrap();
        write_models(&dirty);

        assert!(build_gate(&[&clean]).await.is_ok());

        let err = build_gate(&[&dirty]).await.unwrap_err();
        assert!(err.to_string().contains("1 blocking violation found"));
    }

    #[tokio::test]
    async fn test_fail_fast_on_broken_model() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("broken.model.json"), "{").unwrap();

        let validator = GuardianValidator::new().unwrap();

        let report = validator.validate_paths(&[temp_dir.path()]).await.unwrap();
        assert_eq!(report.summary.models_analyzed, 0);

        let options = AnalysisOptions { fail_fast: true, ..Default::default() };
        assert!(validator
            .validate_with_options(&[temp_dir.path()], &options)
            .await
            .is_err());
    }
}
