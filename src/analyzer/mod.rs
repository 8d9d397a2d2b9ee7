//! Main analysis orchestrator for Tx Guardian
//!
//! Architecture: Domain Services - Analyzer runs model rules and aggregates their results
//! - Discovers model documents, loads them and hands each one to the rule
//! - Reports keep violations in model order, then candidate order, then field order
//! - Parallel evaluation is opt-in per run and never changes that order

pub mod transactional;

use crate::config::GuardianConfig;
use crate::domain::model::{Declaration, ProgramModel};
use crate::domain::violations::{GuardianResult, ValidationReport, Violation};
use crate::model::{LoadedModel, ModelFilter};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub use transactional::TransactionalRule;

/// A rule evaluated over a whole program model
pub trait ModelRule: Send + Sync {
    /// Stable identifier used in reports
    fn id(&self) -> &str;

    /// Declarations the rule should look at, in the order they are reported
    fn candidates<'m>(&self, model: &'m dyn ProgramModel) -> Vec<&'m Declaration>;

    /// Evaluate candidates and return diagnostics in candidate order
    fn evaluate(
        &self,
        model: &dyn ProgramModel,
        candidates: &[&Declaration],
        parallel: bool,
    ) -> RuleOutcome;
}

/// Result of one rule over one model
#[derive(Debug, Default)]
pub struct RuleOutcome {
    pub violations: Vec<Violation>,
    /// Candidates that were classes and got looked at
    pub classes_inspected: usize,
    /// Inspected classes skipped because they were already transactional
    pub classes_exempt: usize,
}

/// Main analyzer that orchestrates the entire validation process
pub struct Analyzer {
    config: GuardianConfig,
    rule: TransactionalRule,
    filter: ModelFilter,
}

/// Options for customizing analysis behavior
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Whether to use parallel processing
    pub parallel: bool,
    /// Whether to stop at the first model that fails to load
    pub fail_fast: bool,
    /// Maximum number of models to analyze
    pub max_models: Option<usize>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            fail_fast: false,
            max_models: None,
        }
    }
}

impl Analyzer {
    /// Create a new analyzer with the given configuration
    pub fn new(config: GuardianConfig) -> GuardianResult<Self> {
        config.validate()?;

        let filter = ModelFilter::new(&config.models.patterns, &config.models.exclude)?;

        Ok(Self {
            rule: TransactionalRule::new(config.rule.clone()),
            config,
            filter,
        })
    }

    /// Create an analyzer with default configuration
    pub fn with_defaults() -> GuardianResult<Self> {
        Self::new(GuardianConfig::default())
    }

    pub fn config(&self) -> &GuardianConfig {
        &self.config
    }

    pub fn rule(&self) -> &TransactionalRule {
        &self.rule
    }

    /// Evaluate the rule over one program model
    pub fn analyze_model(&self, model: &dyn ProgramModel, options: &AnalysisOptions) -> ValidationReport {
        let start_time = Instant::now();
        let mut report = ValidationReport::new();
        report.set_models_analyzed(1);
        report.set_config_fingerprint(self.config.fingerprint());

        if !self.rule.config().enabled {
            tracing::debug!("Rule {} is disabled", self.rule.id());
            return report;
        }

        let candidates = self.rule.candidates(model);
        tracing::debug!("Evaluating {} candidates for {}", candidates.len(), self.rule.id());

        let outcome = self.rule.evaluate(model, &candidates, options.parallel);
        for violation in outcome.violations {
            report.add_violation(violation);
        }
        report.record_classes(outcome.classes_inspected, outcome.classes_exempt);
        report.set_execution_time(start_time.elapsed().as_millis() as u64);

        report
    }

    /// Load and analyze a single model document
    pub fn analyze_file<P: AsRef<Path>>(
        &self,
        model_path: P,
        options: &AnalysisOptions,
    ) -> GuardianResult<ValidationReport> {
        let model = LoadedModel::from_file(model_path)?;
        Ok(self.analyze_model(&model, options))
    }

    /// Expand files and directories into model documents, in discovery order
    pub fn discover_models<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<PathBuf> {
        let mut models = Vec::new();

        for path in paths {
            let path = path.as_ref();

            if path.is_file() {
                models.push(path.to_path_buf());
            } else if path.is_dir() {
                models.extend(self.filter.find_models(path));
            } else {
                tracing::warn!("Skipping {}: no such file or directory", path.display());
            }
        }

        models
    }

    /// Analyze every model found under the given paths
    pub fn analyze_paths<P: AsRef<Path>>(
        &self,
        paths: &[P],
        options: &AnalysisOptions,
    ) -> GuardianResult<ValidationReport> {
        let start_time = Instant::now();

        let mut model_paths = self.discover_models(paths);
        if let Some(max_models) = options.max_models {
            model_paths.truncate(max_models);
        }

        // Collected in input order, so merging below is deterministic
        let results: Vec<(PathBuf, GuardianResult<ValidationReport>)> =
            if options.parallel && model_paths.len() > 1 {
                model_paths
                    .par_iter()
                    .map(|path| (path.clone(), self.analyze_file(path, options)))
                    .collect()
            } else {
                model_paths
                    .iter()
                    .map(|path| (path.clone(), self.analyze_file(path, options)))
                    .collect()
            };

        let mut report = ValidationReport::new();
        for (path, result) in results {
            match result {
                Ok(model_report) => report.merge(model_report),
                Err(e) => {
                    if options.fail_fast {
                        return Err(e);
                    }
                    tracing::warn!("Failed to analyze {}: {}", path.display(), e);
                }
            }
        }

        report.set_execution_time(start_time.elapsed().as_millis() as u64);
        report.set_config_fingerprint(self.config.fingerprint());

        Ok(report)
    }

    /// Get configuration fingerprint for cache validation
    pub fn config_fingerprint(&self) -> String {
        self.config.fingerprint()
    }
}
