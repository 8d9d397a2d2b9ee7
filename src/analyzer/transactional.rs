//! Transactional repository rule
//!
//! Code Quality Principle: Specialized Analysis Services - the rule reads a ProgramModel and returns values
//! - Implements ModelRule for clean polymorphism
//! - Components already carrying an exemption annotation are never inspected
//! - Positions are resolved per class from its source file; failures degrade to an unknown position

use crate::analyzer::{ModelRule, RuleOutcome};
use crate::config::{simple_name, RuleConfig, RULE_ID, UNRESOLVED_RULE_ID};
use crate::domain::model::{Declaration, ProgramModel, SourceFile};
use crate::domain::violations::{GuardianError, Severity, Violation};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::PathBuf;

/// Flags managed components that hold a repository-typed field without being transactional
#[derive(Debug, Clone)]
pub struct TransactionalRule {
    config: RuleConfig,
}

/// A field worth reporting, in declaration order
enum Finding<'a> {
    Repository(&'a Declaration),
    Unresolved(&'a Declaration, GuardianError),
}

/// What evaluating one candidate produced
#[derive(Debug)]
enum ClassOutcome {
    NotAClass,
    Exempt,
    Inspected(Vec<Violation>),
}

impl TransactionalRule {
    pub fn new(config: RuleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    /// Diagnostic message for one offending field
    pub fn message(&self, class_name: &str, field_name: &str) -> String {
        format!(
            "{} bean is mandatory transactional since {} is a {}",
            class_name,
            field_name,
            self.config.repository_simple_name()
        )
    }

    fn is_exempt(&self, model: &dyn ProgramModel, class: &Declaration) -> bool {
        self.config
            .exempt_annotations
            .iter()
            .any(|annotation| model.has_annotation(class, annotation))
    }

    fn evaluate_class(&self, model: &dyn ProgramModel, class: &Declaration) -> ClassOutcome {
        if !class.is_class() {
            return ClassOutcome::NotAClass;
        }

        if self.is_exempt(model, class) {
            tracing::debug!("{} is already transactional, skipping", class.name);
            return ClassOutcome::Exempt;
        }

        let mut findings = Vec::new();

        for field in model.enclosed_members(class).iter().filter(|m| m.is_field()) {
            match model.interface_closure(field) {
                Ok(closure) => {
                    if closure.contains(&self.config.repository_interface) {
                        findings.push(Finding::Repository(field));
                    }
                }
                Err(e) => {
                    if e.is_recoverable() {
                        tracing::debug!("Treating {}.{} as implementing nothing: {}", class.name, field.name, e);
                    } else {
                        tracing::warn!("Interface closure of {}.{} failed: {}", class.name, field.name, e);
                    }
                    if self.config.report_unresolved {
                        findings.push(Finding::Unresolved(field, e));
                    }
                }
            }
        }

        if findings.is_empty() {
            return ClassOutcome::Inspected(Vec::new());
        }

        let located = Locator::new(model, class);
        let violations = findings
            .into_iter()
            .map(|finding| match finding {
                Finding::Repository(field) => {
                    let violation = Violation::new(
                        RULE_ID,
                        self.config.severity,
                        located.file_path(),
                        &class.name,
                        &field.name,
                        self.message(&class.name, &field.name),
                    );
                    located.place(violation, field).with_suggestion(self.suggestion(&class.name))
                }
                Finding::Unresolved(field, error) => {
                    let type_name = match error {
                        GuardianError::UnresolvedType { type_name, .. } => type_name,
                        other => other.to_string(),
                    };
                    let violation = Violation::new(
                        UNRESOLVED_RULE_ID,
                        Severity::Warning,
                        located.file_path(),
                        &class.name,
                        &field.name,
                        format!(
                            "{} cannot be checked for transactional use since the type of {} ({}) is unresolved",
                            class.name, field.name, type_name
                        ),
                    );
                    located.place(violation, field)
                }
            })
            .collect();

        ClassOutcome::Inspected(violations)
    }

    fn suggestion(&self, class_name: &str) -> String {
        match self.config.exempt_annotations.first() {
            Some(annotation) => format!("Annotate {} with @{}", class_name, simple_name(annotation)),
            None => format!("Make {class_name} transactional"),
        }
    }
}

impl ModelRule for TransactionalRule {
    fn id(&self) -> &str {
        RULE_ID
    }

    fn candidates<'m>(&self, model: &'m dyn ProgramModel) -> Vec<&'m Declaration> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for annotation in &self.config.component_annotations {
            for declaration in model.annotated_declarations(annotation) {
                if seen.insert(declaration as *const Declaration) {
                    candidates.push(declaration);
                }
            }
        }

        candidates
    }

    fn evaluate(
        &self,
        model: &dyn ProgramModel,
        candidates: &[&Declaration],
        parallel: bool,
    ) -> RuleOutcome {
        let outcomes: Vec<ClassOutcome> = if parallel && candidates.len() > 1 {
            candidates
                .par_iter()
                .map(|class| self.evaluate_class(model, class))
                .collect()
        } else {
            candidates
                .iter()
                .map(|class| self.evaluate_class(model, class))
                .collect()
        };

        let mut outcome = RuleOutcome::default();
        for class_outcome in outcomes {
            match class_outcome {
                ClassOutcome::NotAClass => {}
                ClassOutcome::Exempt => {
                    outcome.classes_inspected += 1;
                    outcome.classes_exempt += 1;
                }
                ClassOutcome::Inspected(violations) => {
                    outcome.classes_inspected += 1;
                    outcome.violations.extend(violations);
                }
            }
        }

        outcome
    }
}

/// Source location of one class, fetched once per class
struct Locator<'a> {
    model: &'a dyn ProgramModel,
    class: &'a Declaration,
    source: Result<SourceFile, GuardianError>,
}

impl<'a> Locator<'a> {
    fn new(model: &'a dyn ProgramModel, class: &'a Declaration) -> Self {
        let source = model.source_file_of(class);
        if let Err(e) = &source {
            tracing::warn!("Positions in {} are unknown: {}", class.name, e);
        }
        Self { model, class, source }
    }

    fn file_path(&self) -> PathBuf {
        match &self.source {
            Ok(source) => PathBuf::from(&source.id),
            Err(_) => PathBuf::from(self.model.source_identifier(self.class).unwrap_or("<unknown>")),
        }
    }

    fn place(&self, violation: Violation, field: &Declaration) -> Violation {
        let Ok(source) = &self.source else {
            return violation;
        };

        match source.position(self.model.source_offset(field)) {
            Ok(position) => violation.with_position(position),
            Err(e) => {
                tracing::warn!("Reporting {}.{} without a position: {}", self.class.name, field.name, e);
                violation
            }
        }
    }
}
