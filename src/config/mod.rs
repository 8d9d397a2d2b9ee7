//! Configuration loading and management for tx-guardian
//!
//! Architecture: Anti-Corruption Layer - Configuration translates external YAML formats
//! - Raw YAML structures are converted to clean domain objects
//! - Annotation and interface names are caller-supplied constants, never rule logic
//! - Default configuration targets Spring components and Spring Data repositories

use crate::domain::violations::{GuardianError, GuardianResult, Severity};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Identifier of the transactional repository rule
pub const RULE_ID: &str = "transactional_repository";

/// Identifier of diagnostics about fields whose type could not be resolved
pub const UNRESOLVED_RULE_ID: &str = "unresolved_type";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardianConfig {
    /// Configuration format version
    pub version: String,
    /// Model discovery configuration
    #[serde(default)]
    pub models: ModelPathConfig,
    /// Transactional repository rule settings
    #[serde(default)]
    pub rule: RuleConfig,
}

/// Which files under a directory are program models
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPathConfig {
    /// Glob patterns naming model documents
    pub patterns: Vec<String>,
    /// Glob patterns for paths to skip
    pub exclude: Vec<String>,
}

impl Default for ModelPathConfig {
    fn default() -> Self {
        Self {
            patterns: vec![
                "**/*.model.json".to_string(),
                "**/*.model.yaml".to_string(),
                "**/*.model.yml".to_string(),
            ],
            exclude: vec![
                "**/target/**".to_string(),
                "**/node_modules/**".to_string(),
                "**/.git/**".to_string(),
            ],
        }
    }
}

/// Settings of the transactional repository rule
///
/// Keys missing from a config file keep their default values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub enabled: bool,
    pub severity: Severity,
    /// Annotations marking a class as a managed component
    pub component_annotations: Vec<String>,
    /// Annotations exempting a class because it is already transactional
    pub exempt_annotations: Vec<String>,
    /// Fully qualified name of the repository capability interface
    pub repository_interface: String,
    /// Emit a warning for each field whose type could not be resolved
    pub report_unresolved: bool,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            severity: Severity::Error,
            component_annotations: vec!["org.springframework.stereotype.Component".to_string()],
            exempt_annotations: vec!["javax.transaction.Transactional".to_string()],
            repository_interface: "org.springframework.data.repository.CrudRepository".to_string(),
            report_unresolved: false,
        }
    }
}

impl RuleConfig {
    /// Last segment of the repository interface name
    pub fn repository_simple_name(&self) -> &str {
        simple_name(&self.repository_interface)
    }

    /// Message template, with `{class}` and `{field}` placeholders
    pub fn message_template(&self) -> String {
        format!(
            "{{class}} bean is mandatory transactional since {{field}} is a {}",
            self.repository_simple_name()
        )
    }
}

/// Last `.`-separated segment of a qualified name
pub fn simple_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

impl GuardianConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> GuardianResult<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            GuardianError::config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            GuardianError::config(format!(
                "Failed to parse config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from string content
    pub fn load_from_str(content: &str) -> GuardianResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| GuardianError::config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Default configuration for Spring applications
    pub fn with_defaults() -> Self {
        Self {
            version: "1.0".to_string(),
            models: ModelPathConfig::default(),
            rule: RuleConfig::default(),
        }
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> GuardianResult<()> {
        if !["1.0"].contains(&self.version.as_str()) {
            return Err(GuardianError::config(format!(
                "Unsupported configuration version: {}. Supported versions: 1.0",
                self.version
            )));
        }

        if self.models.patterns.is_empty() {
            return Err(GuardianError::config("At least one model pattern is required"));
        }

        for pattern in self.models.patterns.iter().chain(&self.models.exclude) {
            glob::Pattern::new(pattern).map_err(|e| {
                GuardianError::config(format!("Invalid model pattern '{pattern}': {e}"))
            })?;
        }

        if self.rule.component_annotations.is_empty() {
            return Err(GuardianError::config(
                "At least one component annotation is required",
            ));
        }

        let qualified = qualified_name_regex()?;
        let names = self
            .rule
            .component_annotations
            .iter()
            .chain(&self.rule.exempt_annotations)
            .chain(std::iter::once(&self.rule.repository_interface));

        for name in names {
            if !qualified.is_match(name) {
                return Err(GuardianError::config(format!(
                    "'{name}' is not a valid qualified name"
                )));
            }
        }

        if let Some(overlap) = self
            .rule
            .component_annotations
            .iter()
            .find(|name| self.rule.exempt_annotations.contains(name))
        {
            return Err(GuardianError::config(format!(
                "Annotation '{overlap}' cannot both select and exempt a component"
            )));
        }

        Ok(())
    }

    /// Create a fingerprint of the configuration for report provenance
    pub fn fingerprint(&self) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();

        self.version.hash(&mut hasher);
        self.models.patterns.hash(&mut hasher);
        self.models.exclude.hash(&mut hasher);

        // Annotation lists are sets; order must not change the fingerprint
        let mut components = self.rule.component_annotations.clone();
        components.sort();
        let mut exempt = self.rule.exempt_annotations.clone();
        exempt.sort();

        self.rule.enabled.hash(&mut hasher);
        self.rule.severity.hash(&mut hasher);
        components.hash(&mut hasher);
        exempt.hash(&mut hasher);
        self.rule.repository_interface.hash(&mut hasher);
        self.rule.report_unresolved.hash(&mut hasher);

        format!("{:x}", hasher.finish())
    }
}

impl Default for GuardianConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Dotted identifiers, allowing `$` for nested types
fn qualified_name_regex() -> GuardianResult<Regex> {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*$")
        .map_err(|e| GuardianError::config(format!("Failed to build name pattern: {e}")))
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: GuardianConfig,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self { config: GuardianConfig::default() }
    }

    /// Replace the component annotations
    pub fn component_annotations<I, S>(mut self, annotations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.rule.component_annotations = annotations.into_iter().map(Into::into).collect();
        self
    }

    /// Add an exemption annotation
    pub fn exempt_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.config.rule.exempt_annotations.push(annotation.into());
        self
    }

    pub fn repository_interface(mut self, interface: impl Into<String>) -> Self {
        self.config.rule.repository_interface = interface.into();
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.config.rule.severity = severity;
        self
    }

    pub fn report_unresolved(mut self, enabled: bool) -> Self {
        self.config.rule.report_unresolved = enabled;
        self
    }

    /// Add an exclusion pattern
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.config.models.exclude.push(pattern.into());
        self
    }

    /// Build the final configuration
    pub fn build(self) -> GuardianResult<GuardianConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
