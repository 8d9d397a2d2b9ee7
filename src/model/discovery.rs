//! Model file discovery using glob include/exclude patterns
//!
//! Architectural Principle: Service Layer - ModelFilter decides which documents are program models
//! - Include patterns name model files, exclude patterns prune build output and vendored trees
//! - Patterns without a slash match the file name, others match the path relative to the walk root
//! - Traversal is sorted so the same tree always yields the same model order

use crate::domain::violations::{GuardianError, GuardianResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Selects program model files in a directory tree
#[derive(Debug, Clone)]
pub struct ModelFilter {
    includes: Vec<FilterPattern>,
    excludes: Vec<FilterPattern>,
}

#[derive(Debug, Clone)]
struct FilterPattern {
    pattern: glob::Pattern,
    original: String,
}

impl FilterPattern {
    fn parse(pattern: &str) -> GuardianResult<Self> {
        let trimmed = pattern.trim_start_matches('/');
        let glob_pattern = glob::Pattern::new(trimmed)
            .map_err(|e| GuardianError::config(format!("Invalid pattern '{pattern}': {e}")))?;

        Ok(Self { pattern: glob_pattern, original: trimmed.to_string() })
    }

    fn matches(&self, relative: &Path) -> bool {
        if self.original.contains('/') {
            return self.pattern.matches_path(relative);
        }

        relative
            .file_name()
            .map(|name| self.pattern.matches(&name.to_string_lossy()))
            .unwrap_or(false)
    }
}

impl ModelFilter {
    pub fn new(includes: &[String], excludes: &[String]) -> GuardianResult<Self> {
        let includes = includes
            .iter()
            .map(|p| FilterPattern::parse(p))
            .collect::<GuardianResult<Vec<_>>>()?;
        let excludes = excludes
            .iter()
            .map(|p| FilterPattern::parse(p))
            .collect::<GuardianResult<Vec<_>>>()?;

        Ok(Self { includes, excludes })
    }

    /// Whether a path, relative to the discovery root, is a model to load
    pub fn is_model(&self, relative: &Path) -> bool {
        if self.excludes.iter().any(|p| p.matches(relative)) {
            return false;
        }
        self.includes.iter().any(|p| p.matches(relative))
    }

    /// Find every model file under `root`, in sorted traversal order
    pub fn find_models<P: AsRef<Path>>(&self, root: P) -> Vec<PathBuf> {
        let root = root.as_ref();
        let mut models = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                // Prune excluded directories without descending into them
                let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                relative.as_os_str().is_empty()
                    || !entry.file_type().is_dir()
                    || !self.excludes.iter().any(|p| p.matches(&relative.join("_")))
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            if self.is_model(relative) {
                models.push(entry.path().to_path_buf());
            }
        }

        models
    }
}
