//! Source text cache for a single analysis run
//!
//! Architecture: Infrastructure Layer - the cache supplies source text without affecting rule logic
//! - Sources are registered once while a model loads, then only read
//! - Population needs `&mut self`, lookups need `&self`, so the borrow checker keeps the cache read-only during evaluation
//! - A source that cannot be read is remembered as unavailable instead of failing the load

use crate::domain::model::SourceFile;
use crate::domain::violations::{GuardianError, GuardianResult};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Source files keyed by identifier
#[derive(Debug, Default)]
pub struct SourceCache {
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug)]
enum CacheEntry {
    Loaded(SourceFile),
    Unavailable(String),
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register text that is already in memory
    pub fn insert_text(&mut self, id: impl Into<String>, text: impl Into<String>) {
        let id = id.into();
        let source = SourceFile::new(id.clone(), text.into());
        self.entries.insert(id, CacheEntry::Loaded(source));
    }

    /// Read a source file from disk and register it under `id`
    ///
    /// Read failures are recorded and reported on lookup.
    pub fn load_file<P: AsRef<Path>>(&mut self, id: impl Into<String>, path: P) {
        let id = id.into();
        let path = path.as_ref();

        let entry = match fs::read_to_string(path) {
            Ok(text) => CacheEntry::Loaded(SourceFile::new(id.clone(), text)),
            Err(e) => {
                tracing::warn!("Failed to read source {} from {}: {}", id, path.display(), e);
                CacheEntry::Unavailable(format!("failed to read {}: {e}", path.display()))
            }
        };

        self.entries.insert(id, entry);
    }

    /// Record a source whose text is known to be missing
    pub fn mark_unavailable(&mut self, id: impl Into<String>, reason: impl Into<String>) {
        self.entries.insert(id.into(), CacheEntry::Unavailable(reason.into()));
    }

    pub fn get(&self, id: &str) -> GuardianResult<SourceFile> {
        match self.entries.get(id) {
            Some(CacheEntry::Loaded(source)) => Ok(source.clone()),
            Some(CacheEntry::Unavailable(reason)) => {
                Err(GuardianError::source_unavailable(id, reason.clone()))
            }
            None => Err(GuardianError::source_unavailable(id, "source not registered in model")),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn statistics(&self) -> CacheStatistics {
        let mut stats = CacheStatistics::default();

        for entry in self.entries.values() {
            match entry {
                CacheEntry::Loaded(source) => {
                    stats.loaded += 1;
                    stats.total_units += source.len_utf16();
                }
                CacheEntry::Unavailable(_) => stats.unavailable += 1,
            }
        }

        stats
    }
}

/// Counters describing a populated cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStatistics {
    pub loaded: usize,
    pub unavailable: usize,
    pub total_units: usize,
}

impl CacheStatistics {
    pub fn total_sources(&self) -> usize {
        self.loaded + self.unavailable
    }

    pub fn format_display(&self) -> String {
        format!(
            "Sources: {} loaded, {} unavailable, {} code units",
            self.loaded, self.unavailable, self.total_units
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;
    use tempfile::TempDir;

    #[test]
    fn test_inline_text_lookup() {
        let mut cache = SourceCache::new();
        cache.insert_text("A.java", "class A {\n  Repo r;\n}");

        let source = cache.get("A.java").unwrap();
        assert_eq!(source.id, "A.java");
        assert_eq!(source.position(12).unwrap(), Position { line: 2, column: 3 });
    }

    #[test]
    fn test_file_loading() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("B.java");
        fs::write(&path, "class B {}").unwrap();

        let mut cache = SourceCache::new();
        cache.load_file("B.java", &path);

        assert!(cache.get("B.java").is_ok());
        assert_eq!(cache.statistics().total_units, 10);
    }

    #[test]
    fn test_missing_file_is_unavailable_not_fatal() {
        let temp_dir = TempDir::new().unwrap();

        let mut cache = SourceCache::new();
        cache.load_file("Gone.java", temp_dir.path().join("Gone.java"));

        assert!(cache.contains("Gone.java"));
        let err = cache.get("Gone.java").unwrap_err();
        assert!(matches!(err, GuardianError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_unregistered_source_is_unavailable() {
        let cache = SourceCache::new();

        let err = cache.get("Nowhere.java").unwrap_err();
        assert!(matches!(err, GuardianError::SourceUnavailable { ref source_id, .. } if source_id == "Nowhere.java"));
    }

    #[test]
    fn test_statistics() {
        let mut cache = SourceCache::new();
        cache.insert_text("A.java", "abc");
        cache.mark_unavailable("B.java", "generated");

        let stats = cache.statistics();
        assert_eq!(stats.loaded, 1);
        assert_eq!(stats.unavailable, 1);
        assert_eq!(stats.total_sources(), 2);
        assert!(stats.format_display().contains("1 loaded"));
    }
}
