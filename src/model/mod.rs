//! Serialized program models produced by compiler front ends
//!
//! Architecture: Anti-Corruption Layer - model documents are translated into the ProgramModel port
//! - JSON or YAML documents list sources, a type hierarchy and top-level declarations
//! - Source texts are loaded once into a SourceCache while the model is built
//! - Interface closures combine front-end resolved names with the hierarchy walk

pub mod discovery;

use crate::cache::{CacheStatistics, SourceCache};
use crate::domain::hierarchy::{TypeDeclaration, TypeHierarchy};
use crate::domain::model::{Declaration, ProgramModel, SourceFile};
use crate::domain::violations::{GuardianError, GuardianResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub use discovery::ModelFilter;

/// On-disk format of a model document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Json,
    Yaml,
}

impl ModelFormat {
    /// `.yaml` and `.yml` files are YAML, everything else is JSON
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// A source file entry; `text` wins over `path` when both are present
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub id: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Raw program model as written by a front end
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDocument {
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
    #[serde(default)]
    pub types: Vec<TypeDeclaration>,
    #[serde(default)]
    pub declarations: Vec<Declaration>,
}

impl ModelDocument {
    pub fn parse(content: &str, format: ModelFormat, label: &str) -> GuardianResult<Self> {
        match format {
            ModelFormat::Json => serde_json::from_str(content)
                .map_err(|e| GuardianError::model(label, format!("Failed to parse JSON model: {e}"))),
            ModelFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| GuardianError::model(label, format!("Failed to parse YAML model: {e}"))),
        }
    }
}

/// A program model ready for evaluation
#[derive(Debug)]
pub struct LoadedModel {
    name: String,
    declarations: Vec<Declaration>,
    hierarchy: TypeHierarchy,
    sources: SourceCache,
}

impl LoadedModel {
    /// Build a model from a parsed document
    ///
    /// Relative source paths, and declaration sources not listed in `sources`,
    /// are read relative to `base_dir` when one is given.
    pub fn from_document(
        name: impl Into<String>,
        document: ModelDocument,
        base_dir: Option<&Path>,
    ) -> Self {
        let name = name.into();
        let mut sources = SourceCache::new();

        for entry in document.sources {
            match (entry.text, entry.path) {
                (Some(text), _) => sources.insert_text(entry.id, text),
                (None, Some(path)) => {
                    let path = match base_dir {
                        Some(dir) if path.is_relative() => dir.join(path),
                        _ => path,
                    };
                    sources.load_file(entry.id, path);
                }
                (None, None) => sources.mark_unavailable(entry.id, "no text or path in model"),
            }
        }

        for declaration in &document.declarations {
            let Some(id) = declaration.source.as_deref() else {
                continue;
            };
            if sources.contains(id) {
                continue;
            }
            match base_dir {
                Some(dir) => sources.load_file(id, dir.join(id)),
                None => sources.mark_unavailable(id, "source not listed in model"),
            }
        }

        tracing::debug!(
            "Loaded model {} with {} declarations, {} types ({})",
            name,
            document.declarations.len(),
            document.types.len(),
            sources.statistics().format_display()
        );

        Self {
            name,
            declarations: document.declarations,
            hierarchy: TypeHierarchy::new(document.types),
            sources,
        }
    }

    /// Parse and build a model from in-memory content
    pub fn from_content(
        name: &str,
        content: &str,
        format: ModelFormat,
        base_dir: Option<&Path>,
    ) -> GuardianResult<Self> {
        let document = ModelDocument::parse(content, format, name)?;
        Ok(Self::from_document(name, document, base_dir))
    }

    /// Load a model document from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> GuardianResult<Self> {
        let path = path.as_ref();
        let label = path.display().to_string();

        let content = fs::read_to_string(path)
            .map_err(|e| GuardianError::model(&label, format!("Failed to read model: {e}")))?;

        Self::from_content(&label, &content, ModelFormat::from_path(path), path.parent())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    pub fn source_statistics(&self) -> CacheStatistics {
        self.sources.statistics()
    }
}

impl ProgramModel for LoadedModel {
    fn annotated_declarations(&self, annotation: &str) -> Vec<&Declaration> {
        self.declarations
            .iter()
            .filter(|declaration| declaration.has_annotation(annotation))
            .collect()
    }

    fn interface_closure(&self, field: &Declaration) -> GuardianResult<BTreeSet<String>> {
        let Some(resolved) = &field.resolved_type else {
            return Err(GuardianError::unresolved_type(&field.name, "<missing type>"));
        };

        let known_name = resolved
            .name
            .as_deref()
            .filter(|name| self.hierarchy.contains(name));

        if resolved.interfaces.is_none() && known_name.is_none() {
            return Err(GuardianError::unresolved_type(&field.name, resolved.display_name()));
        }

        let mut closure = known_name
            .map(|name| self.hierarchy.interface_closure(name))
            .unwrap_or_default();

        for interface in resolved.interfaces.iter().flatten() {
            self.hierarchy.extend_with_interface(interface, &mut closure);
        }

        Ok(closure)
    }

    fn source_file_of(&self, declaration: &Declaration) -> GuardianResult<SourceFile> {
        match declaration.source.as_deref() {
            Some(id) => self.sources.get(id),
            None => Err(GuardianError::source_unavailable(
                &declaration.name,
                "declaration has no source file",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;
    use tempfile::TempDir;

    const CRUD: &str = "org.springframework.data.repository.CrudRepository";

    const MODEL: &str = r#"{
        "sources": [
            { "id": "OrderService.java", "text": "@Component\nclass OrderService {\n  OrderRepository orders;\n}\n" }
        ],
        "types": [
            { "name": "com.acme.OrderRepository", "interfaces": ["org.springframework.data.repository.CrudRepository"] },
            { "name": "org.springframework.data.repository.CrudRepository", "interfaces": ["org.springframework.data.repository.Repository"] },
            { "name": "java.lang.String" }
        ],
        "declarations": [
            {
                "name": "OrderService", "kind": "class", "source": "OrderService.java", "offset": 11,
                "annotations": ["org.springframework.stereotype.Component"],
                "members": [
                    { "name": "orders", "kind": "field", "offset": 50, "type": { "name": "com.acme.OrderRepository" } },
                    { "name": "label", "kind": "field", "offset": 60, "type": { "name": "java.lang.String" } },
                    { "name": "mystery", "kind": "field", "type": { "name": "com.acme.Unknown" } },
                    { "name": "typeless", "kind": "field" }
                ]
            },
            { "name": "Plain", "kind": "class" }
        ]
    }"#;

    fn load() -> LoadedModel {
        LoadedModel::from_content("test.model.json", MODEL, ModelFormat::Json, None).unwrap()
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ModelFormat::from_path("a.model.yaml"), ModelFormat::Yaml);
        assert_eq!(ModelFormat::from_path("a.model.yml"), ModelFormat::Yaml);
        assert_eq!(ModelFormat::from_path("a.model.json"), ModelFormat::Json);
        assert_eq!(ModelFormat::from_path("model"), ModelFormat::Json);
    }

    #[test]
    fn test_annotated_declarations() {
        let model = load();

        let components = model.annotated_declarations("org.springframework.stereotype.Component");
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].name, "OrderService");
        assert!(model.annotated_declarations("javax.transaction.Transactional").is_empty());
    }

    #[test]
    fn test_interface_closure_through_hierarchy() {
        let model = load();
        let fields = &model.declarations()[0].members;

        let closure = model.interface_closure(&fields[0]).unwrap();
        assert!(closure.contains(CRUD));
        assert!(closure.contains("org.springframework.data.repository.Repository"));

        let closure = model.interface_closure(&fields[1]).unwrap();
        assert!(closure.is_empty());
    }

    #[test]
    fn test_unresolved_types() {
        let model = load();
        let fields = &model.declarations()[0].members;

        let err = model.interface_closure(&fields[2]).unwrap_err();
        assert!(matches!(err, GuardianError::UnresolvedType { ref type_name, .. } if type_name == "com.acme.Unknown"));

        let err = model.interface_closure(&fields[3]).unwrap_err();
        assert!(matches!(err, GuardianError::UnresolvedType { .. }));
    }

    #[test]
    fn test_explicit_empty_interfaces_resolve_to_empty_closure() {
        let model = load();
        let primitive: Declaration = serde_json::from_str(
            r#"{ "name": "count", "kind": "field", "type": { "name": "int", "interfaces": [] } }"#,
        )
        .unwrap();
        let unknown: Declaration = serde_json::from_str(
            r#"{ "name": "count", "kind": "field", "type": { "name": "int" } }"#,
        )
        .unwrap();

        assert!(model.interface_closure(&primitive).unwrap().is_empty());
        assert!(matches!(
            model.interface_closure(&unknown).unwrap_err(),
            GuardianError::UnresolvedType { .. }
        ));
    }

    #[test]
    fn test_front_end_interfaces_are_expanded() {
        let model = load();
        let field = Declaration::field(
            "repo",
            crate::domain::model::ResolvedType::named("com.acme.Elsewhere").with_interface(CRUD),
        );

        let closure = model.interface_closure(&field).unwrap();
        assert!(closure.contains(CRUD));
        assert!(closure.contains("org.springframework.data.repository.Repository"));
    }

    #[test]
    fn test_source_lookup() {
        let model = load();
        let class = &model.declarations()[0];

        let source = model.source_file_of(class).unwrap();
        assert_eq!(source.position(class.members[0].offset).unwrap(), Position { line: 3, column: 19 });

        let err = model.source_file_of(&model.declarations()[1]).unwrap_err();
        assert!(matches!(err, GuardianError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_yaml_model_with_sources_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("src")).unwrap();
        fs::write(temp_dir.path().join("src/A.java"), "class A {\n  R r;\n}\n").unwrap();

        let model_path = temp_dir.path().join("app.model.yaml");
        fs::write(
            &model_path,
            "sources:\n  - id: src/A.java\n    path: src/A.java\ndeclarations:\n  - name: A\n    kind: class\n    source: src/A.java\n  - name: B\n    kind: class\n    source: src/B.java\n",
        )
        .unwrap();

        let model = LoadedModel::from_file(&model_path).unwrap();

        assert!(model.source_file_of(&model.declarations()[0]).is_ok());
        assert!(model.source_file_of(&model.declarations()[1]).is_err());
        assert_eq!(model.source_statistics().loaded, 1);
        assert_eq!(model.source_statistics().unavailable, 1);
    }

    #[test]
    fn test_malformed_model_is_a_model_error() {
        let err = LoadedModel::from_content("bad.json", "{ not json", ModelFormat::Json, None).unwrap_err();
        assert!(matches!(err, GuardianError::Model { ref file, .. } if file == "bad.json"));
    }
}
