//! Program model seen by the rule engine
//!
//! Architecture: Ports and Adapters - ProgramModel is the port any compiler front end can fill
//! - Declarations carry names, kinds, annotations, members and offsets as plain data
//! - Annotation checks are named predicates, never tied to a concrete annotation type
//! - Source text access may fail; callers decide how to degrade

use crate::domain::violations::GuardianResult;
use crate::position::{LineIndex, Position};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Kind of a declared program element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeclarationKind {
    Class,
    Field,
    #[default]
    Other,
}

impl DeclarationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Field => "field",
            Self::Other => "other",
        }
    }
}

impl From<String> for DeclarationKind {
    fn from(kind: String) -> Self {
        match kind.to_ascii_lowercase().as_str() {
            "class" => Self::Class,
            "field" => Self::Field,
            _ => Self::Other,
        }
    }
}

impl From<DeclarationKind> for String {
    fn from(kind: DeclarationKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedType {
    /// Fully qualified name of the declared type, when known
    #[serde(default)]
    pub name: Option<String>,
    /// Interface names the front end already resolved for this type
    ///
    /// `None` leaves resolution to the model's type table. An empty set means
    /// the type is resolved and implements nothing, as for `int`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interfaces: Option<BTreeSet<String>>,
}

impl ResolvedType {
    /// A type whose interfaces are looked up in the type table
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), interfaces: None }
    }

    /// A type the front end resolved to no interfaces at all
    pub fn without_interfaces(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), interfaces: Some(BTreeSet::new()) }
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.get_or_insert_with(BTreeSet::new).insert(interface.into());
        self
    }

    /// Display name used in diagnostics about this type
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

/// A named program element: a class, a field, or anything else the front end reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    /// Simple name
    pub name: String,
    #[serde(default)]
    pub kind: DeclarationKind,
    /// Names of annotations present on the element
    #[serde(default)]
    pub annotations: BTreeSet<String>,
    /// Enclosed members in declaration order
    #[serde(default)]
    pub members: Vec<Declaration>,
    /// Declared type, for fields
    #[serde(default, rename = "type")]
    pub resolved_type: Option<ResolvedType>,
    /// Identifier of the source file holding the element
    #[serde(default)]
    pub source: Option<String>,
    /// UTF-16 offset of the defining token within its source file
    #[serde(default)]
    pub offset: usize,
}

impl Declaration {
    pub fn new(name: impl Into<String>, kind: DeclarationKind) -> Self {
        Self {
            name: name.into(),
            kind,
            annotations: BTreeSet::new(),
            members: Vec::new(),
            resolved_type: None,
            source: None,
            offset: 0,
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, DeclarationKind::Class)
    }

    pub fn field(name: impl Into<String>, resolved_type: ResolvedType) -> Self {
        let mut field = Self::new(name, DeclarationKind::Field);
        field.resolved_type = Some(resolved_type);
        field
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.insert(annotation.into());
        self
    }

    pub fn with_member(mut self, member: Declaration) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn at_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn has_annotation(&self, annotation: &str) -> bool {
        self.annotations.contains(annotation)
    }

    pub fn is_class(&self) -> bool {
        self.kind == DeclarationKind::Class
    }

    pub fn is_field(&self) -> bool {
        self.kind == DeclarationKind::Field
    }
}

/// Immutable text of one source file, with its newline table
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Display identifier, usually a path
    pub id: String,
    pub text: Arc<str>,
    lines: Arc<LineIndex>,
}

impl SourceFile {
    pub fn new(id: impl Into<String>, text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        let lines = Arc::new(LineIndex::new(&text));
        Self { id: id.into(), text, lines }
    }

    /// Resolve a UTF-16 offset to a 1-based position
    pub fn position(&self, offset: usize) -> GuardianResult<Position> {
        self.lines.position(offset)
    }

    /// Length of the text in UTF-16 code units
    pub fn len_utf16(&self) -> usize {
        self.lines.len_utf16()
    }
}

/// Capabilities a host program model must provide to drive the rule engine
///
/// Only `annotated_declarations`, `interface_closure` and `source_file_of`
/// need a host-specific implementation; the rest read the declaration itself.
pub trait ProgramModel: Sync {
    /// Top-level declarations carrying `annotation`, in model order
    fn annotated_declarations(&self, annotation: &str) -> Vec<&Declaration>;

    fn has_annotation(&self, declaration: &Declaration, annotation: &str) -> bool {
        declaration.has_annotation(annotation)
    }

    fn enclosed_members<'a>(&'a self, declaration: &'a Declaration) -> &'a [Declaration] {
        &declaration.members
    }

    /// Every interface the field's type implements, directly or transitively
    ///
    /// Fails with `UnresolvedType` when the closure cannot be computed.
    fn interface_closure(&self, field: &Declaration) -> GuardianResult<BTreeSet<String>>;

    fn source_offset(&self, declaration: &Declaration) -> usize {
        declaration.offset
    }

    /// Identifier of the source file holding the declaration, even when its text is unreadable
    fn source_identifier<'a>(&'a self, declaration: &'a Declaration) -> Option<&'a str> {
        declaration.source.as_deref()
    }

    /// Text of the source file holding the declaration
    ///
    /// Fails with `SourceUnavailable` when the text cannot be obtained.
    fn source_file_of(&self, declaration: &Declaration) -> GuardianResult<SourceFile>;
}
