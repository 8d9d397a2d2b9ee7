//! Type hierarchy and transitive interface closure
//!
//! Architecture: Domain Service - the closure walk is pure and independent of any front end
//! - Each known type lists its superclass and its direct interfaces
//! - The closure of a type is every interface reachable through either edge
//! - Cycles in malformed hierarchies terminate the walk instead of looping

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Supertype edges of one named type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDeclaration {
    /// Fully qualified type name
    pub name: String,
    #[serde(default)]
    pub superclass: Option<String>,
    /// Interfaces implemented (for classes) or extended (for interfaces)
    #[serde(default)]
    pub interfaces: Vec<String>,
}

impl TypeDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }
}

/// Lookup table of known types
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchy {
    types: HashMap<String, TypeDeclaration>,
}

impl TypeHierarchy {
    pub fn new(types: impl IntoIterator<Item = TypeDeclaration>) -> Self {
        let mut table = HashMap::new();
        for declaration in types {
            if table.contains_key(&declaration.name) {
                tracing::debug!("Duplicate type declaration for {}, keeping the first", declaration.name);
                continue;
            }
            table.insert(declaration.name.clone(), declaration);
        }
        Self { types: table }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Interfaces implemented by `type_name`, directly or through any supertype
    ///
    /// The type itself is not part of its own closure.
    pub fn interface_closure(&self, type_name: &str) -> BTreeSet<String> {
        let mut closure = BTreeSet::new();
        self.walk(type_name, &mut closure);
        closure
    }

    /// Extend `closure` with `interface` and everything it extends
    pub fn extend_with_interface(&self, interface: &str, closure: &mut BTreeSet<String>) {
        if closure.insert(interface.to_string()) {
            self.walk(interface, closure);
        }
    }

    fn walk(&self, root: &str, closure: &mut BTreeSet<String>) {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut pending: Vec<&str> = vec![root];

        while let Some(current) = pending.pop() {
            if !visited.insert(current) {
                continue;
            }

            let Some(declaration) = self.types.get(current) else {
                continue;
            };

            for interface in &declaration.interfaces {
                closure.insert(interface.clone());
                pending.push(interface);
            }

            if let Some(superclass) = &declaration.superclass {
                pending.push(superclass);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CRUD: &str = "org.springframework.data.repository.CrudRepository";
    const REPOSITORY: &str = "org.springframework.data.repository.Repository";

    fn spring_hierarchy() -> TypeHierarchy {
        TypeHierarchy::new(vec![
            TypeDeclaration::new(CRUD).implements(REPOSITORY),
            TypeDeclaration::new("org.springframework.data.jpa.repository.JpaRepository")
                .implements("org.springframework.data.repository.PagingAndSortingRepository"),
            TypeDeclaration::new("org.springframework.data.repository.PagingAndSortingRepository")
                .implements(CRUD),
            TypeDeclaration::new("com.acme.OrderRepository")
                .implements("org.springframework.data.jpa.repository.JpaRepository"),
            TypeDeclaration::new("com.acme.BaseDao").implements(CRUD),
            TypeDeclaration::new("com.acme.OrderDao").extends("com.acme.BaseDao"),
        ])
    }

    #[test]
    fn test_closure_follows_superinterfaces() {
        let closure = spring_hierarchy().interface_closure("com.acme.OrderRepository");

        assert!(closure.contains(CRUD));
        assert!(closure.contains(REPOSITORY));
        assert!(!closure.contains("com.acme.OrderRepository"));
        assert_eq!(closure.len(), 4);
    }

    #[test]
    fn test_closure_follows_superclasses() {
        let closure = spring_hierarchy().interface_closure("com.acme.OrderDao");

        assert!(closure.contains(CRUD));
        assert!(closure.contains(REPOSITORY));
        assert!(!closure.contains("com.acme.BaseDao"));
    }

    #[test]
    fn test_unknown_type_has_empty_closure() {
        assert!(spring_hierarchy().interface_closure("java.lang.String").is_empty());
    }

    #[test]
    fn test_cycles_terminate() {
        let hierarchy = TypeHierarchy::new(vec![
            TypeDeclaration::new("a.A").implements("a.B"),
            TypeDeclaration::new("a.B").implements("a.A"),
        ]);

        let closure = hierarchy.interface_closure("a.A");

        assert_eq!(closure.len(), 2);
        assert!(closure.contains("a.A"));
        assert!(closure.contains("a.B"));
    }

    #[test]
    fn test_extend_with_interface_includes_the_interface() {
        let hierarchy = spring_hierarchy();
        let mut closure = BTreeSet::new();

        hierarchy.extend_with_interface(CRUD, &mut closure);

        assert!(closure.contains(CRUD));
        assert!(closure.contains(REPOSITORY));
    }

    #[test]
    fn test_duplicate_declarations_keep_first() {
        let hierarchy = TypeHierarchy::new(vec![
            TypeDeclaration::new("a.A").implements("a.I"),
            TypeDeclaration::new("a.A").implements("a.J"),
        ]);

        assert_eq!(hierarchy.len(), 1);
        assert!(hierarchy.interface_closure("a.A").contains("a.I"));
    }
}
