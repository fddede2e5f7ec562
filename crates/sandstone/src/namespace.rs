//! Namespace strings and the scope tree.
//!
//! A namespace is a hierarchical identifier of the form `root:a\b\c`. The
//! `root:` prefix names a compiled unit (or a library root such as
//! `python:built-in`) and `\` separates nested scopes. Cell names append a
//! period suffix (`.x`, `.?Result`, `.*BinOp1f`) to a namespace; periods
//! never introduce further scopes.

use indexmap::IndexMap;
use log::warn;

use crate::error::{CompileError, CompileResult};

/// Joins `path` onto a base namespace.
///
/// A base ending in `:` is a bare root and concatenates directly; anything
/// else gets a scope separator.
pub fn join_base(base: &str, path: &str) -> String {
    if base.ends_with(':') {
        format!("{base}{path}")
    } else {
        format!("{base}\\{path}")
    }
}

/// The namespace with its `root:` prefix removed.
pub fn strip_root(namespace: &str) -> &str {
    namespace.split_once(':').map_or(namespace, |(_, rest)| rest)
}

/// First path segment after the root prefix: the compiled unit's name.
pub fn root_of(namespace: &str) -> &str {
    strip_root(namespace).split('\\').next().unwrap_or_default()
}

/// Scope segments of a namespace; the first carries the `root:` prefix.
pub fn segments(namespace: &str) -> impl Iterator<Item = &str> {
    namespace.split('\\')
}

/// Splits off the final scope segment, if the namespace is nested.
pub fn parent_and_name(namespace: &str) -> Option<(&str, &str)> {
    namespace.rsplit_once('\\')
}

/// The invocation path of a namespace: scope separators become `/`.
pub fn function_path(namespace: &str) -> String {
    namespace.replace('\\', "/")
}

/// What a name in a scope refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ScopeKind {
    Module,
    Package,
    Function,
    Variable,
    Attribute,
    Unresolved,
}

/// One scope in the tree: its canonical namespace, what kind of thing it
/// names, and its children keyed by bare name in insertion order.
///
/// An `attribute` node's `full_namespace` encodes an indirection as
/// `<target_ns>|<name>`; lookup dereferences it transparently unless the
/// raw form is requested.
#[derive(Debug, Clone)]
pub struct ScopeNode {
    pub full_namespace: String,
    pub kind: ScopeKind,
    pub children: IndexMap<String, ScopeNode>,
}

impl ScopeNode {
    fn new(full_namespace: impl Into<String>, kind: ScopeKind) -> Self {
        Self {
            full_namespace: full_namespace.into(),
            kind,
            children: IndexMap::new(),
        }
    }

    /// Child scopes of the given kind, in insertion order.
    pub fn children_of_kind(&self, kind: ScopeKind) -> impl Iterator<Item = (&str, &ScopeNode)> {
        self.children
            .iter()
            .filter(move |(_, node)| node.kind == kind)
            .map(|(name, node)| (name.as_str(), node))
    }
}

/// The nested symbol table.
///
/// Lookup walks the scope path from the root inward and keeps the last
/// scope that binds the name, so the closest enclosing scope wins — the
/// shadowing rule of lexical scoping.
#[derive(Debug, Default)]
pub struct SymbolTable {
    roots: IndexMap<String, ScopeNode>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent insertion of a top-level scope.
    pub fn init_root(&mut self, namespace: &str, kind: ScopeKind) {
        if !self.roots.contains_key(namespace) {
            self.roots.insert(namespace.to_owned(), ScopeNode::new(namespace, kind));
        }
    }

    /// Direct path walk to the scope node a namespace names.
    pub fn node_at(&self, namespace: &str) -> Option<&ScopeNode> {
        let mut parts = segments(namespace);
        let mut node = self.roots.get(parts.next()?)?;
        for part in parts {
            node = node.children.get(part)?;
        }
        Some(node)
    }

    fn node_at_mut(&mut self, namespace: &str) -> Option<&mut ScopeNode> {
        let mut parts = segments(namespace);
        let mut node = self.roots.get_mut(parts.next()?)?;
        for part in parts {
            node = node.children.get_mut(part)?;
        }
        Some(node)
    }

    /// Binds `name` under `parent_namespace` to `target_namespace`.
    ///
    /// Overwriting an existing binding replaces the node (and any children
    /// it had). Shadowing a function, module or package, or rebinding an
    /// alias, is reported; variables rebind silently.
    pub fn set(
        &mut self,
        name: &str,
        target_namespace: &str,
        parent_namespace: &str,
        kind: ScopeKind,
    ) -> CompileResult<()> {
        let parent = self
            .node_at_mut(parent_namespace)
            .ok_or_else(|| CompileError::NameNotFound {
                name: name.to_owned(),
                namespace: parent_namespace.to_owned(),
            })?;
        if let Some(old) = parent.children.get(name) {
            match old.kind {
                ScopeKind::Variable => {}
                old_kind if old_kind != kind => {
                    warn!("overwriting {old_kind} {name} in {parent_namespace} with a {kind} binding");
                }
                ScopeKind::Attribute | ScopeKind::Module | ScopeKind::Package => {
                    warn!("rebinding alias {name} in {parent_namespace}; the latest binding wins");
                }
                _ => {}
            }
        }
        parent
            .children
            .insert(name.to_owned(), ScopeNode::new(target_namespace, kind));
        Ok(())
    }

    /// Looks up `name` from inside `namespace` without dereferencing
    /// attribute indirections.
    ///
    /// Returns the bound node together with the namespace of the scope that
    /// binds it.
    pub fn get_raw(&self, name: &str, namespace: &str) -> CompileResult<(&ScopeNode, String)> {
        let not_found = || CompileError::NameNotFound {
            name: name.to_owned(),
            namespace: namespace.to_owned(),
        };

        let mut found: Option<(&ScopeNode, String)> = None;
        let mut node: Option<&ScopeNode> = None;
        let mut prefix = String::new();
        for segment in segments(namespace) {
            node = Some(match node {
                None => self.roots.get(segment).ok_or_else(not_found)?,
                Some(n) => n.children.get(segment).ok_or_else(not_found)?,
            });
            if prefix.is_empty() {
                prefix.push_str(segment);
            } else {
                prefix.push('\\');
                prefix.push_str(segment);
            }
            if let Some(child) = node.and_then(|n| n.children.get(name)) {
                found = Some((child, prefix.clone()));
            }
        }
        found.ok_or_else(not_found)
    }

    /// Looks up `name` from inside `namespace`, dereferencing attribute
    /// indirections transparently.
    ///
    /// Returns the target namespace and the namespace of the scope that
    /// binds the final (dereferenced) name.
    pub fn get(&self, name: &str, namespace: &str) -> CompileResult<(String, String)> {
        let (node, defining) = self.get_raw(name, namespace)?;
        if node.kind == ScopeKind::Attribute
            && let Some((target_ns, attr_name)) = node.full_namespace.split_once('|')
        {
            return self.get(attr_name, target_ns);
        }
        Ok((node.full_namespace.clone(), defining))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn table() -> SymbolTable {
        let mut t = SymbolTable::new();
        t.init_root("src:mod", ScopeKind::Module);
        t
    }

    #[test]
    fn join_base_respects_bare_roots() {
        assert_eq!(join_base("src:", "mod"), "src:mod");
        assert_eq!(join_base("src:mod", "f"), "src:mod\\f");
    }

    #[test]
    fn root_helpers_split_namespaces() {
        assert_eq!(strip_root("src:mod\\f"), "mod\\f");
        assert_eq!(root_of("src:mod\\f"), "mod");
        assert_eq!(root_of("src:a.b"), "a.b");
        assert_eq!(parent_and_name("src:mod\\f"), Some(("src:mod", "f")));
        assert_eq!(parent_and_name("src:mod"), None);
        assert_eq!(function_path("src:mod\\f\\.if\\1"), "src:mod/f/.if/1");
    }

    #[test]
    fn repeated_get_is_stable() {
        let mut t = table();
        t.set("x", "src:mod.x", "src:mod", ScopeKind::Variable).unwrap();
        let first = t.get("x", "src:mod").unwrap();
        let second = t.get("x", "src:mod").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.0, "src:mod.x");
    }

    #[test]
    fn closest_enclosing_scope_wins() {
        let mut t = table();
        t.set("f", "src:mod\\f", "src:mod", ScopeKind::Function).unwrap();
        t.set("x", "src:mod.x", "src:mod", ScopeKind::Variable).unwrap();
        t.set("x", "src:mod\\f.x", "src:mod\\f", ScopeKind::Variable).unwrap();

        let (inner, defining) = t.get("x", "src:mod\\f").unwrap();
        assert_eq!(inner, "src:mod\\f.x");
        assert_eq!(defining, "src:mod\\f");

        let (outer, defining) = t.get("x", "src:mod").unwrap();
        assert_eq!(outer, "src:mod.x");
        assert_eq!(defining, "src:mod");
    }

    #[test]
    fn outer_binding_is_visible_from_inner_scope() {
        let mut t = table();
        t.set("f", "src:mod\\f", "src:mod", ScopeKind::Function).unwrap();
        t.set("y", "src:mod.y", "src:mod", ScopeKind::Variable).unwrap();
        let (target, defining) = t.get("y", "src:mod\\f").unwrap();
        assert_eq!(target, "src:mod.y");
        assert_eq!(defining, "src:mod");
    }

    #[test]
    fn attribute_nodes_dereference_transparently() {
        let mut t = table();
        t.init_root("src:lib", ScopeKind::Module);
        t.set("z", "src:lib.z", "src:lib", ScopeKind::Variable).unwrap();
        t.set("y", "src:lib|z", "src:mod", ScopeKind::Attribute).unwrap();

        let (target, _) = t.get("y", "src:mod").unwrap();
        assert_eq!(target, "src:lib.z");

        let (raw, _) = t.get_raw("y", "src:mod").unwrap();
        assert_eq!(raw.full_namespace, "src:lib|z");
        assert_eq!(raw.kind, ScopeKind::Attribute);
    }

    #[test]
    fn missing_names_fail() {
        let t = table();
        assert!(matches!(
            t.get("nope", "src:mod"),
            Err(CompileError::NameNotFound { .. })
        ));
        assert!(matches!(
            t.get("x", "src:other"),
            Err(CompileError::NameNotFound { .. })
        ));
    }

    #[test]
    fn init_root_is_idempotent() {
        let mut t = table();
        t.set("x", "src:mod.x", "src:mod", ScopeKind::Variable).unwrap();
        t.init_root("src:mod", ScopeKind::Module);
        assert!(t.get("x", "src:mod").is_ok());
    }

    #[test]
    fn children_of_kind_filters_and_preserves_order() {
        let mut t = table();
        t.set("f", "src:mod\\f", "src:mod", ScopeKind::Function).unwrap();
        t.set("b", "src:mod.b", "src:mod", ScopeKind::Variable).unwrap();
        t.set("a", "src:mod.a", "src:mod", ScopeKind::Variable).unwrap();
        let node = t.node_at("src:mod").unwrap();
        let vars: Vec<&str> = node.children_of_kind(ScopeKind::Variable).map(|(n, _)| n).collect();
        assert_eq!(vars, ["b", "a"]);
    }
}
