//! Context - Explicit context for validating a candidate resource
//!
//! Every validation call receives the document it validates against and a
//! [`Scope`] saying where the candidate lives and which existing resource, if
//! any, it replaces.

use crate::document::{ConfigDocument, Resource, ResourceExt};
use crate::kind::{Location, ResourceKind};

/// Where a candidate resource lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    /// A top-level collection item or a singleton.
    /// `editing` is the current name of the resource being edited; `None`
    /// means a new resource is being created (modal form).
    TopLevel { editing: Option<&'a str> },
    /// A sub-resource inside `parent`. `grandparent` is required for kinds
    /// nested two levels deep (ACL rules: acl inside vpc) and is the
    /// owning VPC for subnet tiers' subnets.
    Nested {
        parent: &'a str,
        grandparent: Option<&'a str>,
        editing: Option<&'a str>,
    },
}

impl<'a> Scope<'a> {
    /// Scope for creating a new top-level resource
    pub fn new_top_level() -> Self {
        Scope::TopLevel { editing: None }
    }

    /// Scope for editing an existing top-level resource
    pub fn top_level(editing: &'a str) -> Self {
        Scope::TopLevel {
            editing: Some(editing),
        }
    }

    /// Scope for a sub-resource of `parent`
    pub fn nested(parent: &'a str, editing: Option<&'a str>) -> Self {
        Scope::Nested {
            parent,
            grandparent: None,
            editing,
        }
    }

    /// Scope for a sub-resource two levels deep
    pub fn nested_in(parent: &'a str, grandparent: &'a str, editing: Option<&'a str>) -> Self {
        Scope::Nested {
            parent,
            grandparent: Some(grandparent),
            editing,
        }
    }

    /// Name of the resource being edited, if any
    pub fn editing(&self) -> Option<&'a str> {
        match self {
            Scope::TopLevel { editing } | Scope::Nested { editing, .. } => *editing,
        }
    }

    pub fn parent(&self) -> Option<&'a str> {
        match self {
            Scope::TopLevel { .. } => None,
            Scope::Nested { parent, .. } => Some(parent),
        }
    }

    pub fn grandparent(&self) -> Option<&'a str> {
        match self {
            Scope::TopLevel { .. } => None,
            Scope::Nested { grandparent, .. } => *grandparent,
        }
    }

    /// True when the candidate is a brand new resource
    pub fn is_new(&self) -> bool {
        self.editing().is_none()
    }
}

/// Validation context: the document and the candidate's scope
#[derive(Debug, Clone, Copy)]
pub struct SaveContext<'a> {
    pub doc: &'a ConfigDocument,
    pub scope: Scope<'a>,
}

impl<'a> SaveContext<'a> {
    pub fn new(doc: &'a ConfigDocument, scope: Scope<'a>) -> Self {
        Self { doc, scope }
    }

    pub fn top_level(doc: &'a ConfigDocument, editing: Option<&'a str>) -> Self {
        Self::new(doc, Scope::TopLevel { editing })
    }

    /// The stored resource currently being edited, if it can be found
    pub fn original(&self, kind: ResourceKind) -> Option<&'a Resource> {
        let editing = self.scope.editing()?;
        siblings(self.doc, kind, &self.scope)
            .into_iter()
            .find(|r| r.name() == editing)
    }

    /// The parent resource of a nested candidate
    pub fn parent_resource(&self, kind: ResourceKind) -> Option<&'a Resource> {
        let parent_kind = kind.parent()?;
        let parent = self.scope.parent()?;
        let candidates = match self.scope.grandparent() {
            Some(gp) => siblings(self.doc, parent_kind, &Scope::nested(gp, None)),
            None => all_of(self.doc, parent_kind),
        };
        candidates.into_iter().find(|r| r.name() == parent)
    }
}

/// Resources sharing a naming scope with a candidate of `kind`.
///
/// Top-level kinds share the whole collection. Nested kinds share the array
/// of their parent; when a two-level kind is given no grandparent the first
/// matching parent anywhere in the document is used.
pub fn siblings<'a>(doc: &'a ConfigDocument, kind: ResourceKind, scope: &Scope<'_>) -> Vec<&'a Resource> {
    match kind.location() {
        Location::Singleton(_) => Vec::new(),
        Location::TopLevel(collection) => doc.collection(collection).iter().collect(),
        Location::Nested { parent, key } => {
            let Some(parent_name) = scope.parent() else {
                return Vec::new();
            };
            parents(doc, parent, parent_name, scope.grandparent())
                .into_iter()
                .next()
                .map(|p| p.children(key))
                .unwrap_or_default()
        }
        Location::Derived { .. } => Vec::new(),
    }
}

/// Resources of `kind` named `name`, optionally restricted to those whose
/// own parent is `within`
fn parents<'a>(
    doc: &'a ConfigDocument,
    kind: ResourceKind,
    name: &str,
    within: Option<&str>,
) -> Vec<&'a Resource> {
    match kind.location() {
        Location::TopLevel(collection) => doc
            .collection(collection)
            .iter()
            .filter(|r| r.name() == name)
            .collect(),
        Location::Nested { parent, key } => {
            let owners: Vec<&Resource> = match (kind.parent(), within) {
                (Some(_), Some(owner)) => parents(doc, parent, owner, None),
                _ => all_of(doc, parent),
            };
            owners
                .into_iter()
                .flat_map(|owner| owner.children(key))
                .filter(|r| r.name() == name)
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Every resource of `kind` anywhere in the document
pub fn all_of(doc: &ConfigDocument, kind: ResourceKind) -> Vec<&Resource> {
    match kind.location() {
        Location::Singleton(singleton) => vec![doc.singleton(singleton)],
        Location::TopLevel(collection) => doc.collection(collection).iter().collect(),
        Location::Nested { parent, key } => all_of(doc, parent)
            .into_iter()
            .flat_map(|owner| owner.children(key))
            .collect(),
        Location::Derived { .. } => Vec::new(),
    }
}

/// Names of every resource of `kind`, optionally restricted to one parent
pub fn names_of(doc: &ConfigDocument, kind: ResourceKind, parent: Option<&str>) -> Vec<String> {
    let resources = match (kind.location(), parent) {
        (Location::Nested { .. }, Some(parent)) => siblings(doc, kind, &Scope::nested(parent, None)),
        _ => all_of(doc, kind),
    };
    resources.iter().map(|r| r.name().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> ConfigDocument {
        serde_json::from_value(json!({
            "vpcs": [
                {
                    "name": "management",
                    "acls": [{ "name": "management", "rules": [{ "name": "allow-all" }] }],
                    "subnets": [{ "name": "vsi-zone-1" }, { "name": "vsi-zone-2" }]
                },
                {
                    "name": "workload",
                    "acls": [{ "name": "workload", "rules": [{ "name": "deny" }, { "name": "allow" }] }],
                    "subnets": [{ "name": "vsi-zone-1" }]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn siblings_of_top_level() {
        let doc = doc();
        let s = siblings(&doc, ResourceKind::Vpcs, &Scope::new_top_level());
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn siblings_are_scoped_to_parent() {
        let doc = doc();
        let s = siblings(&doc, ResourceKind::Subnets, &Scope::nested("workload", None));
        assert_eq!(s.len(), 1);
        let s = siblings(&doc, ResourceKind::Subnets, &Scope::nested("management", None));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn two_level_siblings() {
        let doc = doc();
        let s = siblings(
            &doc,
            ResourceKind::AclRules,
            &Scope::nested_in("workload", "workload", None),
        );
        assert_eq!(s.len(), 2);
        // without a grandparent the first acl named "management" is used
        let s = siblings(&doc, ResourceKind::AclRules, &Scope::nested("management", None));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn original_and_parent_lookup() {
        let doc = doc();
        let ctx = SaveContext::new(&doc, Scope::nested("management", Some("vsi-zone-2")));
        assert_eq!(ctx.original(ResourceKind::Subnets).unwrap().name(), "vsi-zone-2");
        assert_eq!(
            ctx.parent_resource(ResourceKind::Subnets).unwrap().name(),
            "management"
        );
    }

    #[test]
    fn all_subnets() {
        let doc = doc();
        assert_eq!(all_of(&doc, ResourceKind::Subnets).len(), 3);
        assert_eq!(names_of(&doc, ResourceKind::Subnets, Some("workload")), vec!["vsi-zone-1"]);
    }
}
