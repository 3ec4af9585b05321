//! Invalid forms - Whole-document health check
//!
//! Runs the disable-save predicate over every singleton, every top-level
//! resource and every nested sub-resource, and reports the form
//! identifiers that hold at least one invalid resource.

use std::collections::BTreeSet;

use crate::context::{SaveContext, Scope};
use crate::disable_save::{SaveProblem, disable_save, first_problem};
use crate::document::{Collection, ConfigDocument, Resource, ResourceExt, Singleton};
use crate::kind::{Location, ResourceKind};

/// One invalid resource found by [`invalid_resources`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidResource {
    pub kind: ResourceKind,
    /// Slash separated location, e.g. `vpcs/management/acls/management/rules/allow-all`
    pub path: String,
    pub problem: SaveProblem,
}

/// Sorted, deduplicated form identifiers containing an invalid resource.
/// A form is checked until its first failure.
pub fn invalid_forms(doc: &ConfigDocument) -> Vec<&'static str> {
    let mut failing = BTreeSet::new();
    walk(doc, &mut |kind, data, ctx, _| {
        let form = kind.form();
        if !failing.contains(form) && disable_save(kind, data, &ctx) {
            failing.insert(form);
        }
    });
    failing.into_iter().collect()
}

/// Every invalid resource in document order, with the reason
pub fn invalid_resources(doc: &ConfigDocument) -> Vec<InvalidResource> {
    let mut found = Vec::new();
    walk(doc, &mut |kind, data, ctx, path| {
        if let Some(problem) = first_problem(kind, data, &ctx) {
            found.push(InvalidResource {
                kind,
                path: path.join("/"),
                problem,
            });
        }
    });
    found
}

type Visitor<'v, 'a> = dyn FnMut(ResourceKind, &'a Resource, SaveContext<'a>, &[&'a str]) + 'v;

fn walk<'a>(doc: &'a ConfigDocument, visit: &mut Visitor<'_, 'a>) {
    for singleton in Singleton::ALL {
        let kind = singleton_kind(*singleton);
        visit(
            kind,
            doc.singleton(*singleton),
            SaveContext::top_level(doc, None),
            &[singleton.key()],
        );
    }

    for collection in Collection::ALL {
        let kind = ResourceKind::for_collection(*collection);
        for item in doc.collection(*collection) {
            let name = item.name();
            let mut path = vec![collection.key(), name];
            visit(kind, item, SaveContext::top_level(doc, Some(name)), &path);

            for child_kind in kind.nested_kinds() {
                let Location::Nested { key, .. } = child_kind.location() else {
                    continue;
                };
                for child in item.children(key) {
                    let child_name = child.name();
                    path.extend([key, child_name]);
                    let scope = Scope::nested(name, Some(child_name));
                    visit(child_kind, child, SaveContext::new(doc, scope), &path);

                    for grandchild_kind in child_kind.nested_kinds() {
                        let Location::Nested { key: inner, .. } = grandchild_kind.location() else {
                            continue;
                        };
                        for grandchild in child.children(inner) {
                            path.extend([inner, grandchild.name()]);
                            let scope = Scope::nested_in(child_name, name, Some(grandchild.name()));
                            visit(grandchild_kind, grandchild, SaveContext::new(doc, scope), &path);
                            path.truncate(4);
                        }
                    }
                    path.truncate(2);
                }
            }
        }
    }
}

fn singleton_kind(singleton: Singleton) -> ResourceKind {
    match singleton {
        Singleton::Options => ResourceKind::Options,
        Singleton::IamAccountSettings => ResourceKind::IamAccountSettings,
        Singleton::Atracker => ResourceKind::Atracker,
        Singleton::Logdna => ResourceKind::Logdna,
        Singleton::Sysdig => ResourceKind::Sysdig,
        Singleton::Scc => ResourceKind::Scc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn base() -> Value {
        json!({
            "_options": {
                "prefix": "slz",
                "region": "us-south",
                "zones": 3,
                "endpoints": "private",
                "tags": ["slz"]
            },
            "atracker": { "enabled": false },
            "logdna": { "enabled": false },
            "sysdig": { "enabled": false },
            "iam_account_settings": { "enable": false },
            "scc": { "enable": false },
            "resource_groups": [{ "name": "slz-rg" }],
            "vpcs": [{
                "name": "management",
                "resource_group": "slz-rg",
                "bucket": "",
                "acls": [{
                    "name": "management-acl",
                    "resource_group": "slz-rg",
                    "rules": [{
                        "name": "allow-all",
                        "action": "allow",
                        "direction": "inbound",
                        "source": "10.0.0.0/8",
                        "destination": "10.0.0.0/8",
                        "ruleProtocol": "all"
                    }]
                }]
            }]
        })
    }

    fn doc(value: Value) -> ConfigDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn invalid_acl_rule_marks_nacls() {
        let valid = invalid_forms(&doc(base()));
        assert!(!valid.contains(&"/form/nacls"));

        let mut value = base();
        value["vpcs"][0]["acls"][0]["rules"]
            .as_array_mut()
            .unwrap()
            .push(json!({ "name": "bad", "source": "not-an-ip", "destination": "10.0.0.0/8" }));
        let forms = invalid_forms(&doc(value));
        let added: Vec<_> = forms.iter().filter(|f| !valid.contains(*f)).collect();
        assert_eq!(added, vec![&"/form/nacls"]);
    }

    #[test]
    fn every_failing_form_is_reported_once() {
        let mut value = base();
        for collection in Collection::ALL {
            value[collection.key()] = json!([{ "name": "-bad-" }]);
        }
        value["atracker"] = json!({ "enabled": true });
        value["logdna"] = json!({ "enabled": true });
        value["sysdig"] = json!({ "enabled": true });
        value["iam_account_settings"] = json!({ "enable": true });
        value["scc"] = json!({ "enable": true });
        value["_options"] = json!({});

        let forms = invalid_forms(&doc(value));
        let mut expected: Vec<&str> = Collection::ALL
            .iter()
            .map(|c| ResourceKind::for_collection(*c).form())
            .chain(Singleton::ALL.iter().map(|s| singleton_kind(*s).form()))
            .collect();
        expected.sort_unstable();
        expected.dedup();
        assert_eq!(forms, expected);
    }

    #[test]
    fn switched_off_singletons_pass() {
        let forms = invalid_forms(&doc(base()));
        assert!(!forms.contains(&"/form/observability"));
        assert!(!forms.contains(&"/form/activityTracker"));
        assert!(!forms.contains(&"/form/iamAccountSettings"));
    }

    #[test]
    fn invalid_resources_carry_paths() {
        let mut value = base();
        value["vpcs"][0]["acls"][0]["rules"][0]["source"] = json!("999.1.1.1");
        let found = invalid_resources(&doc(value));
        let rule = found.iter().find(|r| r.kind == ResourceKind::AclRules).unwrap();
        assert_eq!(rule.path, "vpcs/management/acls/management-acl/rules/allow-all");
        assert_eq!(rule.problem.field, Some("source"));
    }
}
