//! References - Where resources point at each other by name
//!
//! Every place a resource names another is listed once in [`sites`]. Rename
//! and delete cascades walk the table: a rename rewrites every matching
//! value, a delete clears it according to the site's [`OnDelete`] policy or
//! refuses when the site says the reference must not be broken.
//!
//! Names are only unique within their scope, so a site also says how to
//! tell which parent the named resource lives in ([`RefScope`]).

use std::fmt;
use std::sync::LazyLock;

use log::debug;
use serde_json::Value;

use crate::context::{Scope, siblings};
use crate::document::{ConfigDocument, Resource, ResourceExt};
use crate::kind::{Location, ResourceKind};

/// Shape of the referencing field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// A single name
    One,
    /// An array of names
    Many,
    /// An array of objects whose given member holds the name
    ObjectList(&'static str),
}

/// What happens to a reference when its target is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Set the field to null
    Nullify,
    /// Remove the name from the array
    Remove,
    /// Remove the whole object entry from the array
    DropEntry,
    /// The delete is rejected while the reference exists
    Refuse,
}

/// How the parent of a nested target is identified from the holder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefScope {
    /// Names are unique document-wide
    Global,
    /// The holder's own field names the target's parent; a blank field
    /// matches any parent
    RecordField(&'static str),
    /// A field of the holder's owner names the target's parent
    OwnerField(&'static str),
    /// The holder's owner is the target's parent
    OwnerName,
    /// Only holders whose `field` equals `equals` reference the target
    Discriminated {
        field: &'static str,
        equals: &'static str,
    },
}

/// One referencing field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceSite {
    pub target: ResourceKind,
    pub holder: ResourceKind,
    pub field: &'static str,
    pub arity: Arity,
    pub on_delete: OnDelete,
    pub scope: RefScope,
}

impl ReferenceSite {
    const fn one(target: ResourceKind, holder: ResourceKind, field: &'static str) -> Self {
        Self {
            target,
            holder,
            field,
            arity: Arity::One,
            on_delete: OnDelete::Nullify,
            scope: RefScope::Global,
        }
    }

    const fn many(target: ResourceKind, holder: ResourceKind, field: &'static str) -> Self {
        Self {
            arity: Arity::Many,
            on_delete: OnDelete::Remove,
            ..Self::one(target, holder, field)
        }
    }

    const fn entries(
        target: ResourceKind,
        holder: ResourceKind,
        field: &'static str,
        member: &'static str,
    ) -> Self {
        Self {
            arity: Arity::ObjectList(member),
            on_delete: OnDelete::DropEntry,
            ..Self::one(target, holder, field)
        }
    }

    const fn scoped(self, scope: RefScope) -> Self {
        Self { scope, ..self }
    }

    const fn refuse(self) -> Self {
        Self {
            on_delete: OnDelete::Refuse,
            ..self
        }
    }
}

/// A resource that references another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub holder: ResourceKind,
    pub name: String,
    pub field: &'static str,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' ({})", self.holder, self.name, self.field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("Cannot delete {kind} '{name}': still referenced by {}", join(.by))]
    StillReferenced {
        kind: ResourceKind,
        name: String,
        by: Vec<Reference>,
    },
}

fn join(references: &[Reference]) -> String {
    references
        .iter()
        .map(Reference::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

static SITES: LazyLock<Vec<ReferenceSite>> = LazyLock::new(build_sites);

/// Every reference site known to the cascades
pub fn sites() -> &'static [ReferenceSite] {
    &SITES
}

fn build_sites() -> Vec<ReferenceSite> {
    use ResourceKind::*;
    type Site = ReferenceSite;
    let by_vpc = RefScope::RecordField("vpc");
    let by_kms = RefScope::RecordField("kms");
    let by_cos = RefScope::RecordField("cos");
    let by_workspace = RefScope::RecordField("workspace");

    let mut sites = Vec::new();

    for holder in [
        KeyManagement, ObjectStorage, SecretsManager, Vpcs, Acls, Subnets, SecurityGroups,
        SshKeys, Vsi, VpnGateways, VirtualPrivateEndpoints, TransitGateways, Clusters,
        LoadBalancers, Appid, EventStreams, Dns, Power, VpnServers, Icd, FortigateVnf, Atracker,
        Logdna, Sysdig,
    ] {
        sites.push(Site::one(ResourceGroups, holder, "resource_group"));
    }

    for holder in [ObjectStorage, SecretsManager, Vsi, Clusters, Icd] {
        sites.push(Site::one(KeyManagement, holder, "kms"));
    }
    for holder in [Vsi, Clusters, SecretsManager, Icd] {
        sites.push(Site::one(EncryptionKeys, holder, "encryption_key").scoped(by_kms));
    }
    sites.push(Site::one(EncryptionKeys, Volumes, "encryption_key").scoped(RefScope::OwnerField("kms")));
    sites.push(Site::one(EncryptionKeys, Buckets, "kms_key").scoped(RefScope::OwnerField("kms")));

    for holder in [Vpcs, Clusters, Logdna] {
        sites.push(Site::one(ObjectStorage, holder, "cos"));
    }
    sites.push(Site::one(Buckets, Vpcs, "bucket").scoped(by_cos));
    sites.push(Site::one(Buckets, Logdna, "bucket").scoped(by_cos));
    sites.push(Site::one(Buckets, Atracker, "collector_bucket_name"));
    sites.push(Site::one(CosKeys, Atracker, "cos_key"));
    sites.push(Site::one(SecretsManager, OpaqueSecrets, "secrets_manager"));

    for holder in [
        SecurityGroups, Vsi, VpnGateways, VirtualPrivateEndpoints, Clusters, LoadBalancers,
        RoutingTables, VpnServers, FortigateVnf, DnsCustomResolvers,
    ] {
        sites.push(Site::one(Vpcs, holder, "vpc"));
    }
    sites.push(Site::many(Vpcs, DnsZones, "vpcs"));
    sites.push(Site::entries(Vpcs, TransitGateways, "connections", "vpc"));

    for holder in [Vsi, VirtualPrivateEndpoints, Clusters, LoadBalancers, VpnServers, DnsCustomResolvers] {
        sites.push(Site::many(Subnets, holder, "subnets").scoped(by_vpc));
    }
    sites.push(Site::many(Subnets, WorkerPools, "subnets").scoped(RefScope::OwnerField("vpc")));
    sites.push(Site::one(Subnets, VpnGateways, "subnet").scoped(by_vpc));
    sites.push(Site::one(Subnets, FortigateVnf, "primary_subnet").scoped(by_vpc));
    sites.push(Site::one(Subnets, FortigateVnf, "secondary_subnet").scoped(by_vpc));
    sites.push(Site::one(Acls, Subnets, "network_acl").scoped(RefScope::OwnerName));

    for holder in [Vsi, VirtualPrivateEndpoints, LoadBalancers, VpnServers, FortigateVnf] {
        sites.push(Site::many(SecurityGroups, holder, "security_groups"));
    }
    sites.push(Site::many(SshKeys, Vsi, "ssh_keys"));
    sites.push(Site::many(SshKeys, FortigateVnf, "ssh_keys"));
    sites.push(Site::many(Vsi, LoadBalancers, "target_vsi"));
    sites.push(Site::many(TransitGateways, PowerCloudConnections, "transit_gateways"));
    sites.push(Site::one(DnsZones, DnsRecords, "dns_zone").scoped(RefScope::OwnerName));
    sites.push(Site::one(CbrZones, CbrContexts, "value").scoped(RefScope::Discriminated {
        field: "name",
        equals: "networkZoneId",
    }));

    sites.push(Site::one(Power, PowerInstances, "workspace"));
    sites.push(Site::one(Power, PowerVolumes, "workspace"));
    sites.push(Site::entries(Power, TransitGateways, "connections", "power"));
    sites.push(Site::one(PowerSshKeys, PowerInstances, "ssh_key").scoped(by_workspace));
    sites.push(Site::entries(PowerNetwork, PowerInstances, "network", "name").scoped(by_workspace));
    sites.push(Site::many(PowerInstances, PowerVolumes, "attachments"));
    for holder in [PowerInstances, PowerVolumes] {
        for field in ["pi_affinity_instance", "pi_anti_affinity_instance"] {
            sites.push(Site::one(PowerInstances, holder, field).refuse());
        }
        for field in ["pi_affinity_volume", "pi_anti_affinity_volume"] {
            sites.push(Site::one(PowerVolumes, holder, field).refuse());
        }
    }

    sites.push(Site::one(ClassicSshKeys, ClassicGateways, "ssh_key"));
    sites.push(Site::many(ClassicSshKeys, ClassicVsi, "ssh_keys"));
    for holder in [ClassicGateways, ClassicBareMetal, ClassicVsi] {
        sites.push(Site::one(ClassicVlans, holder, "private_vlan"));
        sites.push(Site::one(ClassicVlans, holder, "public_vlan"));
    }
    for field in ["private_security_groups", "public_security_groups"] {
        sites.push(Site::many(ClassicSecurityGroups, ClassicVsi, field));
    }

    sites
}

// ========== Holder traversal ==========

fn owner_matches(site: &ReferenceSite, owner: &Resource, parent: Option<&str>) -> bool {
    match (site.scope, parent) {
        (RefScope::OwnerName, Some(parent)) => owner.name() == parent,
        (RefScope::OwnerField(field), Some(parent)) => owner.is_blank(field) || owner.text(field) == parent,
        _ => true,
    }
}

fn record_matches(site: &ReferenceSite, record: &Resource, parent: Option<&str>) -> bool {
    match (site.scope, parent) {
        (RefScope::RecordField(field), Some(parent)) => {
            record.is_blank(field) || record.text(field) == parent
        }
        (RefScope::Discriminated { field, equals }, _) => record.text(field) == equals,
        _ => true,
    }
}

/// Holders of a site whose scope matches the target's parent
fn holders<'d>(doc: &'d ConfigDocument, site: &ReferenceSite, parent: Option<&str>) -> Vec<&'d Resource> {
    let records: Vec<&Resource> = match site.holder.location() {
        Location::Singleton(singleton) => vec![doc.singleton(singleton)],
        Location::TopLevel(collection) => doc.collection(collection).iter().collect(),
        Location::Nested { parent: owner_kind, key } => match owner_kind.location() {
            Location::TopLevel(collection) => doc
                .collection(collection)
                .iter()
                .filter(|owner| owner_matches(site, owner, parent))
                .flat_map(|owner| owner.children(key))
                .collect(),
            _ => Vec::new(),
        },
        Location::Derived { .. } => Vec::new(),
    };
    records
        .into_iter()
        .filter(|r| record_matches(site, r, parent))
        .collect()
}

fn holders_mut<'d>(
    doc: &'d mut ConfigDocument,
    site: &ReferenceSite,
    parent: Option<&str>,
) -> Vec<&'d mut Resource> {
    let records: Vec<&mut Resource> = match site.holder.location() {
        Location::Singleton(singleton) => vec![doc.singleton_mut(singleton)],
        Location::TopLevel(collection) => doc.collection_mut(collection).iter_mut().collect(),
        Location::Nested { parent: owner_kind, key } => match owner_kind.location() {
            Location::TopLevel(collection) => {
                let mut records = Vec::new();
                for owner in doc.collection_mut(collection).iter_mut() {
                    if owner_matches(site, owner, parent) {
                        records.extend(owner.children_mut(key));
                    }
                }
                records
            }
            _ => Vec::new(),
        },
        Location::Derived { .. } => Vec::new(),
    };
    records
        .into_iter()
        .filter(|r| record_matches(site, r, parent))
        .collect()
}

// ========== Field operations ==========

fn holds(record: &Resource, site: &ReferenceSite, name: &str) -> bool {
    let Some(value) = record.get(site.field) else {
        return false;
    };
    match site.arity {
        Arity::One => value.as_str() == Some(name),
        Arity::Many => value
            .as_array()
            .is_some_and(|items| items.iter().any(|i| i.as_str() == Some(name))),
        Arity::ObjectList(member) => value
            .as_array()
            .is_some_and(|items| items.iter().any(|i| i.get(member).and_then(Value::as_str) == Some(name))),
    }
}

fn rename_in(record: &mut Resource, site: &ReferenceSite, old: &str, new: &str) -> usize {
    if !holds(record, site, old) {
        return 0;
    }
    match site.arity {
        Arity::One => {
            record.insert(site.field.to_string(), Value::from(new));
            1
        }
        Arity::Many => {
            let mut count = 0;
            for item in record.array_mut(site.field) {
                if item.as_str() == Some(old) {
                    *item = Value::from(new);
                    count += 1;
                }
            }
            count
        }
        Arity::ObjectList(member) => {
            let mut count = 0;
            for item in record.array_mut(site.field) {
                if let Some(entry) = item.as_object_mut()
                    && entry.get(member).and_then(Value::as_str) == Some(old)
                {
                    entry.insert(member.to_string(), Value::from(new));
                    count += 1;
                }
            }
            count
        }
    }
}

fn clear_in(record: &mut Resource, site: &ReferenceSite, name: &str) -> usize {
    if !holds(record, site, name) {
        return 0;
    }
    match site.arity {
        Arity::One => {
            record.insert(site.field.to_string(), Value::Null);
            1
        }
        Arity::Many => {
            let items = record.array_mut(site.field);
            let before = items.len();
            items.retain(|i| i.as_str() != Some(name));
            before - items.len()
        }
        Arity::ObjectList(member) => {
            let items = record.array_mut(site.field);
            if site.on_delete == OnDelete::Nullify {
                for item in items.iter_mut() {
                    if let Some(entry) = item.as_object_mut()
                        && entry.get(member).and_then(Value::as_str) == Some(name)
                    {
                        entry.insert(member.to_string(), Value::Null);
                    }
                }
                return 1;
            }
            let before = items.len();
            items.retain(|i| i.get(member).and_then(Value::as_str) != Some(name));
            before - items.len()
        }
    }
}

// ========== Cascades ==========

/// Every resource referencing `kind` named `name` (inside `parent` for
/// nested kinds)
pub fn references_to(
    doc: &ConfigDocument,
    kind: ResourceKind,
    parent: Option<&str>,
    name: &str,
) -> Vec<Reference> {
    sites()
        .iter()
        .filter(|site| site.target == kind)
        .flat_map(|site| {
            holders(doc, site, parent)
                .into_iter()
                .filter(move |record| holds(record, site, name))
                .map(move |record| Reference {
                    holder: site.holder,
                    name: record.name().to_string(),
                    field: site.field,
                })
        })
        .collect()
}

/// Rewrite every reference to a renamed resource. Returns the number of
/// values rewritten.
pub fn rename_references(
    doc: &mut ConfigDocument,
    kind: ResourceKind,
    parent: Option<&str>,
    old: &str,
    new: &str,
) -> usize {
    if old == new {
        return 0;
    }
    let mut count = 0;
    for site in sites().iter().filter(|s| s.target == kind) {
        for record in holders_mut(doc, site, parent) {
            count += rename_in(record, site, old, new);
        }
    }
    debug!("Renamed {} '{}' to '{}': {} references rewritten", kind, old, new, count);
    count
}

/// Clear every reference to a resource about to be deleted. Fails without
/// touching the document when a refusing site still references it.
pub fn delete_references(
    doc: &mut ConfigDocument,
    kind: ResourceKind,
    parent: Option<&str>,
    name: &str,
) -> Result<usize, ReferenceError> {
    let blocking: Vec<Reference> = sites()
        .iter()
        .filter(|site| site.target == kind && site.on_delete == OnDelete::Refuse)
        .flat_map(|site| {
            holders(doc, site, parent)
                .into_iter()
                .filter(move |record| holds(record, site, name))
                .map(move |record| Reference {
                    holder: site.holder,
                    name: record.name().to_string(),
                    field: site.field,
                })
        })
        .collect();
    if !blocking.is_empty() {
        return Err(ReferenceError::StillReferenced {
            kind,
            name: name.to_string(),
            by: blocking,
        });
    }

    let mut count = 0;
    for site in sites().iter().filter(|s| s.target == kind) {
        for record in holders_mut(doc, site, parent) {
            count += clear_in(record, site, name);
        }
    }
    debug!("Deleting {} '{}': {} references cleared", kind, name, count);
    Ok(count)
}

/// Clear references to a resource and to everything nested inside it
pub fn cascade_delete(
    doc: &mut ConfigDocument,
    kind: ResourceKind,
    parent: Option<&str>,
    name: &str,
) -> Result<usize, ReferenceError> {
    let scope = match parent {
        Some(parent) => Scope::nested(parent, None),
        None => Scope::new_top_level(),
    };
    let children: Vec<(ResourceKind, String)> = siblings(doc, kind, &scope)
        .into_iter()
        .find(|r| r.name() == name)
        .map(|resource| {
            kind.nested_kinds()
                .into_iter()
                .filter_map(|child_kind| match child_kind.location() {
                    Location::Nested { key, .. } => Some((child_kind, key)),
                    _ => None,
                })
                .flat_map(|(child_kind, key)| {
                    resource
                        .children(key)
                        .into_iter()
                        .map(move |child| (child_kind, child.name().to_string()))
                })
                .collect()
        })
        .unwrap_or_default();

    let mut count = 0;
    for (child_kind, child) in &children {
        count += delete_references(doc, *child_kind, Some(name), child)?;
    }
    count += delete_references(doc, kind, parent, name)?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> ConfigDocument {
        serde_json::from_value(json!({
            "resource_groups": [{ "name": "slz-rg" }],
            "vpcs": [
                {
                    "name": "management",
                    "resource_group": "slz-rg",
                    "acls": [{ "name": "management-acl" }],
                    "subnets": [
                        { "name": "vsi-zone-1", "vpc": "management", "network_acl": "management-acl" },
                        { "name": "vsi-zone-2", "vpc": "management", "network_acl": "management-acl" }
                    ]
                },
                {
                    "name": "workload",
                    "resource_group": "slz-rg",
                    "acls": [{ "name": "management-acl" }],
                    "subnets": [{ "name": "vsi-zone-1", "vpc": "workload", "network_acl": "management-acl" }]
                }
            ],
            "security_groups": [{ "name": "vsi-sg", "vpc": "management" }],
            "vsi": [
                {
                    "name": "management-server",
                    "resource_group": "slz-rg",
                    "vpc": "management",
                    "subnets": ["vsi-zone-1", "vsi-zone-2"],
                    "security_groups": ["vsi-sg"]
                },
                {
                    "name": "workload-server",
                    "vpc": "workload",
                    "subnets": ["vsi-zone-1"],
                    "security_groups": []
                }
            ],
            "transit_gateways": [{
                "name": "tg",
                "connections": [{ "tgw": "tg", "vpc": "management" }, { "tgw": "tg", "vpc": "workload" }]
            }],
            "power_instances": [
                { "name": "primary", "workspace": "ws" },
                { "name": "follower", "workspace": "ws", "pi_affinity_instance": "primary" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn subnet_rename_stays_in_its_vpc() {
        let mut doc = doc();
        let count = rename_references(&mut doc, ResourceKind::Subnets, Some("management"), "vsi-zone-1", "app-zone-1");
        assert_eq!(count, 1);
        assert_eq!(doc.vsi[0].strings("subnets"), vec!["app-zone-1", "vsi-zone-2"]);
        assert_eq!(doc.vsi[1].strings("subnets"), vec!["vsi-zone-1"]);
    }

    #[test]
    fn acl_rename_updates_owning_vpc_subnets() {
        let mut doc = doc();
        rename_references(&mut doc, ResourceKind::Acls, Some("workload"), "management-acl", "workload-acl");
        assert_eq!(doc.vpcs[1].children("subnets")[0].text("network_acl"), "workload-acl");
        assert_eq!(doc.vpcs[0].children("subnets")[0].text("network_acl"), "management-acl");
    }

    #[test]
    fn deleting_security_group_removes_it_from_lists() {
        let mut doc = doc();
        let count = delete_references(&mut doc, ResourceKind::SecurityGroups, None, "vsi-sg").unwrap();
        assert_eq!(count, 1);
        assert!(doc.vsi[0].strings("security_groups").is_empty());
    }

    #[test]
    fn deleting_resource_group_nullifies() {
        let mut doc = doc();
        delete_references(&mut doc, ResourceKind::ResourceGroups, None, "slz-rg").unwrap();
        assert_eq!(doc.vsi[0].get("resource_group"), Some(&Value::Null));
        assert_eq!(doc.vpcs[0].get("resource_group"), Some(&Value::Null));
    }

    #[test]
    fn deleting_vpc_cascades_to_nested_resources() {
        let mut doc = doc();
        cascade_delete(&mut doc, ResourceKind::Vpcs, None, "workload").unwrap();
        assert_eq!(doc.vsi[1].get("vpc"), Some(&Value::Null));
        assert!(doc.vsi[1].strings("subnets").is_empty());
        assert_eq!(doc.vsi[0].strings("subnets"), vec!["vsi-zone-1", "vsi-zone-2"]);
        let connections = doc.transit_gateways[0].children("connections");
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].text("vpc"), "management");
    }

    #[test]
    fn affinity_targets_cannot_be_deleted() {
        let mut doc = doc();
        let before = doc.clone();
        let err = delete_references(&mut doc, ResourceKind::PowerInstances, None, "primary").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot delete power_instances 'primary': still referenced by power_instances 'follower' (pi_affinity_instance)"
        );
        assert_eq!(doc, before);
        assert!(delete_references(&mut doc, ResourceKind::PowerInstances, None, "follower").is_ok());
    }

    #[test]
    fn lists_references() {
        let doc = doc();
        let refs = references_to(&doc, ResourceKind::Vpcs, None, "management");
        let holders: Vec<_> = refs.iter().map(|r| (r.holder, r.name.as_str())).collect();
        assert!(holders.contains(&(ResourceKind::SecurityGroups, "vsi-sg")));
        assert!(holders.contains(&(ResourceKind::Vsi, "management-server")));
        assert!(holders.contains(&(ResourceKind::TransitGateways, "tg")));
    }

    #[test]
    fn volume_keys_follow_their_server_kms() {
        let mut doc: ConfigDocument = serde_json::from_value(json!({
            "key_management": [
                { "name": "kms-a", "keys": [{ "name": "key" }] },
                { "name": "kms-b", "keys": [{ "name": "key" }] }
            ],
            "vsi": [
                { "name": "a", "kms": "kms-a", "encryption_key": "key", "volumes": [{ "name": "a-vol", "encryption_key": "key" }] },
                { "name": "b", "kms": "kms-b", "encryption_key": "key", "volumes": [{ "name": "b-vol", "encryption_key": "key" }] }
            ]
        }))
        .unwrap();
        let count = rename_references(&mut doc, ResourceKind::EncryptionKeys, Some("kms-a"), "key", "renamed");
        assert_eq!(count, 2);
        assert_eq!(doc.vsi[0].children("volumes")[0].text("encryption_key"), "renamed");
        assert_eq!(doc.vsi[1].text("encryption_key"), "key");
        assert_eq!(doc.vsi[1].children("volumes")[0].text("encryption_key"), "key");
    }

    #[test]
    fn every_site_targets_a_named_kind() {
        for site in sites() {
            assert_ne!(site.target, ResourceKind::Options, "{:?}", site);
            assert!(!matches!(site.holder.location(), Location::Derived { .. }));
        }
    }
}
