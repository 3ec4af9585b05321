//! Derive - Fields computed from other parts of the document
//!
//! Subnet tiers are grouped from each VPC's subnets; with dynamic subnets
//! enabled, subnet CIDR blocks and the matching address prefixes are
//! allocated from the VPC's position, the subnet's zone and its tier's
//! position. Every function here is deterministic, so running [`recompute`]
//! twice in a row leaves the document unchanged.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::document::{Collection, ConfigDocument, Resource, ResourceExt};
use crate::kind::{Location, ParentField, ResourceKind};

/// VPCs beyond this index cannot be given a dynamic CIDR
pub const MAX_DYNAMIC_VPCS: usize = 10;

/// Tiers beyond this index cannot be given a dynamic CIDR
pub const MAX_DYNAMIC_TIERS: usize = 25;

/// A named group of same-purpose subnets spread across zones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetTier {
    pub name: String,
    /// Number of zones the tier spans
    pub zones: u8,
    /// Explicit zones of an advanced tier
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub select_zones: Vec<u8>,
    #[serde(default)]
    pub advanced: bool,
}

impl SubnetTier {
    /// Zones the tier occupies, in ascending order
    pub fn zone_list(&self) -> Vec<u8> {
        if self.advanced {
            self.select_zones.clone()
        } else {
            (1..=self.zones).collect()
        }
    }

    /// Name of the tier's subnet in `zone`
    pub fn subnet_name(&self, zone: u8) -> String {
        format!("{}-zone-{}", self.name, zone)
    }
}

/// Tiers of every VPC, keyed by VPC name
pub type TierMap = BTreeMap<String, Vec<SubnetTier>>;

/// Zone number of a subnet (numbers or numeric strings)
pub fn subnet_zone(subnet: &Resource) -> Option<u8> {
    subnet
        .number("zone")
        .filter(|z| z.fract() == 0.0 && (1.0..=3.0).contains(z))
        .map(|z| z as u8)
}

/// Tier a subnet belongs to: its `tier` field, otherwise its name without
/// the `-zone-<n>` suffix
pub fn tier_name(subnet: &Resource) -> &str {
    if let Some(tier) = subnet.str_field("tier").filter(|t| !t.is_empty()) {
        return tier;
    }
    let name = subnet.name();
    match name.rsplit_once("-zone-") {
        Some((tier, zone)) if !zone.is_empty() && zone.bytes().all(|b| b.is_ascii_digit()) => tier,
        _ => name,
    }
}

/// Tiers of one VPC, in order of first appearance
pub fn vpc_tiers(vpc: &Resource) -> Vec<SubnetTier> {
    let mut order: Vec<&str> = Vec::new();
    let mut zones: BTreeMap<&str, Vec<u8>> = BTreeMap::new();
    let mut advanced: BTreeMap<&str, bool> = BTreeMap::new();

    for subnet in vpc.children("subnets") {
        let tier = tier_name(subnet);
        if !order.contains(&tier) {
            order.push(tier);
        }
        let entry = zones.entry(tier).or_default();
        if let Some(zone) = subnet_zone(subnet)
            && !entry.contains(&zone)
        {
            entry.push(zone);
        }
        *advanced.entry(tier).or_default() |= subnet.flag("advanced");
    }

    order
        .into_iter()
        .map(|name| {
            let mut select_zones = zones.remove(name).unwrap_or_default();
            select_zones.sort_unstable();
            let advanced = advanced.get(name).copied().unwrap_or(false);
            SubnetTier {
                name: name.to_string(),
                zones: select_zones.len() as u8,
                select_zones: if advanced { select_zones } else { Vec::new() },
                advanced,
            }
        })
        .collect()
}

/// Tiers of every VPC in the document
pub fn subnet_tiers(doc: &ConfigDocument) -> TierMap {
    doc.vpcs
        .iter()
        .map(|vpc| (vpc.name().to_string(), vpc_tiers(vpc)))
        .collect()
}

/// Dynamic CIDR for a subnet: `10.<10*zone + vpc>.<10*(tier + 1)>.0/24`.
/// `None` when the VPC or tier index is out of the addressable range.
pub fn dynamic_cidr(zone: u8, vpc_index: usize, tier_index: usize) -> Option<String> {
    if vpc_index >= MAX_DYNAMIC_VPCS || tier_index >= MAX_DYNAMIC_TIERS || !(1..=3).contains(&zone) {
        return None;
    }
    Some(format!(
        "10.{}.{}.0/24",
        10 * usize::from(zone) + vpc_index,
        10 * (tier_index + 1)
    ))
}

/// Recompute every derived field of the document
pub fn recompute(doc: &mut ConfigDocument) {
    if !doc.dynamic_subnets() {
        return;
    }
    let mut changed = 0usize;
    for (vpc_index, vpc) in doc.vpcs.iter_mut().enumerate() {
        changed += allocate_vpc_cidrs(vpc, vpc_index);
    }
    debug!("Recomputed dynamic subnets: {} CIDR blocks changed", changed);
}

/// Whether the address prefixes of `vpc` are regenerated from its subnets
/// on every recompute
pub fn derives_address_prefixes(doc: &ConfigDocument, vpc: &Resource) -> bool {
    doc.dynamic_subnets() && !vpc.flag("manual_address_prefix_management")
}

/// Rewrite the parent back-reference fields of every nested resource
/// (`subnet.vpc`, `rule.acl`, `worker_pool.cluster`, ...) from its owners.
/// Returns the number of fields changed.
pub fn refresh_parent_fields(doc: &mut ConfigDocument) -> usize {
    let mut changed = 0;
    for collection in Collection::ALL {
        let kind = ResourceKind::for_collection(*collection);
        if kind.nested_kinds().is_empty() {
            continue;
        }
        for record in doc.collection_mut(*collection) {
            changed += refresh_children(record, kind, None);
        }
    }
    if changed > 0 {
        debug!("Refreshed {} parent reference fields", changed);
    }
    changed
}

fn refresh_children(record: &mut Resource, kind: ResourceKind, grandparent: Option<&str>) -> usize {
    let name = record.name().to_string();
    let vpc = record.get("vpc").cloned().unwrap_or(Value::Null);
    let mut changed = 0;

    for child_kind in kind.nested_kinds() {
        let Location::Nested { key, .. } = child_kind.location() else {
            continue;
        };
        for child in record.children_mut(key) {
            for (field, source) in child_kind.parent_fields() {
                let value = match source {
                    ParentField::Parent => Value::from(name.as_str()),
                    ParentField::ParentVpc => vpc.clone(),
                    ParentField::Grandparent => match grandparent {
                        Some(grandparent) => Value::from(grandparent),
                        None => continue,
                    },
                };
                if child.get(*field) != Some(&value) {
                    child.insert(field.to_string(), value);
                    changed += 1;
                }
            }
            changed += refresh_children(child, child_kind, Some(&name));
        }
    }
    changed
}

fn allocate_vpc_cidrs(vpc: &mut Resource, vpc_index: usize) -> usize {
    let vpc_name = vpc.name().to_string();
    let tiers: Vec<String> = vpc_tiers(vpc).into_iter().map(|t| t.name).collect();
    let mut changed = 0;

    for subnet in vpc.children_mut("subnets") {
        let tier_index = tiers.iter().position(|t| t == tier_name(subnet)).unwrap_or(0);
        let Some(zone) = subnet_zone(subnet) else {
            continue;
        };
        match dynamic_cidr(zone, vpc_index, tier_index) {
            Some(cidr) => {
                if subnet.text("cidr") != cidr {
                    subnet.insert("cidr".to_string(), Value::String(cidr));
                    changed += 1;
                }
            }
            None => warn!(
                "No dynamic CIDR for subnet '{}' in VPC '{}' (vpc index {}, tier index {}); keeping '{}'",
                subnet.name(),
                vpc_name,
                vpc_index,
                tier_index,
                subnet.text("cidr")
            ),
        }
    }

    if !vpc.flag("manual_address_prefix_management") {
        let prefixes: Vec<Value> = vpc
            .children("subnets")
            .iter()
            .filter(|s| !s.is_blank("cidr"))
            .map(|s| {
                json!({
                    "name": s.name(),
                    "cidr": s.text("cidr"),
                    "zone": s.get("zone").cloned().unwrap_or(Value::Null),
                    "vpc": vpc_name,
                })
            })
            .collect();
        if vpc.get("address_prefixes") != Some(&Value::Array(prefixes.clone())) {
            vpc.insert("address_prefixes".to_string(), Value::Array(prefixes));
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> ConfigDocument {
        serde_json::from_value(json!({
            "_options": { "dynamic_subnets": true, "zones": 3 },
            "vpcs": [
                {
                    "name": "management",
                    "subnets": [
                        { "name": "vsi-zone-1", "zone": 1, "cidr": "" },
                        { "name": "vpe-zone-1", "zone": 1, "cidr": "" },
                        { "name": "vsi-zone-2", "zone": 2, "cidr": "" },
                        { "name": "vpn-zone-1", "zone": "1", "tier": "vpn", "cidr": "" }
                    ]
                },
                {
                    "name": "workload",
                    "manual_address_prefix_management": true,
                    "subnets": [{ "name": "vsi-zone-3", "zone": 3, "cidr": "" }]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn tier_names() {
        let subnet = json!({ "name": "vsi-zone-1" });
        assert_eq!(tier_name(subnet.as_object().unwrap()), "vsi");
        let subnet = json!({ "name": "odd-name" });
        assert_eq!(tier_name(subnet.as_object().unwrap()), "odd-name");
        let subnet = json!({ "name": "vsi-zone-1", "tier": "custom" });
        assert_eq!(tier_name(subnet.as_object().unwrap()), "custom");
    }

    #[test]
    fn tiers_group_subnets_by_name() {
        let doc = doc();
        let tiers = subnet_tiers(&doc);
        let management = &tiers["management"];
        let names: Vec<_> = management.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["vsi", "vpe", "vpn"]);
        assert_eq!(management[0].zones, 2);
        assert!(!management[0].advanced);
        assert_eq!(tiers["workload"][0].zones, 1);
    }

    #[test]
    fn advanced_tiers_keep_selected_zones() {
        let vpc = json!({
            "name": "vpc",
            "subnets": [
                { "name": "db-zone-3", "zone": 3, "advanced": true },
                { "name": "db-zone-1", "zone": 1 }
            ]
        });
        let tiers = vpc_tiers(vpc.as_object().unwrap());
        assert_eq!(tiers[0].select_zones, vec![1, 3]);
        assert!(tiers[0].advanced);
        assert_eq!(tiers[0].zone_list(), vec![1, 3]);
    }

    #[test]
    fn dynamic_cidr_formula() {
        assert_eq!(dynamic_cidr(1, 0, 0).as_deref(), Some("10.10.10.0/24"));
        assert_eq!(dynamic_cidr(3, 2, 4).as_deref(), Some("10.32.50.0/24"));
        assert_eq!(dynamic_cidr(1, 10, 0), None);
        assert_eq!(dynamic_cidr(1, 0, 25), None);
    }

    #[test]
    fn recompute_allocates_cidrs_and_prefixes() {
        let mut doc = doc();
        recompute(&mut doc);
        let subnets = doc.vpcs[0].children("subnets");
        assert_eq!(subnets[0].text("cidr"), "10.10.10.0/24");
        assert_eq!(subnets[1].text("cidr"), "10.10.20.0/24");
        assert_eq!(subnets[2].text("cidr"), "10.20.10.0/24");
        assert_eq!(subnets[3].text("cidr"), "10.10.30.0/24");
        assert_eq!(doc.vpcs[0].list_len("address_prefixes"), 4);

        let workload = doc.vpcs[1].children("subnets");
        assert_eq!(workload[0].text("cidr"), "10.31.10.0/24");
        assert!(doc.vpcs[1].get("address_prefixes").is_none());
        assert!(derives_address_prefixes(&doc, &doc.vpcs[0]));
        assert!(!derives_address_prefixes(&doc, &doc.vpcs[1]));
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut once = doc();
        recompute(&mut once);
        let mut twice = once.clone();
        recompute(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn parent_fields_follow_their_owners() {
        let mut doc: ConfigDocument = serde_json::from_value(json!({
            "vpcs": [{
                "name": "edge",
                "subnets": [{ "name": "f5-zone-1", "vpc": "old" }],
                "acls": [{ "name": "edge-acl", "rules": [{ "name": "allow-all" }] }]
            }],
            "clusters": [{ "name": "iks", "vpc": "edge", "worker_pools": [{ "name": "logging" }] }]
        }))
        .unwrap();
        assert_eq!(refresh_parent_fields(&mut doc), 6);

        let vpc = &doc.vpcs[0];
        assert_eq!(vpc.children("subnets")[0].text("vpc"), "edge");
        let rule = vpc.children("acls")[0].children("rules")[0];
        assert_eq!(rule.text("acl"), "edge-acl");
        assert_eq!(rule.text("vpc"), "edge");
        let pool = doc.clusters[0].children("worker_pools")[0];
        assert_eq!(pool.text("cluster"), "iks");
        assert_eq!(pool.text("vpc"), "edge");

        assert_eq!(refresh_parent_fields(&mut doc), 0);
    }

    #[test]
    fn static_subnets_are_untouched() {
        let mut doc = doc();
        doc.options.insert("dynamic_subnets".to_string(), json!(false));
        let before = doc.clone();
        recompute(&mut doc);
        assert_eq!(doc, before);
    }
}
