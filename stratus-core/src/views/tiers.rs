//! Subnet tier projections for diagrams

use serde::Serialize;

use crate::derive::{subnet_zone, tier_name, vpc_tiers};
use crate::document::{ConfigDocument, Resource, ResourceExt};
use crate::schemas::common::is_missing;

/// Tier name shown for a VPC whose services are not attached to a subnet
pub const NO_SUBNETS: &str = "NO_SUBNETS";

/// One zone of a tier: its subnet, or an empty placeholder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TierSlot<'a> {
    Subnet(&'a Resource),
    Placeholder { display: &'static str, zone: String },
}

impl TierSlot<'_> {
    pub fn placeholder(zone: u8) -> Self {
        TierSlot::Placeholder {
            display: "none",
            zone: zone.to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, TierSlot::Placeholder { .. })
    }
}

/// One slot per zone for `tier` in `vpc`. Subnets are matched by their
/// `zone` field, not their position. The projection covers every zone of
/// the deployment and any higher zone a subnet of the tier uses.
pub fn tier_projection<'a>(doc: &ConfigDocument, vpc: &'a Resource, tier: &str) -> Vec<TierSlot<'a>> {
    let subnets: Vec<&'a Resource> = vpc
        .children("subnets")
        .into_iter()
        .filter(|s| tier_name(s) == tier)
        .collect();
    let highest = subnets.iter().filter_map(|s| subnet_zone(s)).max().unwrap_or(0);
    let zones = doc.zones().max(highest);

    (1..=zones)
        .map(|zone| {
            subnets
                .iter()
                .copied()
                .find(|s| subnet_zone(s) == Some(zone))
                .map_or_else(|| TierSlot::placeholder(zone), TierSlot::Subnet)
        })
        .collect()
}

/// True when a zone-attached service in `vpc` has no subnet selected
pub fn has_unattached_services(doc: &ConfigDocument, vpc: &str) -> bool {
    let in_vpc = |r: &&Resource| r.text("vpc") == vpc;
    let no_subnets = |r: &Resource| is_missing(r.get("subnets"));

    doc.vsi.iter().filter(in_vpc).any(no_subnets)
        || doc.clusters.iter().filter(in_vpc).any(no_subnets)
        || doc.vpn_servers.iter().filter(in_vpc).any(no_subnets)
        || doc.virtual_private_endpoints.iter().filter(in_vpc).any(no_subnets)
        || doc.vpn_gateways.iter().filter(in_vpc).any(|g| g.is_blank("subnet"))
}

/// Tier names to display for a VPC, followed by [`NO_SUBNETS`] when a
/// service still needs a subnet
pub fn display_tiers(doc: &ConfigDocument, vpc: &Resource) -> Vec<String> {
    let mut tiers: Vec<String> = vpc_tiers(vpc).into_iter().map(|t| t.name).collect();
    if has_unattached_services(doc, vpc.name()) {
        tiers.push(NO_SUBNETS.to_string());
    }
    tiers
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> ConfigDocument {
        serde_json::from_value(json!({
            "_options": { "zones": 3 },
            "vpcs": [{
                "name": "management",
                "subnets": [
                    { "name": "vsi-zone-3", "zone": 3 },
                    { "name": "vpe-zone-1", "zone": 1 },
                    { "name": "vsi-zone-1", "zone": 1 }
                ]
            }],
            "vsi": [{ "name": "server", "vpc": "management", "subnets": ["vsi-zone-1"] }]
        }))
        .unwrap()
    }

    #[test]
    fn tier_with_gap_gets_placeholder() {
        let doc = doc();
        let vpc = &doc.vpcs[0];
        let slots = tier_projection(&doc, vpc, "vsi");
        assert_eq!(slots.len(), 3);
        assert!(matches!(slots[0], TierSlot::Subnet(s) if s.name() == "vsi-zone-1"));
        assert_eq!(slots[1], TierSlot::placeholder(2));
        assert!(matches!(slots[2], TierSlot::Subnet(s) if s.name() == "vsi-zone-3"));
        assert_eq!(
            serde_json::to_value(&slots[1]).unwrap(),
            json!({ "display": "none", "zone": "2" })
        );
    }

    #[test]
    fn projection_extends_past_configured_zones() {
        let mut doc = doc();
        doc.options.insert("zones".to_string(), json!(1));
        let vpc = &doc.vpcs[0];
        let slots = tier_projection(&doc, vpc, "vsi");
        assert_eq!(slots.len(), 3);
        assert_eq!(tier_projection(&doc, vpc, "vpe").len(), 1);
    }

    #[test]
    fn unattached_services_add_sentinel_tier() {
        let mut doc = doc();
        assert_eq!(display_tiers(&doc, &doc.vpcs[0]), vec!["vsi", "vpe"]);
        doc.vpn_gateways.push(json!({ "name": "vpn", "vpc": "management", "subnet": null }).as_object().cloned().unwrap());
        assert_eq!(display_tiers(&doc, &doc.vpcs[0]), vec!["vsi", "vpe", NO_SUBNETS]);
        assert!(!has_unattached_services(&doc, "workload"));
    }
}
