//! Classic infrastructure grouped by datacenter and VLAN

use crate::document::{ConfigDocument, Resource, ResourceExt};

/// A displayed classic resource. High availability gateways appear twice,
/// as `<name>-1` and `<name>-2`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassicRow<'a> {
    pub name: String,
    pub resource: &'a Resource,
}

fn on_vlan(resource: &Resource, datacenter: &str, vlan: &str) -> bool {
    resource.text("datacenter") == datacenter
        && (resource.text("private_vlan") == vlan || resource.text("public_vlan") == vlan)
}

fn rows<'a>(resources: &'a [Resource], datacenter: &str, vlan: &str) -> Vec<ClassicRow<'a>> {
    resources
        .iter()
        .filter(|r| on_vlan(r, datacenter, vlan))
        .map(|resource| ClassicRow {
            name: resource.name().to_string(),
            resource,
        })
        .collect()
}

/// Gateways attached to `vlan` in `datacenter`
pub fn classic_gateways_on_vlan<'a>(doc: &'a ConfigDocument, datacenter: &str, vlan: &str) -> Vec<ClassicRow<'a>> {
    let mut result = Vec::new();
    for row in rows(&doc.classic_gateways, datacenter, vlan) {
        if row.resource.flag("hadr") {
            for member in 1..=2 {
                result.push(ClassicRow {
                    name: format!("{}-{}", row.name, member),
                    resource: row.resource,
                });
            }
        } else {
            result.push(row);
        }
    }
    result
}

pub fn classic_bare_metal_on_vlan<'a>(doc: &'a ConfigDocument, datacenter: &str, vlan: &str) -> Vec<ClassicRow<'a>> {
    rows(&doc.classic_bare_metal, datacenter, vlan)
}

pub fn classic_vsi_on_vlan<'a>(doc: &'a ConfigDocument, datacenter: &str, vlan: &str) -> Vec<ClassicRow<'a>> {
    rows(&doc.classic_vsi, datacenter, vlan)
}

/// VLANs of `datacenter`, drawn as the classic subnets of that datacenter.
/// `vlan` narrows the list to one VLAN.
pub fn classic_subnets<'a>(doc: &'a ConfigDocument, datacenter: &str, vlan: Option<&str>) -> Vec<&'a Resource> {
    doc.classic_vlans
        .iter()
        .filter(|v| v.text("datacenter") == datacenter)
        .filter(|v| vlan.is_none_or(|name| v.name() == name))
        .collect()
}

/// Datacenters used by any classic VLAN, sorted and deduplicated
pub fn classic_datacenters(doc: &ConfigDocument) -> Vec<&str> {
    let mut datacenters: Vec<&str> = doc
        .classic_vlans
        .iter()
        .map(|v| v.text("datacenter"))
        .filter(|d| !d.is_empty())
        .collect();
    datacenters.sort_unstable();
    datacenters.dedup();
    datacenters
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> ConfigDocument {
        serde_json::from_value(json!({
            "classic_vlans": [
                { "name": "priv", "datacenter": "dal10", "type": "PRIVATE" },
                { "name": "pub", "datacenter": "dal10", "type": "PUBLIC" },
                { "name": "far", "datacenter": "lon04", "type": "PRIVATE" }
            ],
            "classic_gateways": [
                { "name": "gw", "datacenter": "dal10", "private_vlan": "priv", "public_vlan": "pub", "hadr": true },
                { "name": "solo", "datacenter": "dal10", "private_vlan": "priv", "public_vlan": "pub" }
            ],
            "classic_bare_metal": [{ "name": "metal", "datacenter": "dal10", "private_vlan": "priv" }],
            "classic_vsi": [{ "name": "vsi", "datacenter": "lon04", "private_vlan": "far" }]
        }))
        .unwrap()
    }

    #[test]
    fn high_availability_gateways_expand() {
        let doc = doc();
        let names: Vec<_> = classic_gateways_on_vlan(&doc, "dal10", "pub")
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["gw-1", "gw-2", "solo"]);
    }

    #[test]
    fn filters_by_datacenter_and_vlan() {
        let doc = doc();
        assert_eq!(classic_bare_metal_on_vlan(&doc, "dal10", "priv").len(), 1);
        assert!(classic_bare_metal_on_vlan(&doc, "dal10", "pub").is_empty());
        assert!(classic_vsi_on_vlan(&doc, "dal10", "far").is_empty());
        assert_eq!(classic_vsi_on_vlan(&doc, "lon04", "far").len(), 1);
        assert_eq!(classic_datacenters(&doc), vec!["dal10", "lon04"]);
    }

    #[test]
    fn vlans_are_classic_subnets() {
        let doc = doc();
        let names: Vec<_> = classic_subnets(&doc, "dal10", None).iter().map(|v| v.name()).collect();
        assert_eq!(names, vec!["priv", "pub"]);
        assert_eq!(classic_subnets(&doc, "dal10", Some("pub")).len(), 1);
        assert!(classic_subnets(&doc, "lon04", Some("pub")).is_empty());
    }
}
