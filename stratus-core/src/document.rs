//! Document - The configuration document and its resource collections
//!
//! A document is a record of named resource collections plus a handful of
//! singleton objects. Resources themselves are JSON objects whose shape is
//! described by the schema registry; the helpers in [`ResourceExt`] give
//! typed access to their fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single resource object (e.g. one VPC, one ACL rule)
pub type Resource = Map<String, Value>;

/// Top-level resource collections of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    ResourceGroups,
    KeyManagement,
    ObjectStorage,
    SecretsManager,
    Vpcs,
    VirtualPrivateEndpoints,
    SecurityGroups,
    VpnGateways,
    SshKeys,
    TransitGateways,
    Clusters,
    Vsi,
    Appid,
    EventStreams,
    LoadBalancers,
    AccessGroups,
    RoutingTables,
    CbrZones,
    CbrRules,
    Dns,
    Power,
    PowerInstances,
    PowerVolumes,
    VpnServers,
    ClassicSshKeys,
    ClassicVlans,
    ClassicGateways,
    ClassicSecurityGroups,
    ClassicBareMetal,
    ClassicVsi,
    Icd,
    FortigateVnf,
}

impl Collection {
    pub const ALL: &'static [Collection] = &[
        Collection::ResourceGroups,
        Collection::KeyManagement,
        Collection::ObjectStorage,
        Collection::SecretsManager,
        Collection::Vpcs,
        Collection::VirtualPrivateEndpoints,
        Collection::SecurityGroups,
        Collection::VpnGateways,
        Collection::SshKeys,
        Collection::TransitGateways,
        Collection::Clusters,
        Collection::Vsi,
        Collection::Appid,
        Collection::EventStreams,
        Collection::LoadBalancers,
        Collection::AccessGroups,
        Collection::RoutingTables,
        Collection::CbrZones,
        Collection::CbrRules,
        Collection::Dns,
        Collection::Power,
        Collection::PowerInstances,
        Collection::PowerVolumes,
        Collection::VpnServers,
        Collection::ClassicSshKeys,
        Collection::ClassicVlans,
        Collection::ClassicGateways,
        Collection::ClassicSecurityGroups,
        Collection::ClassicBareMetal,
        Collection::ClassicVsi,
        Collection::Icd,
        Collection::FortigateVnf,
    ];

    /// JSON key of this collection in a serialized document
    pub fn key(&self) -> &'static str {
        match self {
            Collection::ResourceGroups => "resource_groups",
            Collection::KeyManagement => "key_management",
            Collection::ObjectStorage => "object_storage",
            Collection::SecretsManager => "secrets_manager",
            Collection::Vpcs => "vpcs",
            Collection::VirtualPrivateEndpoints => "virtual_private_endpoints",
            Collection::SecurityGroups => "security_groups",
            Collection::VpnGateways => "vpn_gateways",
            Collection::SshKeys => "ssh_keys",
            Collection::TransitGateways => "transit_gateways",
            Collection::Clusters => "clusters",
            Collection::Vsi => "vsi",
            Collection::Appid => "appid",
            Collection::EventStreams => "event_streams",
            Collection::LoadBalancers => "load_balancers",
            Collection::AccessGroups => "access_groups",
            Collection::RoutingTables => "routing_tables",
            Collection::CbrZones => "cbr_zones",
            Collection::CbrRules => "cbr_rules",
            Collection::Dns => "dns",
            Collection::Power => "power",
            Collection::PowerInstances => "power_instances",
            Collection::PowerVolumes => "power_volumes",
            Collection::VpnServers => "vpn_servers",
            Collection::ClassicSshKeys => "classic_ssh_keys",
            Collection::ClassicVlans => "classic_vlans",
            Collection::ClassicGateways => "classic_gateways",
            Collection::ClassicSecurityGroups => "classic_security_groups",
            Collection::ClassicBareMetal => "classic_bare_metal",
            Collection::ClassicVsi => "classic_vsi",
            Collection::Icd => "icd",
            Collection::FortigateVnf => "fortigate_vnf",
        }
    }

    /// Collections present since the first document format. Documents
    /// missing any of these are rejected on import.
    pub fn is_core(&self) -> bool {
        matches!(
            self,
            Collection::ResourceGroups
                | Collection::KeyManagement
                | Collection::ObjectStorage
                | Collection::SecretsManager
                | Collection::Vpcs
                | Collection::VirtualPrivateEndpoints
                | Collection::SecurityGroups
                | Collection::VpnGateways
                | Collection::SshKeys
                | Collection::TransitGateways
                | Collection::Clusters
                | Collection::Vsi
                | Collection::Appid
                | Collection::EventStreams
                | Collection::LoadBalancers
                | Collection::AccessGroups
                | Collection::RoutingTables
        )
    }
}

/// Singleton objects of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Singleton {
    Options,
    IamAccountSettings,
    Atracker,
    Logdna,
    Sysdig,
    Scc,
}

impl Singleton {
    pub const ALL: &'static [Singleton] = &[
        Singleton::Options,
        Singleton::IamAccountSettings,
        Singleton::Atracker,
        Singleton::Logdna,
        Singleton::Sysdig,
        Singleton::Scc,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Singleton::Options => "_options",
            Singleton::IamAccountSettings => "iam_account_settings",
            Singleton::Atracker => "atracker",
            Singleton::Logdna => "logdna",
            Singleton::Sysdig => "sysdig",
            Singleton::Scc => "scc",
        }
    }

    pub fn is_core(&self) -> bool {
        matches!(
            self,
            Singleton::Options
                | Singleton::IamAccountSettings
                | Singleton::Atracker
                | Singleton::Scc
        )
    }
}

/// The configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(rename = "_options", default)]
    pub options: Resource,
    #[serde(default)]
    pub resource_groups: Vec<Resource>,
    #[serde(default)]
    pub key_management: Vec<Resource>,
    #[serde(default)]
    pub object_storage: Vec<Resource>,
    #[serde(default)]
    pub secrets_manager: Vec<Resource>,
    #[serde(default)]
    pub atracker: Resource,
    #[serde(default)]
    pub vpcs: Vec<Resource>,
    #[serde(default)]
    pub virtual_private_endpoints: Vec<Resource>,
    #[serde(default)]
    pub security_groups: Vec<Resource>,
    #[serde(default)]
    pub vpn_gateways: Vec<Resource>,
    #[serde(default)]
    pub ssh_keys: Vec<Resource>,
    #[serde(default)]
    pub transit_gateways: Vec<Resource>,
    #[serde(default)]
    pub clusters: Vec<Resource>,
    #[serde(default)]
    pub vsi: Vec<Resource>,
    #[serde(default)]
    pub appid: Vec<Resource>,
    #[serde(default)]
    pub event_streams: Vec<Resource>,
    #[serde(default)]
    pub load_balancers: Vec<Resource>,
    #[serde(default)]
    pub iam_account_settings: Resource,
    #[serde(default)]
    pub access_groups: Vec<Resource>,
    #[serde(default)]
    pub scc: Resource,
    #[serde(default)]
    pub routing_tables: Vec<Resource>,
    #[serde(default)]
    pub cbr_zones: Vec<Resource>,
    #[serde(default)]
    pub cbr_rules: Vec<Resource>,
    #[serde(default)]
    pub dns: Vec<Resource>,
    #[serde(default)]
    pub logdna: Resource,
    #[serde(default)]
    pub sysdig: Resource,
    #[serde(default)]
    pub power: Vec<Resource>,
    #[serde(default)]
    pub power_instances: Vec<Resource>,
    #[serde(default)]
    pub power_volumes: Vec<Resource>,
    #[serde(default)]
    pub vpn_servers: Vec<Resource>,
    #[serde(default)]
    pub classic_ssh_keys: Vec<Resource>,
    #[serde(default)]
    pub classic_vlans: Vec<Resource>,
    #[serde(default)]
    pub classic_gateways: Vec<Resource>,
    #[serde(default)]
    pub classic_security_groups: Vec<Resource>,
    #[serde(default)]
    pub classic_bare_metal: Vec<Resource>,
    #[serde(default)]
    pub classic_vsi: Vec<Resource>,
    #[serde(default)]
    pub icd: Vec<Resource>,
    #[serde(default)]
    pub fortigate_vnf: Vec<Resource>,
    #[serde(rename = "_schematics", default, skip_serializing_if = "Option::is_none")]
    pub schematics: Option<Resource>,
    /// Keys this crate does not model (e.g. generator-only collections),
    /// carried through import/export untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection(&self, collection: Collection) -> &Vec<Resource> {
        match collection {
            Collection::ResourceGroups => &self.resource_groups,
            Collection::KeyManagement => &self.key_management,
            Collection::ObjectStorage => &self.object_storage,
            Collection::SecretsManager => &self.secrets_manager,
            Collection::Vpcs => &self.vpcs,
            Collection::VirtualPrivateEndpoints => &self.virtual_private_endpoints,
            Collection::SecurityGroups => &self.security_groups,
            Collection::VpnGateways => &self.vpn_gateways,
            Collection::SshKeys => &self.ssh_keys,
            Collection::TransitGateways => &self.transit_gateways,
            Collection::Clusters => &self.clusters,
            Collection::Vsi => &self.vsi,
            Collection::Appid => &self.appid,
            Collection::EventStreams => &self.event_streams,
            Collection::LoadBalancers => &self.load_balancers,
            Collection::AccessGroups => &self.access_groups,
            Collection::RoutingTables => &self.routing_tables,
            Collection::CbrZones => &self.cbr_zones,
            Collection::CbrRules => &self.cbr_rules,
            Collection::Dns => &self.dns,
            Collection::Power => &self.power,
            Collection::PowerInstances => &self.power_instances,
            Collection::PowerVolumes => &self.power_volumes,
            Collection::VpnServers => &self.vpn_servers,
            Collection::ClassicSshKeys => &self.classic_ssh_keys,
            Collection::ClassicVlans => &self.classic_vlans,
            Collection::ClassicGateways => &self.classic_gateways,
            Collection::ClassicSecurityGroups => &self.classic_security_groups,
            Collection::ClassicBareMetal => &self.classic_bare_metal,
            Collection::ClassicVsi => &self.classic_vsi,
            Collection::Icd => &self.icd,
            Collection::FortigateVnf => &self.fortigate_vnf,
        }
    }

    pub fn collection_mut(&mut self, collection: Collection) -> &mut Vec<Resource> {
        match collection {
            Collection::ResourceGroups => &mut self.resource_groups,
            Collection::KeyManagement => &mut self.key_management,
            Collection::ObjectStorage => &mut self.object_storage,
            Collection::SecretsManager => &mut self.secrets_manager,
            Collection::Vpcs => &mut self.vpcs,
            Collection::VirtualPrivateEndpoints => &mut self.virtual_private_endpoints,
            Collection::SecurityGroups => &mut self.security_groups,
            Collection::VpnGateways => &mut self.vpn_gateways,
            Collection::SshKeys => &mut self.ssh_keys,
            Collection::TransitGateways => &mut self.transit_gateways,
            Collection::Clusters => &mut self.clusters,
            Collection::Vsi => &mut self.vsi,
            Collection::Appid => &mut self.appid,
            Collection::EventStreams => &mut self.event_streams,
            Collection::LoadBalancers => &mut self.load_balancers,
            Collection::AccessGroups => &mut self.access_groups,
            Collection::RoutingTables => &mut self.routing_tables,
            Collection::CbrZones => &mut self.cbr_zones,
            Collection::CbrRules => &mut self.cbr_rules,
            Collection::Dns => &mut self.dns,
            Collection::Power => &mut self.power,
            Collection::PowerInstances => &mut self.power_instances,
            Collection::PowerVolumes => &mut self.power_volumes,
            Collection::VpnServers => &mut self.vpn_servers,
            Collection::ClassicSshKeys => &mut self.classic_ssh_keys,
            Collection::ClassicVlans => &mut self.classic_vlans,
            Collection::ClassicGateways => &mut self.classic_gateways,
            Collection::ClassicSecurityGroups => &mut self.classic_security_groups,
            Collection::ClassicBareMetal => &mut self.classic_bare_metal,
            Collection::ClassicVsi => &mut self.classic_vsi,
            Collection::Icd => &mut self.icd,
            Collection::FortigateVnf => &mut self.fortigate_vnf,
        }
    }

    pub fn singleton(&self, singleton: Singleton) -> &Resource {
        match singleton {
            Singleton::Options => &self.options,
            Singleton::IamAccountSettings => &self.iam_account_settings,
            Singleton::Atracker => &self.atracker,
            Singleton::Logdna => &self.logdna,
            Singleton::Sysdig => &self.sysdig,
            Singleton::Scc => &self.scc,
        }
    }

    pub fn singleton_mut(&mut self, singleton: Singleton) -> &mut Resource {
        match singleton {
            Singleton::Options => &mut self.options,
            Singleton::IamAccountSettings => &mut self.iam_account_settings,
            Singleton::Atracker => &mut self.atracker,
            Singleton::Logdna => &mut self.logdna,
            Singleton::Sysdig => &mut self.sysdig,
            Singleton::Scc => &mut self.scc,
        }
    }

    /// Find a top-level resource by name
    pub fn find(&self, collection: Collection, name: &str) -> Option<&Resource> {
        self.collection(collection).iter().find(|r| r.name() == name)
    }

    pub fn find_mut(&mut self, collection: Collection, name: &str) -> Option<&mut Resource> {
        self.collection_mut(collection)
            .iter_mut()
            .find(|r| r.name() == name)
    }

    /// Deployment prefix from `_options`
    pub fn prefix(&self) -> &str {
        self.options.text("prefix")
    }

    /// Region from `_options`
    pub fn region(&self) -> &str {
        self.options.text("region")
    }

    /// Number of zones the deployment spans (`_options.zones`, defaults to 3)
    pub fn zones(&self) -> u8 {
        self.options
            .number("zones")
            .filter(|z| (1.0..=3.0).contains(z))
            .map(|z| z as u8)
            .unwrap_or(3)
    }

    pub fn dynamic_subnets(&self) -> bool {
        self.options.flag("dynamic_subnets")
    }
}

/// Typed accessors over a resource object
pub trait ResourceExt {
    /// The `name` field, or `""` when absent
    fn name(&self) -> &str;
    /// A string field, `None` when absent, null or not a string
    fn str_field(&self, key: &str) -> Option<&str>;
    /// A string field, `""` when absent
    fn text(&self, key: &str) -> &str;
    /// True when the field is absent, null, an empty string or the literal "null"
    fn is_blank(&self, key: &str) -> bool;
    /// String members of an array field
    fn strings(&self, key: &str) -> Vec<&str>;
    /// Number of elements of an array field (0 when not an array)
    fn list_len(&self, key: &str) -> usize;
    /// Boolean field, false when absent
    fn flag(&self, key: &str) -> bool;
    /// Numeric field (numbers or numeric strings)
    fn number(&self, key: &str) -> Option<f64>;
    /// Object members of an array field
    fn children(&self, key: &str) -> Vec<&Resource>;
    /// Mutable object members of an array field
    fn children_mut(&mut self, key: &str) -> Vec<&mut Resource>;
    /// Mutable array field, created empty when missing
    fn array_mut(&mut self, key: &str) -> &mut Vec<Value>;
    /// Nested object field
    fn object(&self, key: &str) -> Option<&Resource>;
}

impl ResourceExt for Resource {
    fn name(&self) -> &str {
        self.text("name")
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn text(&self, key: &str) -> &str {
        self.str_field(key).unwrap_or("")
    }

    fn is_blank(&self, key: &str) -> bool {
        is_blank_value(self.get(key))
    }

    fn strings(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    fn list_len(&self, key: &str) -> usize {
        self.get(key).and_then(Value::as_array).map_or(0, Vec::len)
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(value_as_number)
    }

    fn children(&self, key: &str) -> Vec<&Resource> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_object).collect())
            .unwrap_or_default()
    }

    fn children_mut(&mut self, key: &str) -> Vec<&mut Resource> {
        self.get_mut(key)
            .and_then(Value::as_array_mut)
            .map(|items| items.iter_mut().filter_map(Value::as_object_mut).collect())
            .unwrap_or_default()
    }

    fn array_mut(&mut self, key: &str) -> &mut Vec<Value> {
        let slot = self.entry(key.to_string()).or_insert(Value::Null);
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        match slot {
            Value::Array(items) => items,
            _ => unreachable!("slot was just replaced with an array"),
        }
    }

    fn object(&self, key: &str) -> Option<&Resource> {
        self.get(key).and_then(Value::as_object)
    }
}

/// True for absent, null, `""` and `"null"` values
pub fn is_blank_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty() || s == "null",
        _ => false,
    }
}

/// Interpret a JSON number or numeric string as `f64`
pub fn value_as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource(value: Value) -> Resource {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn collection_keys_are_unique() {
        let mut keys: Vec<_> = Collection::ALL.iter().map(|c| c.key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), Collection::ALL.len());
    }

    #[test]
    fn document_round_trips_unknown_keys() {
        let value = json!({
            "_options": { "prefix": "iac", "zones": 2 },
            "vpcs": [{ "name": "management" }],
            "f5_vsi": [{ "name": "f5" }]
        });
        let doc: ConfigDocument = serde_json::from_value(value).unwrap();
        assert_eq!(doc.vpcs.len(), 1);
        assert_eq!(doc.zones(), 2);
        assert!(doc.extra.contains_key("f5_vsi"));

        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back["f5_vsi"][0]["name"], "f5");
    }

    #[test]
    fn zones_default_to_three() {
        let doc = ConfigDocument::new();
        assert_eq!(doc.zones(), 3);
    }

    #[test]
    fn blank_values() {
        let r = resource(json!({ "a": null, "b": "", "c": "null", "d": "x", "e": 0 }));
        assert!(r.is_blank("a"));
        assert!(r.is_blank("b"));
        assert!(r.is_blank("c"));
        assert!(r.is_blank("missing"));
        assert!(!r.is_blank("d"));
        assert!(!r.is_blank("e"));
    }

    #[test]
    fn numbers_accept_numeric_strings() {
        let r = resource(json!({ "a": "12", "b": 3.5, "c": "abc", "d": "" }));
        assert_eq!(r.number("a"), Some(12.0));
        assert_eq!(r.number("b"), Some(3.5));
        assert_eq!(r.number("c"), None);
        assert_eq!(r.number("d"), None);
    }

    #[test]
    fn array_mut_creates_missing_arrays() {
        let mut r = resource(json!({ "name": "x", "rules": null }));
        r.array_mut("rules").push(json!({ "name": "r1" }));
        assert_eq!(r.children("rules").len(), 1);
        assert_eq!(r.children("rules")[0].name(), "r1");
    }
}
