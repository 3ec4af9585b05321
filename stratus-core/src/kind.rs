//! Kind - Resource kinds and where they live in a document

use std::fmt;
use std::str::FromStr;

use crate::document::{Collection, Singleton};

/// Where resources of a kind are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// A singleton object at the document root
    Singleton(Singleton),
    /// A top-level collection
    TopLevel(Collection),
    /// An array field (`key`) inside each resource of the parent kind
    Nested {
        parent: ResourceKind,
        key: &'static str,
    },
    /// Derived from other resources, never stored (subnet tiers)
    Derived { parent: ResourceKind },
}

/// How the `name` field of a kind is validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRule {
    /// Lowercase resource name syntax, bounded length, unique in scope
    Standard { max_len: usize },
    /// Any non-empty string, unique in scope
    Free,
    /// Fully qualified domain name, unique in scope
    Domain,
    /// The kind has no identity name (singletons)
    None,
}

macro_rules! resource_kinds {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Every kind of resource the schema registry and the disable-save
        /// engine know about
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ResourceKind {
            $($variant),+
        }

        impl ResourceKind {
            pub const ALL: &'static [ResourceKind] = &[$(ResourceKind::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(ResourceKind::$variant => $name),+
                }
            }
        }

        impl FromStr for ResourceKind {
            type Err = UnknownKind;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(ResourceKind::$variant),)+
                    other => Err(UnknownKind(other.to_string())),
                }
            }
        }
    };
}

resource_kinds! {
    Options => "options",
    ResourceGroups => "resource_groups",
    KeyManagement => "key_management",
    EncryptionKeys => "encryption_keys",
    ObjectStorage => "object_storage",
    Buckets => "buckets",
    CosKeys => "cos_keys",
    SecretsManager => "secrets_manager",
    Atracker => "atracker",
    Vpcs => "vpcs",
    AddressPrefixes => "address_prefixes",
    Subnets => "subnets",
    SubnetTier => "subnet_tier",
    Acls => "acls",
    AclRules => "acl_rules",
    SecurityGroups => "security_groups",
    SgRules => "sg_rules",
    SshKeys => "ssh_keys",
    Vsi => "vsi",
    Volumes => "volumes",
    VpnGateways => "vpn_gateways",
    VpnConnections => "connections",
    VirtualPrivateEndpoints => "virtual_private_endpoints",
    TransitGateways => "transit_gateways",
    Clusters => "clusters",
    WorkerPools => "worker_pools",
    OpaqueSecrets => "opaque_secrets",
    LoadBalancers => "load_balancers",
    Appid => "appid",
    AppidKeys => "appid_keys",
    EventStreams => "event_streams",
    IamAccountSettings => "iam_account_settings",
    AccessGroups => "access_groups",
    Policies => "policies",
    DynamicPolicies => "dynamic_policies",
    Scc => "scc",
    RoutingTables => "routing_tables",
    Routes => "routes",
    CbrZones => "cbr_zones",
    CbrAddresses => "addresses",
    CbrExclusions => "exclusions",
    CbrRules => "cbr_rules",
    CbrContexts => "contexts",
    CbrResourceAttributes => "resource_attributes",
    CbrTags => "tags",
    Dns => "dns",
    DnsZones => "zones",
    DnsRecords => "records",
    DnsCustomResolvers => "custom_resolvers",
    Logdna => "logdna",
    Sysdig => "sysdig",
    Power => "power",
    PowerSshKeys => "power_ssh_keys",
    PowerNetwork => "network",
    PowerCloudConnections => "cloud_connections",
    PowerInstances => "power_instances",
    PowerVolumes => "power_volumes",
    VpnServers => "vpn_servers",
    VpnServerRoutes => "vpn_server_routes",
    ClassicSshKeys => "classic_ssh_keys",
    ClassicVlans => "classic_vlans",
    ClassicGateways => "classic_gateways",
    ClassicSecurityGroups => "classic_security_groups",
    ClassicSgRules => "classic_sg_rules",
    ClassicBareMetal => "classic_bare_metal",
    ClassicVsi => "classic_vsi",
    Icd => "icd",
    FortigateVnf => "fortigate_vnf",
}

/// Error returned when parsing an unknown kind name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown resource kind '{0}'")]
pub struct UnknownKind(pub String);

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ResourceKind {
    pub fn location(&self) -> Location {
        use ResourceKind::*;
        let nested = |parent, key| Location::Nested { parent, key };
        match self {
            Options => Location::Singleton(Singleton::Options),
            IamAccountSettings => Location::Singleton(Singleton::IamAccountSettings),
            Atracker => Location::Singleton(Singleton::Atracker),
            Logdna => Location::Singleton(Singleton::Logdna),
            Sysdig => Location::Singleton(Singleton::Sysdig),
            Scc => Location::Singleton(Singleton::Scc),

            ResourceGroups => Location::TopLevel(Collection::ResourceGroups),
            KeyManagement => Location::TopLevel(Collection::KeyManagement),
            ObjectStorage => Location::TopLevel(Collection::ObjectStorage),
            SecretsManager => Location::TopLevel(Collection::SecretsManager),
            Vpcs => Location::TopLevel(Collection::Vpcs),
            SecurityGroups => Location::TopLevel(Collection::SecurityGroups),
            SshKeys => Location::TopLevel(Collection::SshKeys),
            Vsi => Location::TopLevel(Collection::Vsi),
            VpnGateways => Location::TopLevel(Collection::VpnGateways),
            VirtualPrivateEndpoints => Location::TopLevel(Collection::VirtualPrivateEndpoints),
            TransitGateways => Location::TopLevel(Collection::TransitGateways),
            Clusters => Location::TopLevel(Collection::Clusters),
            LoadBalancers => Location::TopLevel(Collection::LoadBalancers),
            Appid => Location::TopLevel(Collection::Appid),
            EventStreams => Location::TopLevel(Collection::EventStreams),
            AccessGroups => Location::TopLevel(Collection::AccessGroups),
            RoutingTables => Location::TopLevel(Collection::RoutingTables),
            CbrZones => Location::TopLevel(Collection::CbrZones),
            CbrRules => Location::TopLevel(Collection::CbrRules),
            Dns => Location::TopLevel(Collection::Dns),
            Power => Location::TopLevel(Collection::Power),
            PowerInstances => Location::TopLevel(Collection::PowerInstances),
            PowerVolumes => Location::TopLevel(Collection::PowerVolumes),
            VpnServers => Location::TopLevel(Collection::VpnServers),
            ClassicSshKeys => Location::TopLevel(Collection::ClassicSshKeys),
            ClassicVlans => Location::TopLevel(Collection::ClassicVlans),
            ClassicGateways => Location::TopLevel(Collection::ClassicGateways),
            ClassicSecurityGroups => Location::TopLevel(Collection::ClassicSecurityGroups),
            ClassicBareMetal => Location::TopLevel(Collection::ClassicBareMetal),
            ClassicVsi => Location::TopLevel(Collection::ClassicVsi),
            Icd => Location::TopLevel(Collection::Icd),
            FortigateVnf => Location::TopLevel(Collection::FortigateVnf),

            EncryptionKeys => nested(KeyManagement, "keys"),
            Buckets => nested(ObjectStorage, "buckets"),
            CosKeys => nested(ObjectStorage, "keys"),
            AddressPrefixes => nested(Vpcs, "address_prefixes"),
            Subnets => nested(Vpcs, "subnets"),
            Acls => nested(Vpcs, "acls"),
            AclRules => nested(Acls, "rules"),
            SgRules => nested(SecurityGroups, "rules"),
            Volumes => nested(Vsi, "volumes"),
            VpnConnections => nested(VpnGateways, "connections"),
            WorkerPools => nested(Clusters, "worker_pools"),
            OpaqueSecrets => nested(Clusters, "opaque_secrets"),
            AppidKeys => nested(Appid, "keys"),
            Policies => nested(AccessGroups, "policies"),
            DynamicPolicies => nested(AccessGroups, "dynamic_policies"),
            Routes => nested(RoutingTables, "routes"),
            CbrAddresses => nested(CbrZones, "addresses"),
            CbrExclusions => nested(CbrZones, "exclusions"),
            CbrContexts => nested(CbrRules, "contexts"),
            CbrResourceAttributes => nested(CbrRules, "resource_attributes"),
            CbrTags => nested(CbrRules, "tags"),
            DnsZones => nested(Dns, "zones"),
            DnsRecords => nested(Dns, "records"),
            DnsCustomResolvers => nested(Dns, "custom_resolvers"),
            PowerSshKeys => nested(Power, "ssh_keys"),
            PowerNetwork => nested(Power, "network"),
            PowerCloudConnections => nested(Power, "cloud_connections"),
            VpnServerRoutes => nested(VpnServers, "routes"),
            ClassicSgRules => nested(ClassicSecurityGroups, "classic_sg_rules"),

            SubnetTier => Location::Derived { parent: Vpcs },
        }
    }

    /// Parent kind for nested and derived kinds
    pub fn parent(&self) -> Option<ResourceKind> {
        match self.location() {
            Location::Nested { parent, .. } | Location::Derived { parent } => Some(parent),
            _ => None,
        }
    }

    /// Kinds stored directly inside resources of this kind
    pub fn nested_kinds(&self) -> Vec<ResourceKind> {
        ResourceKind::ALL
            .iter()
            .copied()
            .filter(|k| matches!(k.location(), Location::Nested { parent, .. } if parent == *self))
            .collect()
    }

    /// Top-level kind for a collection
    pub fn for_collection(collection: Collection) -> ResourceKind {
        ResourceKind::ALL
            .iter()
            .copied()
            .find(|k| k.location() == Location::TopLevel(collection))
            .unwrap_or(ResourceKind::ResourceGroups)
    }

    /// Form identifier failures of this kind are reported under
    pub fn form(&self) -> &'static str {
        use ResourceKind::*;
        match self {
            Options => "/form/options",
            ResourceGroups => "/form/resourceGroups",
            KeyManagement | EncryptionKeys => "/form/keyManagement",
            ObjectStorage | Buckets | CosKeys => "/form/objectStorage",
            SecretsManager => "/form/secretsManager",
            Atracker => "/form/activityTracker",
            Vpcs | AddressPrefixes => "/form/vpcs",
            Subnets | SubnetTier => "/form/subnets",
            Acls | AclRules => "/form/nacls",
            SecurityGroups | SgRules => "/form/securityGroups",
            SshKeys => "/form/sshKeys",
            Vsi | Volumes => "/form/vsi",
            VpnGateways | VpnConnections => "/form/vpn",
            VirtualPrivateEndpoints => "/form/vpe",
            TransitGateways => "/form/transitGateways",
            Clusters | WorkerPools | OpaqueSecrets => "/form/clusters",
            LoadBalancers => "/form/lb",
            Appid | AppidKeys => "/form/appID",
            EventStreams => "/form/eventStreams",
            IamAccountSettings => "/form/iamAccountSettings",
            AccessGroups | Policies | DynamicPolicies => "/form/accessGroups",
            Scc => "/form/securityComplianceCenter",
            RoutingTables | Routes => "/form/routingTables",
            CbrZones | CbrAddresses | CbrExclusions | CbrRules | CbrContexts
            | CbrResourceAttributes | CbrTags => "/form/cbr",
            Dns | DnsZones | DnsRecords | DnsCustomResolvers => "/form/dns",
            Logdna | Sysdig => "/form/observability",
            Power | PowerSshKeys | PowerNetwork | PowerCloudConnections => "/form/power",
            PowerInstances => "/form/powerInstances",
            PowerVolumes => "/form/powerVolumes",
            VpnServers | VpnServerRoutes => "/form/vpnServers",
            ClassicSshKeys => "/form/classicSshKeys",
            ClassicVlans => "/form/classicVlans",
            ClassicGateways => "/form/classicGateways",
            ClassicSecurityGroups | ClassicSgRules => "/form/classicSecurityGroups",
            ClassicBareMetal => "/form/classicBareMetal",
            ClassicVsi => "/form/classicVsi",
            Icd => "/form/icd",
            FortigateVnf => "/form/fortigate",
        }
    }

    pub fn name_rule(&self) -> NameRule {
        use ResourceKind::*;
        match self {
            Options | IamAccountSettings | Atracker | Logdna | Sysdig | Scc => NameRule::None,
            ClassicVlans => NameRule::Standard { max_len: 15 },
            // "<tier>-zone-<n>" must still fit the subnet limit
            SubnetTier => NameRule::Standard { max_len: 56 },
            DnsZones => NameRule::Domain,
            DnsRecords | CbrContexts | CbrResourceAttributes | CbrTags => NameRule::Free,
            _ => NameRule::Standard { max_len: 63 },
        }
    }

    /// Parent back-reference fields written onto a nested resource when it
    /// is created, as `(field, source)` pairs
    pub fn parent_fields(&self) -> &'static [(&'static str, ParentField)] {
        use ResourceKind::*;
        match self {
            Subnets | Acls | AddressPrefixes => &[("vpc", ParentField::Parent)],
            AclRules => &[
                ("acl", ParentField::Parent),
                ("vpc", ParentField::Grandparent),
            ],
            SgRules => &[("sg", ParentField::Parent), ("vpc", ParentField::ParentVpc)],
            VpnConnections => &[("vpn", ParentField::Parent)],
            WorkerPools => &[("cluster", ParentField::Parent), ("vpc", ParentField::ParentVpc)],
            OpaqueSecrets => &[("cluster", ParentField::Parent)],
            PowerSshKeys | PowerNetwork | PowerCloudConnections => {
                &[("workspace", ParentField::Parent)]
            }
            Volumes => &[("vsi", ParentField::Parent)],
            Routes => &[("route_table", ParentField::Parent)],
            VpnServerRoutes => &[("vpn", ParentField::Parent)],
            ClassicSgRules => &[("classic_sg", ParentField::Parent)],
            _ => &[],
        }
    }
}

/// Source of a parent back-reference value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentField {
    /// Name of the immediate parent
    Parent,
    /// Name of the parent's parent
    Grandparent,
    /// The parent's own `vpc` field
    ParentVpc,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.as_str().parse::<ResourceKind>(), Ok(*kind));
        }
    }

    #[test]
    fn unknown_kind() {
        let err = "widgets".parse::<ResourceKind>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown resource kind 'widgets'");
    }

    #[test]
    fn every_collection_has_a_kind() {
        for collection in Collection::ALL {
            let kind = ResourceKind::for_collection(*collection);
            assert_eq!(kind.location(), Location::TopLevel(*collection));
        }
    }

    #[test]
    fn nested_forms_map_to_parent_forms() {
        assert_eq!(ResourceKind::AclRules.form(), "/form/nacls");
        assert_eq!(ResourceKind::CbrTags.form(), "/form/cbr");
        assert_eq!(ResourceKind::Logdna.form(), "/form/observability");
        assert_eq!(ResourceKind::Sysdig.form(), "/form/observability");
    }

    #[test]
    fn nested_kinds_of_vpcs() {
        let nested = ResourceKind::Vpcs.nested_kinds();
        assert!(nested.contains(&ResourceKind::Subnets));
        assert!(nested.contains(&ResourceKind::Acls));
        assert!(nested.contains(&ResourceKind::AddressPrefixes));
        assert!(!nested.contains(&ResourceKind::AclRules));
        assert!(!nested.contains(&ResourceKind::SubnetTier));
    }
}
