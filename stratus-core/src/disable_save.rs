//! Disable-save - Decide whether a candidate resource may be saved
//!
//! A candidate passes when every visible field in its schema is valid (in
//! declaration order, stopping at the first failure) and the structural
//! rules of its kind hold. Singletons switched off with `enabled`/`enable`
//! set to false always pass. Nothing here mutates or errors: a failure is a
//! `true` from [`disable_save`] plus a message from [`first_problem`].

use std::sync::LazyLock;

use serde_json::Value;

use crate::context::{SaveContext, all_of, names_of};
use crate::derive::vpc_tiers;
use crate::document::{Resource, ResourceExt};
use crate::kind::ResourceKind;
use crate::schema::{FieldInput, SchemaRegistry};
use crate::schemas::network::{rule_protocol, rule_values};
use crate::schemas::power::{AFFINITY_FIELDS, AFFINITY_OPTIONS};
use crate::validate::{cidrs_overlap, is_crn, is_range_invalid, whole_number};

static REGISTRY: LazyLock<SchemaRegistry> = LazyLock::new(SchemaRegistry::new);

/// The built-in schema registry
pub fn registry() -> &'static SchemaRegistry {
    &REGISTRY
}

/// Why a candidate cannot be saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveProblem {
    /// Field that failed, `None` for rules spanning several fields
    pub field: Option<&'static str>,
    pub message: String,
}

/// True when the candidate must not be saved
pub fn disable_save(kind: ResourceKind, data: &Resource, ctx: &SaveContext<'_>) -> bool {
    first_problem(kind, data, ctx).is_some()
}

/// First reason the candidate cannot be saved
pub fn first_problem(kind: ResourceKind, data: &Resource, ctx: &SaveContext<'_>) -> Option<SaveProblem> {
    if is_switched_off(kind, data) {
        return None;
    }
    let schema = registry().get(kind)?;
    if let Some(field) = schema.first_invalid(data, ctx) {
        let input = FieldInput::new(kind, field.name, data, ctx);
        return Some(SaveProblem {
            field: Some(field.name),
            message: field.message(&input),
        });
    }
    structural_problem(kind, data, ctx).map(|message| SaveProblem { field: None, message })
}

/// Every visible invalid field with its message
pub fn invalid_fields(
    kind: ResourceKind,
    data: &Resource,
    ctx: &SaveContext<'_>,
) -> Vec<(&'static str, String)> {
    if is_switched_off(kind, data) {
        return Vec::new();
    }
    registry()
        .get(kind)
        .map(|schema| schema.invalid_fields(data, ctx))
        .unwrap_or_default()
}

/// Singletons that can be disabled are always savable when off
fn is_switched_off(kind: ResourceKind, data: &Resource) -> bool {
    match kind {
        ResourceKind::Atracker | ResourceKind::Logdna | ResourceKind::Sysdig => {
            data.get("enabled") == Some(&Value::Bool(false))
        }
        ResourceKind::IamAccountSettings | ResourceKind::Scc => {
            data.get("enable") == Some(&Value::Bool(false))
        }
        _ => false,
    }
}

// ========== Structural rules ==========

fn structural_problem(kind: ResourceKind, data: &Resource, ctx: &SaveContext<'_>) -> Option<String> {
    use ResourceKind::*;
    match kind {
        AclRules => rule_problem(data, true),
        SgRules => rule_problem(data, false),
        AddressPrefixes => address_prefix_problem(data, ctx),
        Subnets => subnet_problem(data, ctx),
        SubnetTier => subnet_tier_problem(data, ctx),
        Vsi | VirtualPrivateEndpoints | VpnServers | LoadBalancers => vpc_members_problem(data, ctx)
            .or_else(|| match kind {
                LoadBalancers => load_balancer_problem(data, ctx),
                VpnServers => (data.list_len("subnets") > 2)
                    .then(|| "VPN servers support at most two subnets".to_string()),
                _ => None,
            }),
        Clusters => vpc_members_problem(data, ctx).or_else(|| cluster_problem(data)),
        VpnGateways => subnet_in_vpc(data, ctx, data.text("vpc"), "subnet"),
        WorkerPools => {
            let vpc = ctx
                .parent_resource(kind)
                .map(|cluster| cluster.text("vpc"))
                .unwrap_or_default();
            subnets_in_vpc(data, ctx, vpc, "subnets")
        }
        DnsCustomResolvers => subnets_in_vpc(data, ctx, data.text("vpc"), "subnets"),
        FortigateVnf => fortigate_problem(data, ctx),
        OpaqueSecrets => (data.text("arbitrary_secret_name") == data.text("username_password_secret_name"))
            .then(|| "Secret names must be different".to_string()),
        TransitGateways => transit_gateway_problem(data, ctx),
        Policies => policy_problem(data),
        DynamicPolicies => dynamic_policy_problem(data),
        CbrContexts => cbr_context_problem(data, ctx),
        PowerInstances | PowerVolumes => power_storage_problem(kind, data, ctx),
        ClassicGateways | ClassicBareMetal | ClassicVsi => classic_vlan_problem(data, ctx),
        ClassicSgRules => port_order_problem(data, "port_range_min", "port_range_max"),
        Logdna => bucket_in_cos(data, ctx, "cos", "bucket"),
        Vpcs => (!data.is_blank("cos"))
            .then(|| bucket_in_cos(data, ctx, "cos", "bucket"))
            .flatten(),
        _ => None,
    }
}

/// ACL and security group rule protocol checks. `all` rules skip port and
/// code checks; ACL rules additionally carry source ports.
fn rule_problem(rule: &Resource, acl: bool) -> Option<String> {
    let protocol = rule_protocol(rule);
    let values = rule_values(rule, protocol);
    let get = |field: &str| values.and_then(|v| v.get(field));

    match protocol {
        "all" => None,
        "icmp" => {
            if is_range_invalid(get("type"), 0, 254) {
                Some("ICMP type must be a whole number between 0 and 254".to_string())
            } else if is_range_invalid(get("code"), 0, 255) {
                Some("ICMP code must be a whole number between 0 and 255".to_string())
            } else {
                None
            }
        }
        "tcp" | "udp" => {
            let mut fields = vec!["port_min", "port_max"];
            if acl {
                fields.extend(["source_port_min", "source_port_max"]);
            }
            if let Some(field) = fields.iter().find(|f| is_range_invalid(get(**f), 0, 65535)) {
                return Some(format!("{} must be a whole number between 0 and 65535", field));
            }
            let values = values?;
            port_order_problem(values, "port_min", "port_max")
                .or_else(|| port_order_problem(values, "source_port_min", "source_port_max"))
        }
        other => Some(format!("Unknown protocol '{}'", other)),
    }
}

fn port_order_problem(data: &Resource, min: &str, max: &str) -> Option<String> {
    let low = data.get(min).and_then(whole_number)?;
    let high = data.get(max).and_then(whole_number)?;
    (low > high).then(|| format!("{} must not exceed {}", min, max))
}

fn owning_vpc<'a>(data: &'a Resource, ctx: &SaveContext<'a>) -> &'a str {
    ctx.scope.parent().unwrap_or_else(|| data.text("vpc"))
}

fn address_prefix_problem(data: &Resource, ctx: &SaveContext<'_>) -> Option<String> {
    let vpc = owning_vpc(data, ctx);
    let editing = ctx.scope.editing();
    let cidr = data.text("cidr");
    ctx.doc
        .vpcs
        .iter()
        .filter(|v| v.name() == vpc)
        .flat_map(|v| v.children("address_prefixes"))
        .find(|p| Some(p.name()) != editing && cidrs_overlap(cidr, p.text("cidr")))
        .map(|p| format!("CIDR overlaps with address prefix {}", p.name()))
}

/// A subnet's ACL must exist in its VPC
fn subnet_problem(data: &Resource, ctx: &SaveContext<'_>) -> Option<String> {
    let vpc = owning_vpc(data, ctx);
    let acl = data.text("network_acl");
    if !names_of(ctx.doc, ResourceKind::Acls, Some(vpc)).iter().any(|a| a == acl) {
        return Some(format!("Network ACL {} does not exist in VPC {}", acl, vpc));
    }
    None
}

fn subnet_tier_problem(data: &Resource, ctx: &SaveContext<'_>) -> Option<String> {
    let vpc_name = ctx.scope.parent()?;
    let vpc = ctx.doc.vpcs.iter().find(|v| v.name() == vpc_name)?;
    let editing = ctx.scope.editing();
    let name = data.name();
    if vpc_tiers(vpc)
        .iter()
        .any(|t| t.name == name && Some(t.name.as_str()) != editing)
    {
        return Some(format!("Tier name \"{}\" already in use", name));
    }
    if data.flag("advanced") {
        let zones = data.get("select_zones").and_then(Value::as_array);
        let out_of_range = zones.is_some_and(|z| {
            z.iter()
                .any(|zone| whole_number(zone).is_none_or(|n| !(1..=3).contains(&n)))
        });
        return out_of_range.then(|| "Selected zones must be between 1 and 3".to_string());
    }
    let zones = data.get("zones").and_then(whole_number).unwrap_or(0);
    (zones > i64::from(ctx.doc.zones()))
        .then(|| format!("Tier cannot span more than {} zones", ctx.doc.zones()))
}

fn subnet_in_vpc(data: &Resource, ctx: &SaveContext<'_>, vpc: &str, field: &str) -> Option<String> {
    let subnet = data.text(field);
    (!subnet.is_empty() && !names_of(ctx.doc, ResourceKind::Subnets, Some(vpc)).iter().any(|s| s == subnet))
        .then(|| format!("Subnet {} is not in VPC {}", subnet, vpc))
}

fn subnets_in_vpc(data: &Resource, ctx: &SaveContext<'_>, vpc: &str, field: &str) -> Option<String> {
    let subnets = names_of(ctx.doc, ResourceKind::Subnets, Some(vpc));
    data.strings(field)
        .into_iter()
        .find(|s| !subnets.iter().any(|n| n == s))
        .map(|s| format!("Subnet {} is not in VPC {}", s, vpc))
}

/// Subnets and security groups must belong to the selected VPC
fn vpc_members_problem(data: &Resource, ctx: &SaveContext<'_>) -> Option<String> {
    let vpc = data.text("vpc");
    subnets_in_vpc(data, ctx, vpc, "subnets").or_else(|| {
        data.strings("security_groups")
            .into_iter()
            .find(|sg| {
                !ctx.doc
                    .security_groups
                    .iter()
                    .any(|g| g.name() == *sg && g.text("vpc") == vpc)
            })
            .map(|sg| format!("Security group {} is not in VPC {}", sg, vpc))
    })
}

fn load_balancer_problem(data: &Resource, ctx: &SaveContext<'_>) -> Option<String> {
    let delay = data.get("health_delay").and_then(whole_number);
    let timeout = data.get("health_timeout").and_then(whole_number);
    if let (Some(delay), Some(timeout)) = (delay, timeout)
        && delay <= timeout
    {
        return Some("Health delay must be greater than health timeout".to_string());
    }
    data.strings("target_vsi")
        .into_iter()
        .find(|vsi| !ctx.doc.vsi.iter().any(|v| v.name() == *vsi))
        .map(|vsi| format!("Deployment target {} does not exist", vsi))
}

fn cluster_problem(data: &Resource) -> Option<String> {
    if data.text("type") != "openshift" {
        return None;
    }
    let per_subnet = data.get("workers_per_subnet").and_then(whole_number).unwrap_or(0);
    let workers = per_subnet * data.list_len("subnets") as i64;
    (workers < 2).then(|| "OpenShift clusters require at least two workers".to_string())
}

fn fortigate_problem(data: &Resource, ctx: &SaveContext<'_>) -> Option<String> {
    let vpc = data.text("vpc");
    if data.text("primary_subnet") == data.text("secondary_subnet") {
        return Some("Primary and secondary subnets must be different".to_string());
    }
    subnet_in_vpc(data, ctx, vpc, "primary_subnet")
        .or_else(|| subnet_in_vpc(data, ctx, vpc, "secondary_subnet"))
        .or_else(|| vpc_members_problem(data, ctx))
}

/// A transit gateway needs at least one connection or CRN, and each
/// connection must name an existing VPC or Power workspace
fn transit_gateway_problem(data: &Resource, ctx: &SaveContext<'_>) -> Option<String> {
    let crns = data.strings("crns");
    if let Some(crn) = crns.iter().find(|c| !is_crn(c)) {
        return Some(format!("Invalid CRN {}", crn));
    }
    let connections = data.children("connections");
    if connections.is_empty() && crns.is_empty() {
        return Some("Transit gateways need at least one connection".to_string());
    }
    for connection in connections {
        if let Some(vpc) = connection.str_field("vpc")
            && !ctx.doc.vpcs.iter().any(|v| v.name() == vpc)
        {
            return Some(format!("VPC {} does not exist", vpc));
        }
        if let Some(power) = connection.str_field("power")
            && !ctx.doc.power.iter().any(|w| w.name() == power)
        {
            return Some(format!("Power workspace {} does not exist", power));
        }
    }
    None
}

fn policy_problem(data: &Resource) -> Option<String> {
    let empty = data
        .object("resources")
        .is_none_or(|r| r.keys().all(|k| r.is_blank(k)));
    empty.then(|| "Policies must target at least one resource".to_string())
}

fn dynamic_policy_problem(data: &Resource) -> Option<String> {
    let incomplete = data
        .object("conditions")
        .is_none_or(|c| ["claim", "operator", "value"].iter().any(|k| c.is_blank(k)));
    incomplete.then(|| "Conditions need a claim, an operator and a value".to_string())
}

/// Network zone contexts must name an existing zone
fn cbr_context_problem(data: &Resource, ctx: &SaveContext<'_>) -> Option<String> {
    if data.name() != "networkZoneId" {
        return None;
    }
    let zone = data.text("value");
    (!ctx.doc.cbr_zones.iter().any(|z| z.name() == zone))
        .then(|| format!("Network zone {} does not exist", zone))
}

fn bucket_in_cos(data: &Resource, ctx: &SaveContext<'_>, cos_field: &str, bucket_field: &str) -> Option<String> {
    let cos = data.text(cos_field);
    let bucket = data.text(bucket_field);
    let buckets = names_of(ctx.doc, ResourceKind::Buckets, Some(cos));
    (!buckets.iter().any(|b| b == bucket))
        .then(|| format!("Bucket {} is not in Object Storage instance {}", bucket, cos))
}

fn classic_vlan_problem(data: &Resource, ctx: &SaveContext<'_>) -> Option<String> {
    let datacenter = data.text("datacenter");
    let vlan_ok = |field: &str, vlan_type: &str| {
        let name = data.text(field);
        ctx.doc.classic_vlans.iter().any(|v| {
            v.name() == name && v.text("datacenter") == datacenter && v.text("type") == vlan_type
        })
    };
    if !vlan_ok("private_vlan", "PRIVATE") {
        return Some(format!("Private VLAN must be a private VLAN in {}", datacenter));
    }
    if !data.flag("private_network_only") && !vlan_ok("public_vlan", "PUBLIC") {
        return Some(format!("Public VLAN must be a public VLAN in {}", datacenter));
    }
    None
}

// ========== Power storage ==========

fn storage_fields(kind: ResourceKind) -> &'static [&'static str] {
    match kind {
        ResourceKind::PowerVolumes => &["pi_storage_option", "pi_volume_type", "pi_volume_pool"],
        _ => &["pi_storage_option", "pi_storage_type", "pi_storage_pool"],
    }
}

/// Affinity fields that can point at a resource of `kind`
fn affinity_fields_for(kind: ResourceKind) -> impl Iterator<Item = &'static str> {
    let suffix = match kind {
        ResourceKind::PowerVolumes => "_volume",
        _ => "_instance",
    };
    AFFINITY_FIELDS
        .iter()
        .map(|(field, _)| *field)
        .filter(move |field| field.ends_with(suffix))
}

/// True when the resource being edited is the affinity target of another
/// instance or volume; its storage settings are then locked
pub fn storage_change_disabled(kind: ResourceKind, ctx: &SaveContext<'_>) -> bool {
    if !matches!(kind, ResourceKind::PowerInstances | ResourceKind::PowerVolumes) {
        return false;
    }
    let Some(name) = ctx.scope.editing() else {
        return false;
    };
    let fields: Vec<&str> = affinity_fields_for(kind).collect();
    ctx.doc
        .power_instances
        .iter()
        .chain(ctx.doc.power_volumes.iter())
        .filter(|r| uses_affinity(r))
        .any(|r| fields.iter().any(|f| r.text(f) == name))
}

fn uses_affinity(resource: &Resource) -> bool {
    AFFINITY_OPTIONS.contains(&resource.text("pi_storage_option"))
}

fn power_storage_problem(kind: ResourceKind, data: &Resource, ctx: &SaveContext<'_>) -> Option<String> {
    if storage_change_disabled(kind, ctx)
        && let Some(original) = ctx.original(kind)
        && storage_fields(kind).iter().any(|f| data.get(*f) != original.get(*f))
    {
        return Some("Storage cannot change while another resource has affinity with it".to_string());
    }

    let option = data.text("pi_storage_option");
    if AFFINITY_OPTIONS.contains(&option) {
        let targets: Vec<(&str, &str)> = AFFINITY_FIELDS
            .iter()
            .filter(|(_, o)| *o == option)
            .map(|(f, _)| (*f, data.text(f)))
            .filter(|(_, target)| !target.is_empty())
            .collect();
        if targets.is_empty() {
            return Some(format!("{} requires an instance or a volume", option));
        }
        for (field, target) in targets {
            let target_kind = if field.ends_with("_volume") {
                ResourceKind::PowerVolumes
            } else {
                ResourceKind::PowerInstances
            };
            if target_kind == kind && Some(target) == ctx.scope.editing().or(Some(data.name())) {
                return Some("A resource cannot have affinity with itself".to_string());
            }
            let Some(resource) = all_of(ctx.doc, target_kind).into_iter().find(|r| r.name() == target) else {
                return Some(format!("{} does not exist", target));
            };
            if uses_affinity(resource) {
                return Some(format!("{} is already in an affinity relationship", target));
            }
        }
    }

    if kind == ResourceKind::PowerVolumes {
        let attachments = data.strings("attachments");
        if attachments.len() > 1 && !data.flag("pi_volume_shareable") {
            return Some("Volumes attached to more than one instance must be shareable".to_string());
        }
        let workspace = data.text("workspace");
        if let Some(instance) = attachments.iter().find(|a| {
            !ctx.doc
                .power_instances
                .iter()
                .any(|i| i.name() == **a && i.text("workspace") == workspace)
        }) {
            return Some(format!("Instance {} is not in workspace {}", instance, workspace));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Scope;
    use crate::document::ConfigDocument;
    use serde_json::json;

    fn obj(value: Value) -> Resource {
        value.as_object().cloned().unwrap()
    }

    fn network_doc() -> ConfigDocument {
        serde_json::from_value(json!({
            "resource_groups": [{ "name": "slz-rg" }],
            "vpcs": [{
                "name": "management",
                "acls": [{ "name": "management-acl", "rules": [] }],
                "subnets": [
                    { "name": "vsi-zone-1", "zone": 1, "cidr": "10.10.10.0/24", "network_acl": "management-acl" },
                    { "name": "vsi-zone-2", "zone": 2, "cidr": "10.20.10.0/24", "network_acl": "management-acl" }
                ]
            }],
            "security_groups": [{ "name": "management-vsi", "vpc": "management", "rules": [] }],
            "vsi": [{ "name": "management-server", "vpc": "management" }]
        }))
        .unwrap()
    }

    fn load_balancer(timeout: i64, delay: i64) -> Resource {
        obj(json!({
            "name": "lb",
            "resource_group": "slz-rg",
            "vpc": "management",
            "type": "public",
            "subnets": ["vsi-zone-1", "vsi-zone-2"],
            "security_groups": ["management-vsi"],
            "target_vsi": ["management-server"],
            "algorithm": "round_robin",
            "pool_protocol": "tcp",
            "pool_health_protocol": "tcp",
            "listener_protocol": "tcp",
            "listener_port": 80,
            "port": 80,
            "health_retries": 5,
            "health_timeout": timeout,
            "health_delay": delay,
            "connection_limit": "",
            "session_persistence_type": "",
            "proxy_protocol": ""
        }))
    }

    #[test]
    fn acl_rule_with_icmp_protocol_is_savable() {
        let doc = network_doc();
        let ctx = SaveContext::new(&doc, Scope::nested_in("management-acl", "management", None));
        let data = obj(json!({
            "name": "aaa",
            "source": "1.2.3.4",
            "destination": "1.2.3.4",
            "ruleProtocol": "icmp",
            "rule": { "code": 2, "type": 2 }
        }));
        assert!(!disable_save(ResourceKind::AclRules, &data, &ctx));
    }

    #[test]
    fn acl_rule_protocol_ranges() {
        let doc = network_doc();
        let ctx = SaveContext::new(&doc, Scope::nested_in("management-acl", "management", None));
        let rule = |protocol: &str, values: Value| {
            obj(json!({
                "name": "rule",
                "source": "10.0.0.0/8",
                "destination": "0.0.0.0/0",
                "ruleProtocol": protocol,
                "rule": values
            }))
        };
        assert!(disable_save(ResourceKind::AclRules, &rule("icmp", json!({ "type": 255 })), &ctx));
        assert!(!disable_save(ResourceKind::AclRules, &rule("icmp", json!({ "type": null, "code": null })), &ctx));
        assert!(disable_save(ResourceKind::AclRules, &rule("tcp", json!({ "port_min": 70000 })), &ctx));
        assert!(disable_save(ResourceKind::AclRules, &rule("tcp", json!({ "port_min": 443, "port_max": 80 })), &ctx));
        assert!(!disable_save(ResourceKind::AclRules, &rule("udp", json!({ "port_min": 53, "port_max": 53 })), &ctx));
        assert!(!disable_save(ResourceKind::AclRules, &rule("all", json!({ "port_min": -4 })), &ctx));
    }

    #[test]
    fn stored_rules_derive_protocol_from_blocks() {
        let doc = network_doc();
        let ctx = SaveContext::new(&doc, Scope::nested("management-vsi", None));
        let data = obj(json!({
            "name": "allow-ssh",
            "direction": "inbound",
            "source": "0.0.0.0/0",
            "tcp": { "port_min": 22, "port_max": 22 },
            "udp": { "port_min": null, "port_max": null },
            "icmp": { "type": null, "code": null }
        }));
        assert!(!disable_save(ResourceKind::SgRules, &data, &ctx));
    }

    #[test]
    fn load_balancer_delay_must_exceed_timeout() {
        let doc = network_doc();
        let ctx = SaveContext::new(&doc, Scope::new_top_level());
        assert!(disable_save(ResourceKind::LoadBalancers, &load_balancer(5, 5), &ctx));
        assert!(!disable_save(ResourceKind::LoadBalancers, &load_balancer(5, 10), &ctx));
        let problem = first_problem(ResourceKind::LoadBalancers, &load_balancer(5, 5), &ctx).unwrap();
        assert_eq!(problem.field, None);
    }

    #[test]
    fn subnet_needs_existing_acl() {
        let doc = network_doc();
        let ctx = SaveContext::new(&doc, Scope::nested("management", None));
        let subnet = |acl: &str| {
            obj(json!({ "name": "vpe-zone-1", "zone": 1, "cidr": "10.10.20.0/24", "network_acl": acl }))
        };
        assert!(!disable_save(ResourceKind::Subnets, &subnet("management-acl"), &ctx));
        let problem = first_problem(ResourceKind::Subnets, &subnet("missing"), &ctx).unwrap();
        assert_eq!(problem.message, "Network ACL missing does not exist in VPC management");
    }

    #[test]
    fn disabled_singletons_always_pass() {
        let doc = ConfigDocument::new();
        let ctx = SaveContext::new(&doc, Scope::new_top_level());
        let off = obj(json!({ "enabled": false }));
        assert!(!disable_save(ResourceKind::Atracker, &off, &ctx));
        let on = obj(json!({ "enabled": true }));
        assert!(disable_save(ResourceKind::Atracker, &on, &ctx));
        let iam = obj(json!({ "enable": false }));
        assert!(!disable_save(ResourceKind::IamAccountSettings, &iam, &ctx));
        assert!(invalid_fields(ResourceKind::Sysdig, &obj(json!({ "enabled": false })), &ctx).is_empty());
    }

    #[test]
    fn vpn_server_certificate_requirements() {
        let doc = network_doc();
        let ctx = SaveContext::new(&doc, Scope::new_top_level());
        let server = |method: &str, pool: &str| {
            obj(json!({
                "name": "vpn-server",
                "resource_group": "slz-rg",
                "vpc": "management",
                "subnets": ["vsi-zone-1"],
                "security_groups": ["management-vsi"],
                "method": method,
                "certificate_crn": "crn:v1:bluemix:public:secrets-manager:us-south:a/abc:1234:secret:5678",
                "client_ca_crn": "",
                "client_ip_pool": pool,
                "port": 443,
                "protocol": "udp"
            }))
        };
        assert!(!disable_save(ResourceKind::VpnServers, &server("byo", "10.60.0.0/20"), &ctx));
        assert!(disable_save(ResourceKind::VpnServers, &server("certificate", "10.60.0.0/20"), &ctx));
        assert!(disable_save(ResourceKind::VpnServers, &server("byo", "10.60.0.1"), &ctx));
    }

    #[test]
    fn classic_gateway_needs_vlans_in_datacenter() {
        let doc: ConfigDocument = serde_json::from_value(json!({
            "classic_ssh_keys": [{ "name": "key" }],
            "classic_vlans": [
                { "name": "priv", "datacenter": "dal10", "type": "PRIVATE" },
                { "name": "pub", "datacenter": "dal10", "type": "PUBLIC" },
                { "name": "far", "datacenter": "lon04", "type": "PUBLIC" }
            ]
        }))
        .unwrap();
        let ctx = SaveContext::new(&doc, Scope::new_top_level());
        let gateway = |public: &str, private_only: bool| {
            obj(json!({
                "name": "gw",
                "domain": "example.com",
                "datacenter": "dal10",
                "network_speed": "1000",
                "public_bandwidth": "5000",
                "package_key_name": "VIRTUAL_ROUTER_APPLIANCE_1_GPBS",
                "os_key_name": "OS_JUNIPER_VSRX",
                "process_key_name": "INTEL_XEON_4210_2_20",
                "ssh_key": "key",
                "disk_key_names": ["HARD_DRIVE_2_00_TB_SATA_2"],
                "memory": 64,
                "private_network_only": private_only,
                "private_vlan": "priv",
                "public_vlan": public
            }))
        };
        assert!(!disable_save(ResourceKind::ClassicGateways, &gateway("pub", false), &ctx));
        assert!(disable_save(ResourceKind::ClassicGateways, &gateway("far", false), &ctx));
        assert!(!disable_save(ResourceKind::ClassicGateways, &gateway("", true), &ctx));
    }

    fn power_doc() -> ConfigDocument {
        serde_json::from_value(json!({
            "_options": { "region": "us-south" },
            "power": [{
                "name": "ws",
                "zone": "dal10",
                "imageNames": ["img"],
                "ssh_keys": [{ "name": "key" }],
                "network": [{ "name": "net" }]
            }],
            "power_instances": [
                { "name": "primary", "workspace": "ws", "pi_storage_option": "Storage Type", "pi_storage_type": "tier1" },
                { "name": "follower", "workspace": "ws", "pi_storage_option": "Affinity", "pi_affinity_instance": "primary" }
            ],
            "power_volumes": []
        }))
        .unwrap()
    }

    fn instance(name: &str, storage: Value) -> Resource {
        let mut data = obj(json!({
            "name": name,
            "workspace": "ws",
            "network": [{ "name": "net", "ip_address": "" }],
            "ssh_key": "key",
            "image": "img",
            "pi_sys_type": "s922",
            "pi_proc_type": "shared",
            "pi_processors": 0.5,
            "pi_memory": 4
        }));
        data.extend(obj(storage));
        data
    }

    #[test]
    fn affinity_target_cannot_already_have_affinity() {
        let doc = power_doc();
        let ctx = SaveContext::new(&doc, Scope::new_top_level());
        let ok = instance("third", json!({ "pi_storage_option": "Affinity", "pi_affinity_instance": "primary" }));
        assert!(!disable_save(ResourceKind::PowerInstances, &ok, &ctx));
        let chained = instance("third", json!({ "pi_storage_option": "Affinity", "pi_affinity_instance": "follower" }));
        let problem = first_problem(ResourceKind::PowerInstances, &chained, &ctx).unwrap();
        assert_eq!(problem.message, "follower is already in an affinity relationship");
    }

    #[test]
    fn affinity_targets_keep_their_storage() {
        let doc = power_doc();
        let ctx = SaveContext::new(&doc, Scope::top_level("primary"));
        assert!(storage_change_disabled(ResourceKind::PowerInstances, &ctx));
        let same = instance("primary", json!({ "pi_storage_option": "Storage Type", "pi_storage_type": "tier1" }));
        assert!(!disable_save(ResourceKind::PowerInstances, &same, &ctx));
        let changed = instance("primary", json!({ "pi_storage_option": "Storage Type", "pi_storage_type": "tier3" }));
        assert!(disable_save(ResourceKind::PowerInstances, &changed, &ctx));

        let ctx = SaveContext::new(&doc, Scope::top_level("follower"));
        assert!(!storage_change_disabled(ResourceKind::PowerInstances, &ctx));
    }
}
