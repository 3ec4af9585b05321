//! VPC network schemas: VPCs, subnets, ACLs, security groups, gateways,
//! endpoints, routing and load balancing

use serde_json::Value;

use crate::context::names_of;
use crate::document::{Resource, ResourceExt};
use crate::kind::ResourceKind;
use crate::schema::{FieldInput, FieldSchema, ResourceSchema};
use crate::validate::{
    cidrs_overlap, is_cidr, is_crn, is_in_range, is_ip_or_cidr, is_required_range_invalid,
    is_valid_name,
};

use super::common::*;
use super::types::*;

const ZONES: &[&str] = &["1", "2", "3"];

// ========== Rule protocol helpers ==========

/// Protocol of an ACL or security group rule: the form's `ruleProtocol`
/// field, otherwise the first populated protocol block of a stored rule
pub fn rule_protocol(rule: &Resource) -> &str {
    if let Some(protocol) = rule.str_field("ruleProtocol") {
        return protocol;
    }
    for protocol in ["icmp", "tcp", "udp"] {
        if let Some(block) = rule.object(protocol)
            && block.values().any(|v| !v.is_null() && v != "")
        {
            return protocol;
        }
    }
    "all"
}

/// Protocol-specific values of a rule: the form's `rule` object, otherwise
/// the stored block for `protocol`
pub fn rule_values<'a>(rule: &'a Resource, protocol: &str) -> Option<&'a Resource> {
    rule.object("rule").or_else(|| rule.object(protocol))
}

// ========== Field predicates ==========

fn invalid_zone(input: &FieldInput<'_>) -> bool {
    input.value().is_none_or(|v| !is_in_range(v, 1, 3))
}

fn invalid_ip_or_cidr(input: &FieldInput<'_>) -> bool {
    !is_ip_or_cidr(input.text())
}

/// Subnet CIDR: must parse and must not overlap any other subnet
fn invalid_subnet_cidr(input: &FieldInput<'_>) -> bool {
    let cidr = input.text();
    if !is_cidr(cidr) {
        return true;
    }
    let owner = input.ctx.scope.parent();
    let editing = input.ctx.scope.editing();
    input.doc().vpcs.iter().any(|vpc| {
        vpc.children("subnets").iter().any(|subnet| {
            let is_self = Some(vpc.name()) == owner && Some(subnet.name()) == editing;
            !is_self && cidrs_overlap(cidr, subnet.text("cidr"))
        })
    })
}

fn invalid_subnet_cidr_text(input: &FieldInput<'_>) -> String {
    if is_cidr(input.text()) {
        format!("CIDR {} overlaps with an existing subnet", input.text())
    } else {
        "Invalid CIDR block".to_string()
    }
}

fn invalid_cidr_list(input: &FieldInput<'_>) -> bool {
    match input.value() {
        Some(Value::Array(items)) => {
            items.is_empty() || items.iter().any(|i| i.as_str().is_none_or(|c| !is_cidr(c)))
        }
        Some(Value::String(s)) => s.split(',').map(str::trim).any(|c| !is_cidr(c)),
        _ => true,
    }
}

/// Default ACL / security group / routing table names of a VPC
fn invalid_default_name(input: &FieldInput<'_>) -> bool {
    let name = input.text();
    if !is_valid_name(name) {
        return true;
    }
    let vpc = input.data.name();
    match input.field {
        "default_network_acl_name" => input.data.children("acls").iter().any(|a| a.name() == name),
        "default_security_group_name" => input
            .doc()
            .security_groups
            .iter()
            .any(|sg| sg.text("vpc") == vpc && sg.name() == name),
        "default_routing_table_name" => input
            .doc()
            .routing_tables
            .iter()
            .any(|rt| rt.text("vpc") == vpc && rt.name() == name),
        _ => false,
    }
}

fn acl_groups(input: &FieldInput<'_>) -> Vec<String> {
    let vpc = input
        .data
        .str_field("vpc")
        .or(input.ctx.scope.parent())
        .unwrap_or_default();
    names_of(input.doc(), ResourceKind::Acls, Some(vpc))
}

fn vpe_service_groups(_: &FieldInput<'_>) -> Vec<String> {
    ["cos", "icr", "kms", "hpcs", "secrets-manager", "icd"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn not_advanced(input: &FieldInput<'_>) -> bool {
    !input.data.flag("advanced")
}

fn not_deliver(input: &FieldInput<'_>) -> bool {
    input.data.text("action") != "deliver"
}

fn not_certificate(input: &FieldInput<'_>) -> bool {
    input.data.text("method") != "certificate"
}

fn dynamic_subnets_enabled(input: &FieldInput<'_>) -> bool {
    input.doc().dynamic_subnets()
}

// ========== Schemas ==========

pub fn vpc_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::Vpcs)
        .with_description("A virtual private cloud")
        .field(name_field())
        .field(resource_group_field())
        .field(FieldSchema::select("cos").with_dynamic_groups(cos_groups).optional())
        .field(
            FieldSchema::select("bucket")
                .invalid(|i| !i.data.is_blank("cos") && i.is_blank())
                .invalid_text("Select a bucket for flow logs"),
        )
        .field(FieldSchema::toggle("classic_access"))
        .field(FieldSchema::toggle("manual_address_prefix_management"))
        .field(
            FieldSchema::text("default_network_acl_name")
                .optional()
                .invalid(invalid_default_name)
                .invalid_text("Invalid or duplicate default ACL name"),
        )
        .field(
            FieldSchema::text("default_security_group_name")
                .optional()
                .invalid(invalid_default_name)
                .invalid_text("Invalid or duplicate default security group name"),
        )
        .field(
            FieldSchema::text("default_routing_table_name")
                .optional()
                .invalid(invalid_default_name)
                .invalid_text("Invalid or duplicate default routing table name"),
        )
        .field(FieldSchema::multiselect("public_gateways").with_groups(ZONES))
        .field(FieldSchema::subcollection("address_prefixes"))
        .field(FieldSchema::subcollection("subnets"))
        .field(FieldSchema::subcollection("acls"))
}

pub fn address_prefix_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::AddressPrefixes)
        .field(name_field())
        .field(
            FieldSchema::select("zone")
                .with_groups(ZONES)
                .invalid(invalid_zone)
                .invalid_text("Select a zone"),
        )
        .field(
            FieldSchema::text("cidr")
                .invalid(invalid_cidr)
                .invalid_text("Invalid CIDR block"),
        )
}

pub fn subnet_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::Subnets)
        .field(name_field())
        .field(
            FieldSchema::select("zone")
                .with_groups(ZONES)
                .invalid(invalid_zone)
                .invalid_text("Select a zone"),
        )
        .field(
            FieldSchema::text("cidr")
                .invalid(invalid_subnet_cidr)
                .invalid_text_fn(invalid_subnet_cidr_text)
                .hide_when(dynamic_subnets_enabled),
        )
        .field(
            FieldSchema::select("network_acl")
                .with_dynamic_groups(acl_groups)
                .invalid(required)
                .invalid_text("Select a network ACL"),
        )
        .field(FieldSchema::toggle("public_gateway"))
        .field(
            FieldSchema::select("resource_group")
                .with_dynamic_groups(resource_group_groups)
                .optional(),
        )
}

pub fn subnet_tier_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::SubnetTier)
        .field(name_field())
        .field(FieldSchema::toggle("advanced"))
        .field(
            FieldSchema::number("zones")
                .with_default(Value::from(3))
                .invalid(|i| is_required_range_invalid(i.value(), 0, 3))
                .invalid_text("Zones must be a whole number between 0 and 3")
                .hide_when(|i| i.data.flag("advanced")),
        )
        .field(
            FieldSchema::multiselect("select_zones")
                .with_groups(ZONES)
                .invalid(required)
                .invalid_text("Select at least one zone")
                .hide_when(not_advanced),
        )
        .field(
            FieldSchema::select("network_acl")
                .with_dynamic_groups(acl_groups)
                .invalid(required)
                .invalid_text("Select a network ACL")
                .hide_when(|i| i.data.flag("advanced")),
        )
        .field(FieldSchema::toggle("public_gateway"))
}

pub fn acl_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::Acls)
        .field(name_field())
        .field(resource_group_field())
        .field(FieldSchema::toggle("use_data"))
        .field(FieldSchema::subcollection("rules"))
}

pub fn acl_rule_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::AclRules)
        .field(name_field())
        .field(
            FieldSchema::select("action")
                .with_groups(ACL_ACTIONS)
                .optional()
                .invalid(|i| !ACL_ACTIONS.contains(&i.text()))
                .invalid_text("Select allow or deny"),
        )
        .field(
            FieldSchema::select("direction")
                .with_groups(DIRECTIONS)
                .optional()
                .invalid(|i| !DIRECTIONS.contains(&i.text()))
                .invalid_text("Select inbound or outbound"),
        )
        .field(
            FieldSchema::text("source")
                .invalid(invalid_ip_or_cidr)
                .invalid_text("Must be a valid IP or CIDR block"),
        )
        .field(
            FieldSchema::text("destination")
                .invalid(invalid_ip_or_cidr)
                .invalid_text("Must be a valid IP or CIDR block"),
        )
        .field(
            FieldSchema::select("ruleProtocol")
                .with_groups(PROTOCOLS)
                .with_default(Value::from("all"))
                .optional()
                .invalid(|i| !PROTOCOLS.contains(&i.text())),
        )
}

pub fn security_group_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::SecurityGroups)
        .field(name_field())
        .field(resource_group_field())
        .field(vpc_field())
        .field(FieldSchema::toggle("use_data"))
        .field(FieldSchema::subcollection("rules"))
}

pub fn sg_rule_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::SgRules)
        .field(name_field())
        .field(
            FieldSchema::select("direction")
                .with_groups(DIRECTIONS)
                .optional()
                .invalid(|i| !DIRECTIONS.contains(&i.text()))
                .invalid_text("Select inbound or outbound"),
        )
        .field(
            FieldSchema::text("source")
                .invalid(invalid_ip_or_cidr)
                .invalid_text("Must be a valid IP or CIDR block"),
        )
        .field(
            FieldSchema::select("ruleProtocol")
                .with_groups(PROTOCOLS)
                .with_default(Value::from("all"))
                .optional()
                .invalid(|i| !PROTOCOLS.contains(&i.text())),
        )
}

pub fn vpn_gateway_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::VpnGateways)
        .field(name_field())
        .field(resource_group_field())
        .field(vpc_field())
        .field(
            FieldSchema::select("subnet")
                .with_dynamic_groups(subnet_groups)
                .invalid(required)
                .invalid_text("Select a subnet"),
        )
        .field(
            FieldSchema::select("policy")
                .with_groups(&["route", "policy"])
                .optional(),
        )
        .field(FieldSchema::subcollection("connections"))
}

pub fn vpn_connection_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::VpnConnections)
        .field(name_field())
        .field(
            FieldSchema::text("peer_address")
                .invalid(invalid_ip)
                .invalid_text("Must be a valid IP address"),
        )
        .field(
            FieldSchema::multiselect("local_cidrs")
                .invalid(invalid_cidr_list)
                .invalid_text("Enter one or more valid CIDR blocks"),
        )
        .field(
            FieldSchema::multiselect("peer_cidrs")
                .invalid(invalid_cidr_list)
                .invalid_text("Enter one or more valid CIDR blocks"),
        )
}

pub fn vpe_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::VirtualPrivateEndpoints)
        .field(name_field())
        .field(
            FieldSchema::select("service")
                .with_dynamic_groups(vpe_service_groups)
                .invalid(required)
                .invalid_text("Select a service"),
        )
        .field(resource_group_field())
        .field(vpc_field())
        .field(subnets_field())
        .field(security_groups_field())
}

pub fn transit_gateway_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::TransitGateways)
        .field(name_field())
        .field(resource_group_field())
        .field(FieldSchema::toggle("global"))
        .field(FieldSchema::toggle("use_data"))
        .field(FieldSchema::multiselect("crns").optional())
        .field(FieldSchema::subcollection("connections"))
}

pub fn routing_table_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::RoutingTables)
        .field(name_field())
        .field(vpc_field())
        .field(FieldSchema::toggle("route_direct_link_ingress"))
        .field(FieldSchema::toggle("route_transit_gateway_ingress"))
        .field(FieldSchema::toggle("route_vpc_zone_ingress"))
        .field(FieldSchema::toggle("internet_ingress"))
        .field(FieldSchema::subcollection("routes"))
}

pub fn route_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::Routes)
        .field(name_field())
        .field(
            FieldSchema::select("zone")
                .with_groups(ZONES)
                .invalid(invalid_zone)
                .invalid_text("Select a zone"),
        )
        .field(
            FieldSchema::text("destination")
                .invalid(invalid_cidr)
                .invalid_text("Invalid CIDR block"),
        )
        .field(required_select("action", "Select an action").with_groups(ROUTE_ACTIONS))
        .field(
            FieldSchema::text("next_hop")
                .invalid(invalid_ip)
                .invalid_text("Must be a valid IP address")
                .hide_when(not_deliver),
        )
}

pub fn load_balancer_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::LoadBalancers)
        .field(name_field())
        .field(resource_group_field())
        .field(vpc_field())
        .field(required_select("type", "Select a load balancer type").with_groups(&["public", "private"]))
        .field(subnets_field())
        .field(security_groups_field())
        .field(
            FieldSchema::multiselect("target_vsi")
                .with_dynamic_groups(vsi_groups)
                .invalid(required)
                .invalid_text("Select at least one deployment target"),
        )
        .field(required_select("algorithm", "Select an algorithm").with_groups(LB_ALGORITHMS))
        .field(required_select("pool_protocol", "Select a pool protocol").with_groups(LB_PROTOCOLS))
        .field(
            required_select("pool_health_protocol", "Select a health check protocol")
                .with_groups(LB_HEALTH_PROTOCOLS),
        )
        .field(required_select("listener_protocol", "Select a listener protocol").with_groups(LB_PROTOCOLS))
        .field(
            FieldSchema::number("listener_port")
                .invalid(|i| is_required_range_invalid(i.value(), 1, 65535))
                .invalid_text("Must be a whole number between 1 and 65535"),
        )
        .field(
            FieldSchema::number("port")
                .invalid(|i| is_required_range_invalid(i.value(), 1, 65535))
                .invalid_text("Must be a whole number between 1 and 65535"),
        )
        .field(
            FieldSchema::number("health_retries")
                .invalid(|i| is_required_range_invalid(i.value(), 1, 10))
                .invalid_text("Must be a whole number between 1 and 10"),
        )
        .field(
            FieldSchema::number("health_timeout")
                .invalid(|i| is_required_range_invalid(i.value(), 5, 3000))
                .invalid_text("Must be a whole number between 5 and 3000"),
        )
        .field(
            FieldSchema::number("health_delay")
                .invalid(|i| is_required_range_invalid(i.value(), 5, 3000))
                .invalid_text("Must be a whole number between 5 and 3000"),
        )
        .field(
            FieldSchema::number("connection_limit")
                .optional()
                .invalid(|i| is_required_range_invalid(i.value(), 1, 15000))
                .invalid_text("Must be a whole number between 1 and 15000"),
        )
        .field(
            FieldSchema::select("session_persistence_type")
                .with_groups(&["source_ip", "app_cookie", "http_cookie"])
                .optional(),
        )
        .field(
            FieldSchema::text("session_persistence_app_cookie_name")
                .invalid(required)
                .invalid_text("Enter a cookie name")
                .hide_when(|i| i.data.text("session_persistence_type") != "app_cookie"),
        )
        .field(FieldSchema::select("proxy_protocol").with_groups(&["disabled", "v1", "v2"]).optional())
}

pub fn vpn_server_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::VpnServers)
        .field(name_field())
        .field(resource_group_field())
        .field(vpc_field())
        .field(subnets_field())
        .field(security_groups_field())
        .field(required_select("method", "Select an authentication method").with_groups(VPN_SERVER_METHODS))
        .field(
            FieldSchema::text("certificate_crn")
                .invalid(|i| !is_crn(i.text()))
                .invalid_text("Enter a valid certificate CRN"),
        )
        .field(
            FieldSchema::text("client_ca_crn")
                .invalid(|i| !is_crn(i.text()))
                .invalid_text("Enter a valid client CA CRN")
                .hide_when(not_certificate),
        )
        .field(
            FieldSchema::text("client_ip_pool")
                .invalid(invalid_cidr)
                .invalid_text("Client IP pool must be a CIDR block"),
        )
        .field(
            FieldSchema::text("client_dns_server_ips")
                .optional()
                .invalid(invalid_optional_ip_list)
                .invalid_text("Enter a comma separated list of IP addresses"),
        )
        .field(
            FieldSchema::number("client_idle_timeout")
                .optional()
                .invalid(|i| is_required_range_invalid(i.value(), 0, 28800))
                .invalid_text("Must be a whole number between 0 and 28800"),
        )
        .field(FieldSchema::toggle("enable_split_tunneling"))
        .field(
            FieldSchema::number("port")
                .invalid(|i| is_required_range_invalid(i.value(), 1, 65535))
                .invalid_text("Must be a whole number between 1 and 65535"),
        )
        .field(required_select("protocol", "Select a protocol").with_groups(VPN_SERVER_PROTOCOLS))
        .field(FieldSchema::subcollection("routes"))
}

pub fn vpn_server_route_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::VpnServerRoutes)
        .field(name_field())
        .field(
            FieldSchema::text("destination")
                .invalid(invalid_cidr)
                .invalid_text("Invalid CIDR block"),
        )
        .field(required_select("action", "Select an action").with_groups(&["translate", "deliver", "drop"]))
}

pub fn fortigate_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::FortigateVnf)
        .field(name_field())
        .field(resource_group_field())
        .field(vpc_field())
        .field(
            FieldSchema::select("zone")
                .with_groups(ZONES)
                .invalid(invalid_zone)
                .invalid_text("Select a zone"),
        )
        .field(
            FieldSchema::select("primary_subnet")
                .with_dynamic_groups(subnet_groups)
                .invalid(required)
                .invalid_text("Select a primary subnet"),
        )
        .field(
            FieldSchema::select("secondary_subnet")
                .with_dynamic_groups(subnet_groups)
                .invalid(required)
                .invalid_text("Select a secondary subnet"),
        )
        .field(required_select("profile", "Select a profile"))
        .field(
            FieldSchema::multiselect("ssh_keys")
                .with_dynamic_groups(ssh_key_groups)
                .invalid(required)
                .invalid_text("Select at least one SSH key"),
        )
        .field(security_groups_field())
}

pub fn schemas() -> Vec<ResourceSchema> {
    vec![
        vpc_schema(),
        address_prefix_schema(),
        subnet_schema(),
        subnet_tier_schema(),
        acl_schema(),
        acl_rule_schema(),
        security_group_schema(),
        sg_rule_schema(),
        vpn_gateway_schema(),
        vpn_connection_schema(),
        vpe_schema(),
        transit_gateway_schema(),
        routing_table_schema(),
        route_schema(),
        load_balancer_schema(),
        vpn_server_schema(),
        vpn_server_route_schema(),
        fortigate_schema(),
    ]
}
