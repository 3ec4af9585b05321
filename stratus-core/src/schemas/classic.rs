//! Classic infrastructure schemas: SSH keys, VLANs, gateways, security
//! groups, bare metal servers and virtual servers

use serde_json::Value;

use crate::document::ResourceExt;
use crate::kind::ResourceKind;
use crate::schema::{FieldInput, FieldSchema, ResourceSchema};
use crate::validate::{is_domain, is_required_range_invalid, is_ssh_public_key};

use super::common::*;
use super::types::*;

fn private_only(input: &FieldInput<'_>) -> bool {
    input.data.flag("private_network_only")
}

fn invalid_domain(input: &FieldInput<'_>) -> bool {
    !is_domain(input.text())
}

fn port_not_applicable(input: &FieldInput<'_>) -> bool {
    matches!(input.data.text("protocol"), "" | "all" | "icmp")
}

fn datacenter_field() -> FieldSchema {
    required_select("datacenter", "Select a datacenter").with_groups(CLASSIC_DATACENTERS)
}

fn domain_field() -> FieldSchema {
    FieldSchema::text("domain")
        .invalid(invalid_domain)
        .invalid_text("Domain must be a fully qualified domain name")
}

fn private_vlan_field() -> FieldSchema {
    FieldSchema::select("private_vlan")
        .with_dynamic_groups(private_vlan_groups)
        .invalid(required)
        .invalid_text("Select a private VLAN")
}

fn public_vlan_field() -> FieldSchema {
    FieldSchema::select("public_vlan")
        .with_dynamic_groups(public_vlan_groups)
        .invalid(required)
        .invalid_text("Select a public VLAN")
        .hide_when(private_only)
}

fn network_speed_field() -> FieldSchema {
    required_select("network_speed", "Select a network speed").with_groups(CLASSIC_NETWORK_SPEEDS)
}

fn public_bandwidth_field() -> FieldSchema {
    required_select("public_bandwidth", "Select a public bandwidth")
        .with_groups(&["500", "1000", "5000", "10000", "20000"])
        .hide_when(private_only)
}

fn disk_key_names_field() -> FieldSchema {
    FieldSchema::multiselect("disk_key_names")
        .invalid(required)
        .invalid_text("Select at least one disk")
}

pub fn classic_ssh_key_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::ClassicSshKeys)
        .field(name_field())
        .field(
            FieldSchema::textarea("public_key")
                .invalid(|i| !is_ssh_public_key(i.text()))
                .invalid_text("Provide a valid SSH public key"),
        )
}

pub fn classic_vlan_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::ClassicVlans)
        .field(name_field())
        .field(datacenter_field())
        .field(required_select("type", "Select a VLAN type").with_groups(CLASSIC_VLAN_TYPES))
        .field(FieldSchema::text("router_hostname").optional())
}

pub fn classic_gateway_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::ClassicGateways)
        .with_description("A classic gateway appliance")
        .field(name_field())
        .field(domain_field())
        .field(datacenter_field())
        .field(network_speed_field())
        .field(public_bandwidth_field())
        .field(required_text("package_key_name", "Enter a package key name"))
        .field(required_text("os_key_name", "Enter an OS key name"))
        .field(required_text("process_key_name", "Enter a process key name"))
        .field(
            FieldSchema::select("ssh_key")
                .with_dynamic_groups(classic_ssh_key_groups)
                .invalid(required)
                .invalid_text("Select an SSH key"),
        )
        .field(disk_key_names_field())
        .field(
            FieldSchema::number("memory")
                .with_default(Value::from(64))
                .invalid(|i| is_required_range_invalid(i.value(), 64, 1024))
                .invalid_text("Memory must be a whole number between 64 and 1024"),
        )
        .field(FieldSchema::toggle("private_network_only"))
        .field(private_vlan_field())
        .field(public_vlan_field())
        .field(FieldSchema::toggle("hadr"))
        .field(FieldSchema::toggle("tcp_monitoring"))
        .field(FieldSchema::toggle("redundant_network"))
}

pub fn classic_security_group_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::ClassicSecurityGroups)
        .field(name_field())
        .field(FieldSchema::textarea("description").optional())
        .field(FieldSchema::subcollection("classic_sg_rules"))
}

pub fn classic_sg_rule_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::ClassicSgRules)
        .field(name_field())
        .field(required_select("direction", "Select a direction").with_groups(&["ingress", "egress"]))
        .field(
            FieldSchema::select("protocol")
                .with_groups(PROTOCOLS)
                .with_default(Value::from("all"))
                .optional(),
        )
        .field(
            FieldSchema::number("port_range_min")
                .optional()
                .invalid(|i| is_required_range_invalid(i.value(), 1, 65535))
                .invalid_text("Must be a whole number between 1 and 65535")
                .hide_when(port_not_applicable),
        )
        .field(
            FieldSchema::number("port_range_max")
                .optional()
                .invalid(|i| is_required_range_invalid(i.value(), 1, 65535))
                .invalid_text("Must be a whole number between 1 and 65535")
                .hide_when(port_not_applicable),
        )
        .field(
            FieldSchema::text("remote_ip")
                .optional()
                .invalid(invalid_optional_ip)
                .invalid_text("Must be a valid IP address"),
        )
        .field(FieldSchema::select("ether_type").with_groups(&["IPv4", "IPv6"]).optional())
}

pub fn classic_bare_metal_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::ClassicBareMetal)
        .field(name_field())
        .field(domain_field())
        .field(datacenter_field())
        .field(required_text("package_key_name", "Enter a package key name"))
        .field(required_text("os_key_name", "Enter an OS key name"))
        .field(required_text("process_key_name", "Enter a process key name"))
        .field(
            FieldSchema::number("memory")
                .invalid(|i| is_required_range_invalid(i.value(), 16, 1536))
                .invalid_text("Memory must be a whole number between 16 and 1536"),
        )
        .field(network_speed_field())
        .field(public_bandwidth_field())
        .field(disk_key_names_field())
        .field(FieldSchema::toggle("private_network_only"))
        .field(private_vlan_field())
        .field(public_vlan_field())
}

pub fn classic_vsi_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::ClassicVsi)
        .field(name_field())
        .field(domain_field())
        .field(datacenter_field())
        .field(
            FieldSchema::number("cores")
                .invalid(|i| is_required_range_invalid(i.value(), 1, 56))
                .invalid_text("Cores must be a whole number between 1 and 56"),
        )
        .field(
            FieldSchema::number("memory")
                .invalid(|i| is_required_range_invalid(i.value(), 1024, 1_048_576))
                .invalid_text("Memory (MB) must be a whole number between 1024 and 1048576"),
        )
        .field(required_text("image_id", "Enter an image ID"))
        .field(FieldSchema::toggle("local_disk"))
        .field(network_speed_field())
        .field(
            FieldSchema::multiselect("ssh_keys")
                .with_dynamic_groups(classic_ssh_key_groups)
                .invalid(required)
                .invalid_text("Select at least one SSH key"),
        )
        .field(FieldSchema::toggle("private_network_only"))
        .field(private_vlan_field())
        .field(public_vlan_field())
        .field(FieldSchema::multiselect("private_security_groups").optional())
        .field(
            FieldSchema::multiselect("public_security_groups")
                .optional()
                .hide_when(private_only),
        )
}

pub fn schemas() -> Vec<ResourceSchema> {
    vec![
        classic_ssh_key_schema(),
        classic_vlan_schema(),
        classic_gateway_schema(),
        classic_security_group_schema(),
        classic_sg_rule_schema(),
        classic_bare_metal_schema(),
        classic_vsi_schema(),
    ]
}
