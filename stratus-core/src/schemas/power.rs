//! Power Virtual Server schemas: workspaces, their keys, networks and cloud
//! connections, instances and storage volumes

use serde_json::Value;

use crate::document::{Resource, ResourceExt, Singleton, value_as_number};
use crate::kind::ResourceKind;
use crate::schema::{FieldInput, FieldSchema, ResourceSchema};
use crate::validate::{is_ip, is_required_range_invalid, is_ssh_public_key};

use super::common::*;
use super::types::*;

/// Storage option values that place a resource in an affinity relationship
pub const AFFINITY_OPTIONS: &[&str] = &["Affinity", "Anti-Affinity"];

/// Fields that select a storage affinity target, paired with the option
/// they belong to
pub const AFFINITY_FIELDS: &[(&str, &str)] = &[
    ("pi_affinity_instance", "Affinity"),
    ("pi_affinity_volume", "Affinity"),
    ("pi_anti_affinity_instance", "Anti-Affinity"),
    ("pi_anti_affinity_volume", "Anti-Affinity"),
];

/// Workspace named by the candidate's `workspace` field
pub fn workspace<'a>(input: &FieldInput<'a>) -> Option<&'a Resource> {
    let name = input.data.text("workspace");
    input.doc().power.iter().find(|w| w.name() == name)
}

fn workspace_zone_groups(input: &FieldInput<'_>) -> Vec<String> {
    let options = input.doc().singleton(Singleton::Options);
    let selected = options.strings("power_vs_zones");
    if !selected.is_empty() {
        return selected.into_iter().map(str::to_string).collect();
    }
    power_zones(input.doc().region(), options.flag("power_vs_high_availability"))
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn invalid_workspace_zone(input: &FieldInput<'_>) -> bool {
    let zone = input.text();
    zone.is_empty() || !workspace_zone_groups(input).iter().any(|z| z == zone)
}

fn workspace_children(input: &FieldInput<'_>, key: &str) -> Vec<String> {
    workspace(input)
        .map(|w| w.children(key).iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default()
}

fn power_ssh_key_groups(input: &FieldInput<'_>) -> Vec<String> {
    workspace_children(input, "ssh_keys")
}

fn power_network_groups(input: &FieldInput<'_>) -> Vec<String> {
    workspace_children(input, "network")
}

fn power_image_groups(input: &FieldInput<'_>) -> Vec<String> {
    workspace(input)
        .map(|w| w.strings("imageNames").into_iter().map(str::to_string).collect())
        .unwrap_or_default()
}

fn power_instance_groups(input: &FieldInput<'_>) -> Vec<String> {
    let workspace = input.data.text("workspace");
    input
        .doc()
        .power_instances
        .iter()
        .filter(|i| i.text("workspace") == workspace)
        .map(|i| i.name().to_string())
        .collect()
}

fn power_volume_groups(input: &FieldInput<'_>) -> Vec<String> {
    let workspace = input.data.text("workspace");
    input
        .doc()
        .power_volumes
        .iter()
        .filter(|v| v.text("workspace") == workspace)
        .map(|v| v.name().to_string())
        .collect()
}

/// Interfaces: at least one, each naming a workspace network, each IP
/// empty (assigned automatically) or a valid address
fn invalid_instance_network(input: &FieldInput<'_>) -> bool {
    let networks = power_network_groups(input);
    let interfaces = input.data.children(input.field);
    interfaces.is_empty()
        || interfaces.iter().any(|interface| {
            let ip = interface.text("ip_address");
            !networks.iter().any(|n| n == interface.name()) || (!ip.is_empty() && !is_ip(ip))
        })
}

/// Processors: 0.25 to 7 in steps of 0.25, whole numbers for dedicated cores
fn invalid_processors(input: &FieldInput<'_>) -> bool {
    let Some(processors) = input.value().and_then(value_as_number) else {
        return true;
    };
    if !(0.25..=7.0).contains(&processors) {
        return true;
    }
    if input.data.text("pi_proc_type") == "dedicated" {
        processors.fract() != 0.0
    } else {
        (processors * 4.0).fract() != 0.0
    }
}

fn storage_option_is(input: &FieldInput<'_>, option: &str) -> bool {
    input.data.text("pi_storage_option") == option
}

fn not_storage_type(input: &FieldInput<'_>) -> bool {
    !storage_option_is(input, "Storage Type")
}

fn not_storage_pool(input: &FieldInput<'_>) -> bool {
    !storage_option_is(input, "Storage Pool")
}

fn not_affinity(input: &FieldInput<'_>) -> bool {
    !storage_option_is(input, "Affinity")
}

fn not_anti_affinity(input: &FieldInput<'_>) -> bool {
    !storage_option_is(input, "Anti-Affinity")
}

fn affinity_fields(schema: ResourceSchema) -> ResourceSchema {
    schema
        .field(
            FieldSchema::select("pi_storage_option")
                .with_groups(POWER_STORAGE_OPTIONS)
                .with_default(Value::from("None"))
                .optional(),
        )
        .field(
            FieldSchema::select("pi_affinity_instance")
                .with_dynamic_groups(power_instance_groups)
                .optional()
                .hide_when(not_affinity),
        )
        .field(
            FieldSchema::select("pi_affinity_volume")
                .with_dynamic_groups(power_volume_groups)
                .optional()
                .hide_when(not_affinity),
        )
        .field(
            FieldSchema::select("pi_anti_affinity_instance")
                .with_dynamic_groups(power_instance_groups)
                .optional()
                .hide_when(not_anti_affinity),
        )
        .field(
            FieldSchema::select("pi_anti_affinity_volume")
                .with_dynamic_groups(power_volume_groups)
                .optional()
                .hide_when(not_anti_affinity),
        )
}

fn workspace_field() -> FieldSchema {
    FieldSchema::select("workspace")
        .with_dynamic_groups(power_workspace_groups)
        .invalid(|i| i.is_blank() || dangling(i, ResourceKind::Power))
        .invalid_text("Select a workspace")
}

pub fn workspace_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::Power)
        .with_description("A Power Virtual Server workspace")
        .field(name_field())
        .field(resource_group_field())
        .field(
            FieldSchema::select("zone")
                .with_dynamic_groups(workspace_zone_groups)
                .invalid(invalid_workspace_zone)
                .invalid_text("Select a Power VS zone"),
        )
        .field(
            FieldSchema::multiselect("imageNames")
                .invalid(required)
                .invalid_text("Select at least one image"),
        )
        .field(FieldSchema::toggle("use_data"))
        .field(FieldSchema::subcollection("ssh_keys"))
        .field(FieldSchema::subcollection("network"))
        .field(FieldSchema::subcollection("cloud_connections"))
}

pub fn power_ssh_key_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::PowerSshKeys)
        .field(name_field())
        .field(FieldSchema::toggle("use_data"))
        .field(
            FieldSchema::textarea("public_key")
                .invalid(|i| !is_ssh_public_key(i.text()))
                .invalid_text("Provide a valid SSH public key")
                .hide_when(hide_when_use_data),
        )
}

pub fn power_network_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::PowerNetwork)
        .field(name_field())
        .field(required_select("pi_network_type", "Select a network type").with_groups(POWER_NETWORK_TYPES))
        .field(
            FieldSchema::text("pi_cidr")
                .invalid(invalid_cidr)
                .invalid_text("Invalid CIDR block"),
        )
        .field(
            FieldSchema::multiselect("pi_dns")
                .optional()
                .invalid(invalid_optional_ip_list)
                .invalid_text("DNS servers must be valid IP addresses"),
        )
        .field(
            FieldSchema::number("pi_network_mtu")
                .optional()
                .invalid(|i| is_required_range_invalid(i.value(), 1450, 9000))
                .invalid_text("Must be a whole number between 1450 and 9000"),
        )
}

pub fn cloud_connection_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::PowerCloudConnections)
        .field(name_field())
        .field(
            required_select("pi_cloud_connection_speed", "Select a speed")
                .with_groups(POWER_CONNECTION_SPEEDS),
        )
        .field(FieldSchema::toggle("pi_cloud_connection_global_routing"))
        .field(FieldSchema::toggle("pi_cloud_connection_metered"))
        .field(FieldSchema::toggle("pi_cloud_connection_transit_enabled"))
        .field(
            FieldSchema::multiselect("transit_gateways")
                .invalid(required)
                .invalid_text("Select at least one transit gateway")
                .hide_when(|i| !i.data.flag("pi_cloud_connection_transit_enabled")),
        )
}

pub fn power_instance_schema() -> ResourceSchema {
    let schema = ResourceSchema::new(ResourceKind::PowerInstances)
        .with_description("A Power Virtual Server instance")
        .field(name_field())
        .field(workspace_field())
        .field(
            FieldSchema::multiselect("network")
                .with_dynamic_groups(power_network_groups)
                .invalid(invalid_instance_network)
                .invalid_text("Select at least one network; interface IPs must be valid or empty"),
        )
        .field(
            FieldSchema::select("ssh_key")
                .with_dynamic_groups(power_ssh_key_groups)
                .invalid(required)
                .invalid_text("Select an SSH key"),
        )
        .field(
            FieldSchema::select("image")
                .with_dynamic_groups(power_image_groups)
                .invalid(required)
                .invalid_text("Select an image"),
        )
        .field(required_select("pi_sys_type", "Select a system type").with_groups(POWER_SYSTEM_TYPES))
        .field(required_select("pi_proc_type", "Select a processor type").with_groups(POWER_PROC_TYPES))
        .field(
            FieldSchema::number("pi_processors")
                .invalid(invalid_processors)
                .invalid_text("Processors must be between 0.25 and 7 in increments of 0.25"),
        )
        .field(
            FieldSchema::number("pi_memory")
                .invalid(|i| is_required_range_invalid(i.value(), 2, 934))
                .invalid_text("Must be a whole number between 2 and 934"),
        );
    affinity_fields(schema)
        .field(
            required_select("pi_storage_type", "Select a storage type")
                .with_groups(POWER_STORAGE_TYPES)
                .hide_when(not_storage_type),
        )
        .field(required_text("pi_storage_pool", "Enter a storage pool").hide_when(not_storage_pool))
}

pub fn power_volume_schema() -> ResourceSchema {
    let schema = ResourceSchema::new(ResourceKind::PowerVolumes)
        .field(name_field())
        .field(workspace_field())
        .field(
            FieldSchema::number("pi_volume_size")
                .invalid(|i| is_required_range_invalid(i.value(), 1, 2000))
                .invalid_text("Must be a whole number between 1 and 2000"),
        );
    affinity_fields(schema)
        .field(
            required_select("pi_volume_type", "Select a volume type")
                .with_groups(POWER_STORAGE_TYPES)
                .hide_when(not_storage_type),
        )
        .field(required_text("pi_volume_pool", "Enter a storage pool").hide_when(not_storage_pool))
        .field(FieldSchema::toggle("pi_volume_shareable"))
        .field(FieldSchema::toggle("pi_replication_enabled"))
        .field(
            FieldSchema::multiselect("attachments")
                .with_dynamic_groups(power_instance_groups)
                .optional(),
        )
}

pub fn schemas() -> Vec<ResourceSchema> {
    vec![
        workspace_schema(),
        power_ssh_key_schema(),
        power_network_schema(),
        cloud_connection_schema(),
        power_instance_schema(),
        power_volume_schema(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{SaveContext, Scope};
    use crate::document::ConfigDocument;
    use serde_json::json;

    fn doc() -> ConfigDocument {
        serde_json::from_value(json!({
            "_options": { "region": "us-south", "power_vs_zones": ["dal10", "dal12"] },
            "power": [{
                "name": "oracle",
                "zone": "dal10",
                "imageNames": ["7300-00-01"],
                "ssh_keys": [{ "name": "keys" }],
                "network": [{ "name": "oracle-public" }, { "name": "oracle-private" }]
            }]
        }))
        .unwrap()
    }

    fn obj(value: Value) -> Resource {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn interface_ips_may_be_empty() {
        let doc = doc();
        let ctx = SaveContext::new(&doc, Scope::new_top_level());
        let schema = power_instance_schema();
        let field = schema.get("network").unwrap();
        for (network, invalid) in [
            (json!([{ "name": "oracle-public", "ip_address": "" }]), false),
            (json!([{ "name": "oracle-public", "ip_address": "10.0.0.4" }]), false),
            (json!([{ "name": "oracle-public", "ip_address": "10.0.0" }]), true),
            (json!([{ "name": "missing", "ip_address": "" }]), true),
            (json!([]), true),
        ] {
            let data = obj(json!({ "workspace": "oracle", "network": network }));
            let input = FieldInput::new(ResourceKind::PowerInstances, "network", &data, &ctx);
            assert_eq!(field.is_invalid(&input), invalid, "{network}");
        }
    }

    #[test]
    fn processors_step_by_quarter() {
        let doc = doc();
        let ctx = SaveContext::new(&doc, Scope::new_top_level());
        let schema = power_instance_schema();
        let field = schema.get("pi_processors").unwrap();
        for (proc_type, processors, invalid) in [
            ("shared", json!(0.25), false),
            ("shared", json!("1.5"), false),
            ("shared", json!(0.3), true),
            ("dedicated", json!(1.5), true),
            ("dedicated", json!(2), false),
            ("capped", json!(8), true),
        ] {
            let data = obj(json!({ "pi_proc_type": proc_type, "pi_processors": processors }));
            let input = FieldInput::new(ResourceKind::PowerInstances, "pi_processors", &data, &ctx);
            assert_eq!(field.is_invalid(&input), invalid, "{proc_type} {processors}");
        }
    }

    #[test]
    fn workspace_zone_limited_to_selected_zones() {
        let doc = doc();
        let ctx = SaveContext::new(&doc, Scope::new_top_level());
        let schema = workspace_schema();
        let field = schema.get("zone").unwrap();
        let data = obj(json!({ "zone": "dal12" }));
        assert!(!field.is_invalid(&FieldInput::new(ResourceKind::Power, "zone", &data, &ctx)));
        let data = obj(json!({ "zone": "us-south" }));
        assert!(field.is_invalid(&FieldInput::new(ResourceKind::Power, "zone", &data, &ctx)));
    }
}
