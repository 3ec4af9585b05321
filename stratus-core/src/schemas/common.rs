//! Field builders, predicates and option lists shared by every schema

use serde_json::Value;

use crate::context::{all_of, names_of};
use crate::document::{Collection, ResourceExt, is_blank_value};
use crate::kind::{NameRule, ResourceKind};
use crate::schema::{FieldInput, FieldSchema};
use crate::validate::{
    NAME_PATTERN, has_duplicate_name, is_cidr, is_ip, is_ip_list, is_valid_name_for, is_tag_list,
};

// ========== Predicates ==========

/// Blank value or empty list
pub fn is_missing(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Array(items)) => items.is_empty(),
        v => is_blank_value(v),
    }
}

/// Required field: blank values and empty lists are invalid
pub fn required(input: &FieldInput<'_>) -> bool {
    is_missing(input.value())
}

/// Name syntax per kind plus uniqueness in the candidate's scope
pub fn invalid_name(input: &FieldInput<'_>) -> bool {
    let name = input.text();
    match input.kind.name_rule() {
        NameRule::None => false,
        _ => {
            !is_valid_name_for(input.kind, name)
                || has_duplicate_name(input.kind, name, input.ctx)
        }
    }
}

pub fn invalid_name_text(input: &FieldInput<'_>) -> String {
    let name = input.text();
    if name.is_empty() {
        return "Name cannot be empty".to_string();
    }
    if has_duplicate_name(input.kind, name, input.ctx) {
        return format!("Name \"{}\" already in use", name);
    }
    match input.kind.name_rule() {
        NameRule::Standard { max_len } => format!(
            "Name must follow the regex pattern: {} and be at most {} characters",
            NAME_PATTERN, max_len
        ),
        NameRule::Domain => "Name must be a fully qualified domain name".to_string(),
        _ => "Invalid name".to_string(),
    }
}

/// Optional IP address (blank allowed)
pub fn invalid_optional_ip(input: &FieldInput<'_>) -> bool {
    !input.is_blank() && !is_ip(input.text())
}

pub fn invalid_ip(input: &FieldInput<'_>) -> bool {
    !is_ip(input.text())
}

pub fn invalid_cidr(input: &FieldInput<'_>) -> bool {
    !is_cidr(input.text())
}

/// Optional comma separated IP list
pub fn invalid_optional_ip_list(input: &FieldInput<'_>) -> bool {
    match input.value() {
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| item.as_str().is_none_or(|ip| !is_ip(ip))),
        v if is_blank_value(v) => false,
        _ => !is_ip_list(input.text()),
    }
}

/// Tag list field: every tag must be a valid tag
pub fn invalid_tags(input: &FieldInput<'_>) -> bool {
    !is_tag_list(&input.data.strings(input.field))
}

/// Reference field whose value is not a name of `kind` in the document
pub fn dangling(input: &FieldInput<'_>, kind: ResourceKind) -> bool {
    let value = input.text();
    !all_of(input.doc(), kind).iter().any(|r| r.name() == value)
}

// ========== Builders ==========

pub fn name_field() -> FieldSchema {
    FieldSchema::text("name")
        .invalid(invalid_name)
        .invalid_text_fn(invalid_name_text)
}

pub fn resource_group_field() -> FieldSchema {
    FieldSchema::select("resource_group")
        .with_dynamic_groups(resource_group_groups)
        .invalid(required)
        .invalid_text("Select a resource group")
}

pub fn vpc_field() -> FieldSchema {
    FieldSchema::select("vpc")
        .with_dynamic_groups(vpc_groups)
        .invalid(required)
        .invalid_text("Select a VPC")
}

pub fn subnets_field() -> FieldSchema {
    FieldSchema::multiselect("subnets")
        .with_dynamic_groups(subnet_groups)
        .invalid(required)
        .invalid_text("Select at least one subnet")
}

pub fn security_groups_field() -> FieldSchema {
    FieldSchema::multiselect("security_groups")
        .with_dynamic_groups(security_group_groups)
        .invalid(required)
        .invalid_text("Select at least one security group")
}

pub fn required_select(name: &'static str, text: &'static str) -> FieldSchema {
    FieldSchema::select(name).invalid(required).invalid_text(text)
}

pub fn required_text(name: &'static str, text: &'static str) -> FieldSchema {
    FieldSchema::text(name).invalid(required).invalid_text(text)
}

// ========== Option lists ==========

fn names(input: &FieldInput<'_>, collection: Collection) -> Vec<String> {
    input
        .doc()
        .collection(collection)
        .iter()
        .map(|r| r.name().to_string())
        .collect()
}

pub fn resource_group_groups(input: &FieldInput<'_>) -> Vec<String> {
    names(input, Collection::ResourceGroups)
}

pub fn vpc_groups(input: &FieldInput<'_>) -> Vec<String> {
    names(input, Collection::Vpcs)
}

pub fn kms_groups(input: &FieldInput<'_>) -> Vec<String> {
    names(input, Collection::KeyManagement)
}

pub fn cos_groups(input: &FieldInput<'_>) -> Vec<String> {
    names(input, Collection::ObjectStorage)
}

pub fn ssh_key_groups(input: &FieldInput<'_>) -> Vec<String> {
    names(input, Collection::SshKeys)
}

pub fn secrets_manager_groups(input: &FieldInput<'_>) -> Vec<String> {
    names(input, Collection::SecretsManager)
}

pub fn vsi_groups(input: &FieldInput<'_>) -> Vec<String> {
    names(input, Collection::Vsi)
}

pub fn power_workspace_groups(input: &FieldInput<'_>) -> Vec<String> {
    names(input, Collection::Power)
}

pub fn classic_ssh_key_groups(input: &FieldInput<'_>) -> Vec<String> {
    names(input, Collection::ClassicSshKeys)
}

/// Subnets of the VPC selected in the candidate's `vpc` field
pub fn subnet_groups(input: &FieldInput<'_>) -> Vec<String> {
    match input.data.str_field("vpc") {
        Some(vpc) => names_of(input.doc(), ResourceKind::Subnets, Some(vpc)),
        None => Vec::new(),
    }
}

/// Security groups attached to the candidate's VPC
pub fn security_group_groups(input: &FieldInput<'_>) -> Vec<String> {
    let vpc = input.data.text("vpc");
    input
        .doc()
        .security_groups
        .iter()
        .filter(|sg| sg.text("vpc") == vpc)
        .map(|sg| sg.name().to_string())
        .collect()
}

/// Keys of the key management instance selected in the candidate's `kms` field
pub fn encryption_key_groups(input: &FieldInput<'_>) -> Vec<String> {
    match input.data.str_field("kms") {
        Some(kms) => names_of(input.doc(), ResourceKind::EncryptionKeys, Some(kms)),
        None => all_of(input.doc(), ResourceKind::EncryptionKeys)
            .iter()
            .map(|k| k.name().to_string())
            .collect(),
    }
}

/// Classic VLANs in the candidate's datacenter of the given type
pub fn classic_vlans_of_type(input: &FieldInput<'_>, vlan_type: &str) -> Vec<String> {
    let datacenter = input.data.text("datacenter");
    input
        .doc()
        .classic_vlans
        .iter()
        .filter(|v| v.text("datacenter") == datacenter && v.text("type") == vlan_type)
        .map(|v| v.name().to_string())
        .collect()
}

pub fn private_vlan_groups(input: &FieldInput<'_>) -> Vec<String> {
    classic_vlans_of_type(input, "PRIVATE")
}

pub fn public_vlan_groups(input: &FieldInput<'_>) -> Vec<String> {
    classic_vlans_of_type(input, "PUBLIC")
}

// ========== Visibility ==========

/// Hidden when the candidate imports an existing resource (`use_data`)
pub fn hide_when_use_data(input: &FieldInput<'_>) -> bool {
    input.data.flag("use_data")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{SaveContext, Scope};
    use crate::document::ConfigDocument;
    use serde_json::json;

    fn doc() -> ConfigDocument {
        serde_json::from_value(json!({
            "resource_groups": [{ "name": "slz-rg" }],
            "vpcs": [
                { "name": "management", "subnets": [{ "name": "vsi-zone-1" }] },
                { "name": "workload", "subnets": [{ "name": "vpe-zone-1" }] }
            ],
            "security_groups": [
                { "name": "management-vpe", "vpc": "management" },
                { "name": "workload-vpe", "vpc": "workload" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn option_lists_follow_candidate_vpc() {
        let doc = doc();
        let ctx = SaveContext::new(&doc, Scope::new_top_level());
        let data = json!({ "vpc": "workload" });
        let data = data.as_object().unwrap();
        let input = FieldInput::new(ResourceKind::Vsi, "subnets", data, &ctx);
        assert_eq!(subnet_groups(&input), vec!["vpe-zone-1"]);
        assert_eq!(security_group_groups(&input), vec!["workload-vpe"]);
        assert_eq!(resource_group_groups(&input), vec!["slz-rg"]);
    }

    #[test]
    fn name_messages() {
        let doc = doc();
        let ctx = SaveContext::new(&doc, Scope::new_top_level());
        let data = json!({ "name": "management" });
        let input = FieldInput::new(ResourceKind::Vpcs, "name", data.as_object().unwrap(), &ctx);
        assert!(invalid_name(&input));
        assert_eq!(invalid_name_text(&input), "Name \"management\" already in use");

        let data = json!({ "name": "" });
        let input = FieldInput::new(ResourceKind::Vpcs, "name", data.as_object().unwrap(), &ctx);
        assert!(invalid_name(&input));
        assert_eq!(invalid_name_text(&input), "Name cannot be empty");
    }

    #[test]
    fn missing_values() {
        assert!(is_missing(None));
        assert!(is_missing(Some(&json!([]))));
        assert!(is_missing(Some(&json!(""))));
        assert!(!is_missing(Some(&json!(["a"]))));
        assert!(!is_missing(Some(&json!(false))));
    }

    #[test]
    fn optional_ip_lists_accept_arrays_and_strings() {
        let doc = doc();
        let ctx = SaveContext::new(&doc, Scope::new_top_level());
        for (value, invalid) in [
            (json!({ "ips": ["1.1.1.1"] }), false),
            (json!({ "ips": ["1.1.1.1", "x"] }), true),
            (json!({ "ips": "1.1.1.1,2.2.2.2" }), false),
            (json!({ "ips": "" }), false),
            (json!({ "ips": "1.1.1" }), true),
        ] {
            let input = FieldInput::new(ResourceKind::EventStreams, "ips", value.as_object().unwrap(), &ctx);
            assert_eq!(invalid_optional_ip_list(&input), invalid, "{value}");
        }
    }
}
