//! Account, security and identity schemas: options, resource groups, key
//! management, object storage, secrets, activity tracking, IAM, access
//! groups, compliance and context based restrictions

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::context::all_of;
use crate::document::ResourceExt;
use crate::kind::ResourceKind;
use crate::schema::{FieldInput, FieldSchema, ResourceSchema};
use crate::validate::{
    is_cidr, is_crn, is_https_url, is_ip, is_required_range_invalid, is_valid_name, is_valid_prefix,
};

use super::common::*;
use super::types::*;

static DESCRIPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][a-zA-Z0-9\-._,\s]*$").unwrap());

static ACCOUNT_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9a-f]{32}$").unwrap());

const CBR_EXCLUSION_TYPES: &[&str] = &["ipAddress", "ipRange", "subnet"];

// ========== Predicates ==========

fn invalid_prefix(input: &FieldInput<'_>) -> bool {
    !is_valid_prefix(input.text())
}

fn invalid_account_id(input: &FieldInput<'_>) -> bool {
    !ACCOUNT_ID_RE.is_match(input.text())
}

/// Free-form description: at most 1000 characters, starting with a letter
fn invalid_description(input: &FieldInput<'_>) -> bool {
    let text = input.text();
    text.len() > 1000 || !DESCRIPTION_RE.is_match(text)
}

fn invalid_short_description(input: &FieldInput<'_>) -> bool {
    input.text().len() > 300
}

fn power_vs_zone_groups(input: &FieldInput<'_>) -> Vec<String> {
    power_zones(input.data.text("region"), input.data.flag("power_vs_high_availability"))
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn invalid_power_vs_zones(input: &FieldInput<'_>) -> bool {
    let allowed = power_vs_zone_groups(input);
    let zones = input.data.strings(input.field);
    zones.is_empty() || zones.iter().any(|z| !allowed.iter().any(|a| a == z))
}

fn power_vs_disabled(input: &FieldInput<'_>) -> bool {
    !input.data.flag("enable_power_vs")
}

/// Bucket encryption key: required when the owning instance uses key management
fn invalid_bucket_key(input: &FieldInput<'_>) -> bool {
    let encrypted = input
        .ctx
        .parent_resource(ResourceKind::Buckets)
        .is_some_and(|cos| !cos.is_blank("kms"));
    encrypted && input.is_blank()
}

fn bucket_groups(input: &FieldInput<'_>) -> Vec<String> {
    all_of(input.doc(), ResourceKind::Buckets)
        .iter()
        .map(|b| b.name().to_string())
        .collect()
}

fn cos_key_groups(input: &FieldInput<'_>) -> Vec<String> {
    all_of(input.doc(), ResourceKind::CosKeys)
        .iter()
        .map(|k| k.name().to_string())
        .collect()
}

fn no_atracker_instance(input: &FieldInput<'_>) -> bool {
    !input.data.flag("instance")
}

/// `a.b.c.d-e.f.g.h` with both ends valid and ordered
fn is_ip_range(value: &str) -> bool {
    let Some((start, end)) = value.split_once('-') else {
        return false;
    };
    match (start.parse::<std::net::Ipv4Addr>(), end.parse::<std::net::Ipv4Addr>()) {
        (Ok(start), Ok(end)) => u32::from(start) <= u32::from(end),
        _ => false,
    }
}

/// Address value checked against the address type
fn invalid_cbr_address_value(input: &FieldInput<'_>) -> bool {
    let value = input.text();
    match input.data.text("type") {
        "ipAddress" => !is_ip(value),
        "ipRange" => !is_ip_range(value),
        "subnet" => !is_cidr(value),
        "vpc" => !is_crn(value),
        _ => value.trim().is_empty(),
    }
}

fn invalid_cbr_address_text(input: &FieldInput<'_>) -> String {
    match input.data.text("type") {
        "ipAddress" => "Value must be a valid IP address".to_string(),
        "ipRange" => "Value must be a valid range of IP addresses".to_string(),
        "subnet" => "Value must be a valid CIDR block".to_string(),
        "vpc" => "Value must be a valid VPC CRN".to_string(),
        _ => "Enter a value".to_string(),
    }
}

fn invalid_name_value(input: &FieldInput<'_>) -> bool {
    !is_valid_name(input.text())
}

fn iam_disabled(input: &FieldInput<'_>) -> bool {
    !input.data.flag("enable")
}

// ========== Schemas ==========

pub fn options_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::Options)
        .with_description("Deployment-wide options")
        .field(
            FieldSchema::text("prefix")
                .invalid(invalid_prefix)
                .invalid_text("Prefix must follow the name pattern and be at most 16 characters"),
        )
        .field(required_select("region", "Select a region").with_groups(REGIONS))
        .field(
            FieldSchema::select("zones")
                .with_groups(&["1", "2", "3"])
                .with_default(Value::from(3))
                .invalid(|i| is_required_range_invalid(i.value(), 1, 3))
                .invalid_text("Select a number of zones"),
        )
        .field(
            FieldSchema::multiselect("tags")
                .optional()
                .invalid(invalid_tags)
                .invalid_text("One or more tags are invalid"),
        )
        .field(required_select("endpoints", "Select an endpoint type").with_groups(ENDPOINTS))
        .field(
            FieldSchema::text("account_id")
                .optional()
                .invalid(invalid_account_id)
                .invalid_text("Account ID must be 32 hexadecimal characters"),
        )
        .field(FieldSchema::toggle("dynamic_subnets"))
        .field(FieldSchema::toggle("fs_cloud"))
        .field(FieldSchema::toggle("enable_classic"))
        .field(FieldSchema::toggle("enable_power_vs"))
        .field(FieldSchema::toggle("power_vs_high_availability").hide_when(power_vs_disabled))
        .field(
            FieldSchema::multiselect("power_vs_zones")
                .with_dynamic_groups(power_vs_zone_groups)
                .invalid(invalid_power_vs_zones)
                .invalid_text("Select one or more Power VS zones in the region")
                .hide_when(power_vs_disabled),
        )
}

pub fn resource_group_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::ResourceGroups)
        .field(name_field())
        .field(FieldSchema::toggle("use_prefix").with_default(Value::Bool(true)))
        .field(FieldSchema::toggle("use_data"))
}

pub fn key_management_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::KeyManagement)
        .with_description("Key Protect or Hyper Protect Crypto Services instance")
        .field(name_field())
        .field(resource_group_field())
        .field(FieldSchema::toggle("use_hs_crypto"))
        .field(FieldSchema::toggle("use_data"))
        .field(FieldSchema::toggle("authorize_vpc_reader_role").with_default(Value::Bool(true)))
        .field(FieldSchema::subcollection("keys"))
}

pub fn encryption_key_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::EncryptionKeys)
        .field(name_field())
        .field(
            FieldSchema::text("key_ring")
                .optional()
                .invalid(invalid_name_value)
                .invalid_text("Invalid key ring name"),
        )
        .field(FieldSchema::toggle("root_key").with_default(Value::Bool(true)))
        .field(FieldSchema::toggle("force_delete"))
        .field(FieldSchema::select("endpoint").with_groups(&["public", "private"]).optional())
        .field(
            FieldSchema::number("rotation")
                .with_default(Value::from(1))
                .invalid(|i| is_required_range_invalid(i.value(), 1, 12))
                .invalid_text("Must be a whole number between 1 and 12"),
        )
        .field(FieldSchema::toggle("dual_auth_delete"))
}

pub fn object_storage_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::ObjectStorage)
        .field(name_field())
        .field(resource_group_field())
        .field(required_select("plan", "Select a plan").with_groups(&["standard", "lite"]))
        .field(FieldSchema::select("kms").with_dynamic_groups(kms_groups).optional())
        .field(FieldSchema::toggle("use_data"))
        .field(FieldSchema::toggle("use_random_suffix").with_default(Value::Bool(true)))
        .field(FieldSchema::subcollection("buckets"))
        .field(FieldSchema::subcollection("keys"))
}

pub fn bucket_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::Buckets)
        .field(name_field())
        .field(required_select("storage_class", "Select a storage class").with_groups(COS_STORAGE_CLASSES))
        .field(
            FieldSchema::select("kms_key")
                .with_dynamic_groups(encryption_key_groups)
                .invalid(invalid_bucket_key)
                .invalid_text("Select an encryption key"),
        )
        .field(FieldSchema::select("endpoint").with_groups(&["public", "private", "direct"]).optional())
        .field(FieldSchema::toggle("force_delete"))
}

pub fn cos_key_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::CosKeys)
        .field(name_field())
        .field(required_select("role", "Select a role").with_groups(COS_ROLES))
        .field(FieldSchema::toggle("enable_hmac"))
}

pub fn secrets_manager_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::SecretsManager)
        .field(name_field())
        .field(resource_group_field())
        .field(
            FieldSchema::select("kms")
                .with_dynamic_groups(kms_groups)
                .invalid(required)
                .invalid_text("Select a key management instance"),
        )
        .field(
            FieldSchema::select("encryption_key")
                .with_dynamic_groups(encryption_key_groups)
                .invalid(required)
                .invalid_text("Select an encryption key"),
        )
        .field(FieldSchema::toggle("use_secrets_manager"))
}

pub fn atracker_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::Atracker)
        .with_description("Activity Tracker route and target")
        .field(FieldSchema::toggle("enabled").with_default(Value::Bool(true)))
        .field(resource_group_field())
        .field(
            FieldSchema::select("collector_bucket_name")
                .with_dynamic_groups(bucket_groups)
                .invalid(required)
                .invalid_text("Select a bucket"),
        )
        .field(
            FieldSchema::select("cos_key")
                .with_dynamic_groups(cos_key_groups)
                .invalid(required)
                .invalid_text("Select an Object Storage key"),
        )
        .field(
            FieldSchema::multiselect("locations")
                .with_groups(REGIONS)
                .invalid(required)
                .invalid_text("Select at least one location"),
        )
        .field(FieldSchema::toggle("add_route").with_default(Value::Bool(true)))
        .field(FieldSchema::toggle("instance"))
        .field(
            required_select("plan", "Select a plan")
                .with_groups(&["lite", "7-day", "14-day", "30-day"])
                .hide_when(no_atracker_instance),
        )
}

pub fn appid_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::Appid)
        .field(name_field())
        .field(resource_group_field())
        .field(FieldSchema::toggle("use_data"))
        .field(FieldSchema::subcollection("keys"))
}

pub fn appid_key_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::AppidKeys).field(name_field())
}

pub fn iam_account_settings_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::IamAccountSettings)
        .field(FieldSchema::toggle("enable"))
        .field(required_select("mfa", "Select an MFA option").with_groups(MFA_OPTIONS).hide_when(iam_disabled))
        .field(
            FieldSchema::text("allowed_ip_addresses")
                .optional()
                .invalid(invalid_optional_ip_list)
                .invalid_text("Enter a comma separated list of IP addresses")
                .hide_when(iam_disabled),
        )
        .field(FieldSchema::toggle("include_history"))
        .field(
            FieldSchema::number("max_sessions_per_identity")
                .invalid(|i| is_required_range_invalid(i.value(), 1, 10))
                .invalid_text("Must be a whole number between 1 and 10")
                .hide_when(iam_disabled),
        )
        .field(
            required_select("restrict_create_service_id", "Select a restriction")
                .with_groups(RESTRICT_SERVICE_ID)
                .hide_when(iam_disabled),
        )
        .field(
            required_select("restrict_create_platform_apikey", "Select a restriction")
                .with_groups(RESTRICT_SERVICE_ID)
                .hide_when(iam_disabled),
        )
        .field(
            FieldSchema::number("session_expiration_in_seconds")
                .optional()
                .invalid(|i| is_required_range_invalid(i.value(), 900, 86400))
                .invalid_text("Must be a whole number between 900 and 86400")
                .hide_when(iam_disabled),
        )
        .field(
            FieldSchema::number("session_invalidation_in_seconds")
                .optional()
                .invalid(|i| is_required_range_invalid(i.value(), 900, 7200))
                .invalid_text("Must be a whole number between 900 and 7200")
                .hide_when(iam_disabled),
        )
}

pub fn access_group_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::AccessGroups)
        .field(name_field())
        .field(
            FieldSchema::textarea("description")
                .optional()
                .invalid(invalid_description)
                .invalid_text("Invalid description"),
        )
        .field(FieldSchema::subcollection("policies"))
        .field(FieldSchema::subcollection("dynamic_policies"))
}

pub fn policy_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::Policies)
        .field(name_field())
        .field(FieldSchema::multiselect("roles").optional())
        .field(FieldSchema::object("resources"))
}

pub fn dynamic_policy_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::DynamicPolicies)
        .field(name_field())
        .field(
            FieldSchema::text("identity_provider")
                .invalid(|i| !is_https_url(i.text()))
                .invalid_text("Identity provider must be an https URL"),
        )
        .field(
            FieldSchema::number("expiration")
                .invalid(|i| is_required_range_invalid(i.value(), 1, 24))
                .invalid_text("Must be a whole number between 1 and 24"),
        )
        .field(FieldSchema::object("conditions"))
}

pub fn scc_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::Scc)
        .field(FieldSchema::toggle("enable"))
        .field(required_select("region", "Select a region").with_groups(REGIONS))
        .field(
            FieldSchema::textarea("collector_description")
                .optional()
                .invalid(invalid_description)
                .invalid_text("Invalid description"),
        )
        .field(
            FieldSchema::textarea("scope_description")
                .optional()
                .invalid(invalid_description)
                .invalid_text("Invalid description"),
        )
}

pub fn cbr_zone_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::CbrZones)
        .field(name_field())
        .field(
            FieldSchema::text("account_id")
                .optional()
                .invalid(invalid_account_id)
                .invalid_text("Account ID must be 32 hexadecimal characters"),
        )
        .field(
            FieldSchema::textarea("description")
                .optional()
                .invalid(invalid_short_description)
                .invalid_text("Description must be at most 300 characters"),
        )
        .field(FieldSchema::subcollection("addresses"))
        .field(FieldSchema::subcollection("exclusions"))
}

pub fn cbr_address_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::CbrAddresses)
        .field(name_field())
        .field(required_select("type", "Select an address type").with_groups(CBR_ADDRESS_TYPES))
        .field(
            FieldSchema::text("value")
                .invalid(invalid_cbr_address_value)
                .invalid_text_fn(invalid_cbr_address_text),
        )
}

pub fn cbr_exclusion_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::CbrExclusions)
        .field(name_field())
        .field(required_select("type", "Select an address type").with_groups(CBR_EXCLUSION_TYPES))
        .field(
            FieldSchema::text("value")
                .invalid(invalid_cbr_address_value)
                .invalid_text_fn(invalid_cbr_address_text),
        )
}

pub fn cbr_rule_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::CbrRules)
        .field(name_field())
        .field(
            FieldSchema::textarea("description")
                .optional()
                .invalid(invalid_short_description)
                .invalid_text("Description must be at most 300 characters"),
        )
        .field(
            required_select("enforcement_mode", "Select an enforcement mode")
                .with_groups(CBR_ENFORCEMENT_MODES),
        )
        .field(FieldSchema::text("api_type_id").optional())
        .field(FieldSchema::subcollection("contexts"))
        .field(FieldSchema::subcollection("resource_attributes"))
        .field(FieldSchema::subcollection("tags"))
}

pub fn cbr_context_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::CbrContexts)
        .field(
            FieldSchema::select("name")
                .with_groups(CBR_CONTEXT_NAMES)
                .invalid(invalid_name)
                .invalid_text_fn(invalid_name_text),
        )
        .field(required_text("value", "Enter a value"))
}

pub fn cbr_resource_attribute_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::CbrResourceAttributes)
        .field(name_field())
        .field(required_text("value", "Enter a value"))
}

pub fn cbr_tag_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::CbrTags)
        .field(name_field())
        .field(required_text("value", "Enter a value"))
        .field(FieldSchema::select("operator").with_groups(CBR_OPERATORS).optional())
}

pub fn schemas() -> Vec<ResourceSchema> {
    vec![
        options_schema(),
        resource_group_schema(),
        key_management_schema(),
        encryption_key_schema(),
        object_storage_schema(),
        bucket_schema(),
        cos_key_schema(),
        secrets_manager_schema(),
        atracker_schema(),
        appid_schema(),
        appid_key_schema(),
        iam_account_settings_schema(),
        access_group_schema(),
        policy_schema(),
        dynamic_policy_schema(),
        scc_schema(),
        cbr_zone_schema(),
        cbr_address_schema(),
        cbr_exclusion_schema(),
        cbr_rule_schema(),
        cbr_context_schema(),
        cbr_resource_attribute_schema(),
        cbr_tag_schema(),
    ]
}
