//! Platform service schemas: Event Streams, DNS, observability and cloud
//! databases

use serde_json::Value;

use crate::context::names_of;
use crate::document::ResourceExt;
use crate::kind::ResourceKind;
use crate::schema::{FieldInput, FieldSchema, ResourceSchema};
use crate::validate::{is_required_range_invalid, whole_number};

use super::common::*;
use super::types::*;

fn not_enterprise(input: &FieldInput<'_>) -> bool {
    input.data.text("plan") != "enterprise"
}

fn disabled(input: &FieldInput<'_>) -> bool {
    !input.data.flag("enabled")
}

fn dns_zone_groups(input: &FieldInput<'_>) -> Vec<String> {
    match input.ctx.scope.parent() {
        Some(dns) => names_of(input.doc(), ResourceKind::DnsZones, Some(dns)),
        None => Vec::new(),
    }
}

fn record_type<'a>(input: &FieldInput<'a>) -> &'a str {
    input.data.text("type")
}

fn not_mx(input: &FieldInput<'_>) -> bool {
    record_type(input) != "MX"
}

fn not_srv(input: &FieldInput<'_>) -> bool {
    record_type(input) != "SRV"
}

fn encryption_key_required(input: &FieldInput<'_>) -> bool {
    !input.data.is_blank("kms") && input.is_blank()
}

/// Record data checked against the record type
fn invalid_rdata(input: &FieldInput<'_>) -> bool {
    let rdata = input.text();
    match record_type(input) {
        "A" => !crate::validate::is_ip(rdata),
        "AAAA" => rdata.parse::<std::net::Ipv6Addr>().is_err(),
        "CNAME" | "PTR" | "MX" => !crate::validate::is_domain(rdata),
        _ => rdata.trim().is_empty(),
    }
}

fn invalid_rdata_text(input: &FieldInput<'_>) -> String {
    match record_type(input) {
        "A" => "Record data must be a valid IPv4 address".to_string(),
        "AAAA" => "Record data must be a valid IPv6 address".to_string(),
        "CNAME" | "PTR" | "MX" => "Record data must be a domain name".to_string(),
        _ => "Enter record data".to_string(),
    }
}

/// Custom resolvers support at most three subnet locations
fn invalid_resolver_subnets(input: &FieldInput<'_>) -> bool {
    let count = input.data.list_len(input.field);
    count == 0 || count > 3
}

/// ICD CPU: 0 (shared) or at least 3 dedicated cores
fn invalid_icd_cpu(input: &FieldInput<'_>) -> bool {
    match input.value().and_then(whole_number) {
        Some(0) => false,
        Some(n) => !(3..=28).contains(&n),
        None => true,
    }
}

pub fn event_streams_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::EventStreams)
        .field(name_field())
        .field(resource_group_field())
        .field(required_select("plan", "Select a plan").with_groups(EVENT_STREAMS_PLANS))
        .field(
            required_select("endpoints", "Select an endpoint type")
                .with_groups(ENDPOINTS)
                .hide_when(not_enterprise),
        )
        .field(
            FieldSchema::text("private_ip_allowlist")
                .optional()
                .invalid(invalid_optional_ip_list)
                .invalid_text("Enter a comma separated list of IP addresses")
                .hide_when(not_enterprise),
        )
        .field(
            required_select("throughput", "Select a throughput")
                .with_groups(EVENT_STREAMS_THROUGHPUT)
                .hide_when(not_enterprise),
        )
        .field(
            required_select("storage_size", "Select a storage size")
                .with_groups(EVENT_STREAMS_STORAGE)
                .hide_when(not_enterprise),
        )
}

pub fn dns_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::Dns)
        .with_description("A DNS Services instance")
        .field(name_field())
        .field(resource_group_field())
        .field(required_select("plan", "Select a plan").with_groups(DNS_PLANS))
        .field(FieldSchema::toggle("use_data"))
        .field(FieldSchema::subcollection("zones"))
        .field(FieldSchema::subcollection("records"))
        .field(FieldSchema::subcollection("custom_resolvers"))
}

pub fn dns_zone_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::DnsZones)
        .field(name_field())
        .field(FieldSchema::text("label").optional())
        .field(FieldSchema::textarea("description").optional())
        .field(
            FieldSchema::multiselect("vpcs")
                .with_dynamic_groups(vpc_groups)
                .invalid(required)
                .invalid_text("Select at least one VPC"),
        )
}

pub fn dns_record_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::DnsRecords)
        .field(name_field())
        .field(
            FieldSchema::select("dns_zone")
                .with_dynamic_groups(dns_zone_groups)
                .invalid(required)
                .invalid_text("Select a DNS zone"),
        )
        .field(required_select("type", "Select a record type").with_groups(DNS_RECORD_TYPES))
        .field(
            FieldSchema::text("rdata")
                .invalid(invalid_rdata)
                .invalid_text_fn(invalid_rdata_text),
        )
        .field(
            FieldSchema::number("ttl")
                .optional()
                .invalid(|i| is_required_range_invalid(i.value(), 60, 86400))
                .invalid_text("Must be a whole number between 60 and 86400"),
        )
        .field(
            FieldSchema::number("preference")
                .invalid(|i| is_required_range_invalid(i.value(), 0, 65535))
                .invalid_text("Must be a whole number between 0 and 65535")
                .hide_when(not_mx),
        )
        .field(
            FieldSchema::number("port")
                .invalid(|i| is_required_range_invalid(i.value(), 1, 65535))
                .invalid_text("Must be a whole number between 1 and 65535")
                .hide_when(not_srv),
        )
        .field(
            FieldSchema::number("priority")
                .invalid(|i| is_required_range_invalid(i.value(), 0, 65535))
                .invalid_text("Must be a whole number between 0 and 65535")
                .hide_when(not_srv),
        )
        .field(
            FieldSchema::number("weight")
                .invalid(|i| is_required_range_invalid(i.value(), 0, 65535))
                .invalid_text("Must be a whole number between 0 and 65535")
                .hide_when(not_srv),
        )
        .field(
            FieldSchema::text("service")
                .invalid(|i| !i.text().starts_with('_') || i.text().len() < 2)
                .invalid_text("Service name must start with an underscore")
                .hide_when(not_srv),
        )
        .field(
            required_select("protocol", "Select a protocol")
                .with_groups(&["udp", "tcp"])
                .hide_when(not_srv),
        )
}

pub fn custom_resolver_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::DnsCustomResolvers)
        .field(name_field())
        .field(vpc_field())
        .field(
            FieldSchema::multiselect("subnets")
                .with_dynamic_groups(subnet_groups)
                .invalid(invalid_resolver_subnets)
                .invalid_text("Select between one and three subnets"),
        )
        .field(FieldSchema::textarea("description").optional())
}

pub fn logdna_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::Logdna)
        .field(FieldSchema::toggle("enabled"))
        .field(
            required_select("plan", "Select a plan")
                .with_groups(&["lite", "7-day", "14-day", "30-day"])
                .hide_when(disabled),
        )
        .field(resource_group_field().hide_when(disabled))
        .field(
            FieldSchema::select("cos")
                .with_dynamic_groups(cos_groups)
                .invalid(required)
                .invalid_text("Select an Object Storage instance")
                .hide_when(disabled),
        )
        .field(required_select("bucket", "Select a bucket").hide_when(disabled))
        .field(FieldSchema::toggle("platform_logs"))
        .field(FieldSchema::toggle("store_secrets"))
}

pub fn sysdig_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::Sysdig)
        .field(FieldSchema::toggle("enabled"))
        .field(
            required_select("plan", "Select a plan")
                .with_groups(&["tier-1", "graduated-tier"])
                .hide_when(disabled),
        )
        .field(resource_group_field().hide_when(disabled))
        .field(FieldSchema::toggle("platform_logs"))
        .field(FieldSchema::toggle("store_secrets"))
}

pub fn icd_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::Icd)
        .with_description("An IBM Cloud Databases deployment")
        .field(name_field())
        .field(resource_group_field())
        .field(required_select("service", "Select a database service").with_groups(ICD_SERVICES))
        .field(
            FieldSchema::select("plan")
                .with_groups(&["standard", "enterprise", "platinum"])
                .with_default(Value::from("standard"))
                .optional(),
        )
        .field(FieldSchema::select("kms").with_dynamic_groups(kms_groups).optional())
        .field(
            FieldSchema::select("encryption_key")
                .with_dynamic_groups(encryption_key_groups)
                .invalid(encryption_key_required)
                .invalid_text("Select an encryption key"),
        )
        .field(
            FieldSchema::number("memory")
                .optional()
                .invalid(|i| is_required_range_invalid(i.value(), 1, 112))
                .invalid_text("Must be a whole number between 1 and 112"),
        )
        .field(
            FieldSchema::number("disk")
                .optional()
                .invalid(|i| is_required_range_invalid(i.value(), 5, 4096))
                .invalid_text("Must be a whole number between 5 and 4096"),
        )
        .field(
            FieldSchema::number("cpu")
                .optional()
                .invalid(invalid_icd_cpu)
                .invalid_text("CPU must be 0 or a whole number between 3 and 28"),
        )
        .field(FieldSchema::select("group_id").with_groups(&["member"]).optional())
        .field(FieldSchema::toggle("use_data"))
}

pub fn schemas() -> Vec<ResourceSchema> {
    vec![
        event_streams_schema(),
        dns_schema(),
        dns_zone_schema(),
        dns_record_schema(),
        custom_resolver_schema(),
        logdna_schema(),
        sysdig_schema(),
        icd_schema(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{SaveContext, Scope};
    use crate::document::{ConfigDocument, Resource};
    use serde_json::json;

    fn obj(value: Value) -> Resource {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn enterprise_fields_hidden_for_other_plans() {
        let doc = ConfigDocument::new();
        let ctx = SaveContext::new(&doc, Scope::new_top_level());
        let schema = event_streams_schema();

        let data = obj(json!({ "name": "es", "resource_group": "rg", "plan": "standard" }));
        assert!(schema.invalid_fields(&data, &ctx).is_empty());

        let data = obj(json!({ "name": "es", "resource_group": "rg", "plan": "enterprise" }));
        let invalid: Vec<_> = schema.invalid_fields(&data, &ctx).into_iter().map(|(f, _)| f).collect();
        assert_eq!(invalid, vec!["endpoints", "throughput", "storage_size"]);
    }

    #[test]
    fn record_data_follows_type() {
        let doc = ConfigDocument::new();
        let ctx = SaveContext::new(&doc, Scope::nested("dns", None));
        let schema = dns_record_schema();
        let field = schema.get("rdata").unwrap();
        for (kind, rdata, invalid) in [
            ("A", "10.0.0.1", false),
            ("A", "example.com", true),
            ("AAAA", "2001:db8::1", false),
            ("CNAME", "example.com", false),
            ("TXT", "", true),
            ("TXT", "v=spf1", false),
        ] {
            let data = obj(json!({ "name": "r", "type": kind, "rdata": rdata }));
            let input = FieldInput::new(ResourceKind::DnsRecords, "rdata", &data, &ctx);
            assert_eq!(field.is_invalid(&input), invalid, "{kind} {rdata}");
        }
    }

    #[test]
    fn icd_memory_range() {
        let doc = ConfigDocument::new();
        let ctx = SaveContext::new(&doc, Scope::new_top_level());
        let schema = icd_schema();
        let field = schema.get("memory").unwrap();
        for (memory, invalid) in [(json!(1), false), (json!(112), false), (json!(113), true), (json!(""), false)] {
            let data = obj(json!({ "memory": memory }));
            let input = FieldInput::new(ResourceKind::Icd, "memory", &data, &ctx);
            assert_eq!(field.is_invalid(&input), invalid, "{memory}");
        }
    }
}
