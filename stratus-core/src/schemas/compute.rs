//! Compute schemas: SSH keys, virtual servers, block volumes and clusters

use serde_json::Value;

use crate::document::ResourceExt;
use crate::kind::ResourceKind;
use crate::schema::{FieldInput, FieldSchema, ResourceSchema};
use crate::validate::{is_required_range_invalid, is_ssh_public_key, is_tag_list, is_valid_name};

use super::common::*;
use super::types::*;

const VOLUME_PROFILES: &[&str] = &["general-purpose", "5iops-tier", "10iops-tier", "custom"];

/// Public key must parse and must not be registered under another key name
fn invalid_public_key(input: &FieldInput<'_>) -> bool {
    let key = input.text();
    if !is_ssh_public_key(key) {
        return true;
    }
    let editing = input.ctx.scope.editing();
    input
        .doc()
        .ssh_keys
        .iter()
        .any(|k| k.text("public_key") == key && Some(k.name()) != editing)
}

fn invalid_public_key_text(input: &FieldInput<'_>) -> String {
    if is_ssh_public_key(input.text()) {
        "SSH public key is already in use".to_string()
    } else {
        "Provide a unique SSH public key that does not exist in the IBM Cloud account in your region"
            .to_string()
    }
}

fn encryption_key_required(input: &FieldInput<'_>) -> bool {
    !input.data.is_blank("kms") && input.is_blank()
}

fn is_iks(input: &FieldInput<'_>) -> bool {
    input.data.text("type") == "iks"
}

fn not_auto_rotate(input: &FieldInput<'_>) -> bool {
    !input.data.flag("auto_rotate")
}

fn invalid_name_value(input: &FieldInput<'_>) -> bool {
    !is_valid_name(input.text())
}

pub fn ssh_key_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::SshKeys)
        .with_description("An SSH key for virtual servers")
        .field(name_field())
        .field(resource_group_field())
        .field(FieldSchema::toggle("use_data"))
        .field(
            FieldSchema::textarea("public_key")
                .invalid(invalid_public_key)
                .invalid_text_fn(invalid_public_key_text)
                .hide_when(hide_when_use_data),
        )
}

pub fn vsi_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::Vsi)
        .with_description("A deployment of virtual servers across subnets")
        .field(name_field())
        .field(resource_group_field())
        .field(vpc_field())
        .field(subnets_field())
        .field(security_groups_field())
        .field(
            FieldSchema::multiselect("ssh_keys")
                .with_dynamic_groups(ssh_key_groups)
                .invalid(required)
                .invalid_text("Select at least one SSH key"),
        )
        .field(required_select("image", "Select an image"))
        .field(required_select("profile", "Select a profile"))
        .field(
            FieldSchema::number("vsi_per_subnet")
                .with_default(Value::from(1))
                .invalid(|i| is_required_range_invalid(i.value(), 1, 10))
                .invalid_text("Must be a whole number between 1 and 10"),
        )
        .field(FieldSchema::select("kms").with_dynamic_groups(kms_groups).optional())
        .field(
            FieldSchema::select("encryption_key")
                .with_dynamic_groups(encryption_key_groups)
                .invalid(required)
                .invalid_text("Select an encryption key"),
        )
        .field(FieldSchema::textarea("user_data").optional())
        .field(FieldSchema::toggle("enable_floating_ip"))
        .field(FieldSchema::toggle("primary_interface_ip_spoofing"))
        .field(FieldSchema::subcollection("volumes"))
}

pub fn volume_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::Volumes)
        .field(name_field())
        .field(required_select("profile", "Select a profile").with_groups(VOLUME_PROFILES))
        .field(
            FieldSchema::number("capacity")
                .invalid(|i| is_required_range_invalid(i.value(), 10, 16000))
                .invalid_text("Must be a whole number between 10 and 16000"),
        )
        .field(
            FieldSchema::select("encryption_key")
                .with_dynamic_groups(encryption_key_groups)
                .invalid(required)
                .invalid_text("Select an encryption key"),
        )
}

pub fn cluster_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::Clusters)
        .with_description("An OpenShift or IBM Kubernetes Service cluster")
        .field(name_field())
        .field(resource_group_field())
        .field(vpc_field())
        .field(subnets_field())
        .field(required_select("type", "Select a cluster type").with_groups(CLUSTER_TYPES))
        .field(required_select("kube_version", "Select a Kubernetes version"))
        .field(required_select("flavor", "Select a flavor"))
        .field(
            FieldSchema::number("workers_per_subnet")
                .with_default(Value::from(2))
                .invalid(|i| is_required_range_invalid(i.value(), 1, 100))
                .invalid_text("Must be a whole number between 1 and 100"),
        )
        .field(
            FieldSchema::select("cos")
                .with_dynamic_groups(cos_groups)
                .invalid(required)
                .invalid_text("Select an Object Storage instance")
                .hide_when(is_iks),
        )
        .field(FieldSchema::select("kms").with_dynamic_groups(kms_groups).optional())
        .field(
            FieldSchema::select("encryption_key")
                .with_dynamic_groups(encryption_key_groups)
                .invalid(encryption_key_required)
                .invalid_text("Select an encryption key"),
        )
        .field(
            FieldSchema::select("entitlement")
                .with_groups(&["null", "cloud_pak"])
                .optional()
                .hide_when(is_iks),
        )
        .field(FieldSchema::toggle("private_endpoint"))
        .field(FieldSchema::toggle("update_all_workers"))
        .field(FieldSchema::subcollection("worker_pools"))
        .field(FieldSchema::subcollection("opaque_secrets"))
}

pub fn worker_pool_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::WorkerPools)
        .field(name_field())
        .field(required_select("flavor", "Select a flavor"))
        .field(subnets_field())
        .field(
            FieldSchema::number("workers_per_subnet")
                .invalid(|i| is_required_range_invalid(i.value(), 1, 100))
                .invalid_text("Must be a whole number between 1 and 100"),
        )
        .field(FieldSchema::select("entitlement").with_groups(&["null", "cloud_pak"]).optional())
}

pub fn opaque_secret_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::OpaqueSecrets)
        .field(name_field())
        .field(
            FieldSchema::text("namespace")
                .invalid(invalid_name_value)
                .invalid_text("Invalid namespace"),
        )
        .field(FieldSchema::toggle("persistence"))
        .field(
            FieldSchema::select("secrets_manager")
                .with_dynamic_groups(secrets_manager_groups)
                .invalid(required)
                .invalid_text("Select a Secrets Manager instance"),
        )
        .field(
            FieldSchema::text("secrets_group")
                .invalid(invalid_name_value)
                .invalid_text("Invalid secrets group name"),
        )
        .field(required_text("expiration_date", "Enter an expiration date"))
        .field(
            FieldSchema::multiselect("labels")
                .optional()
                .invalid(|i| !is_tag_list(&i.data.strings(i.field)))
                .invalid_text("Labels must be valid tags"),
        )
        .field(
            FieldSchema::text("arbitrary_secret_name")
                .invalid(invalid_name_value)
                .invalid_text("Invalid secret name"),
        )
        .field(required_text("arbitrary_secret_description", "Enter a description"))
        .field(required_text("arbitrary_secret_data", "Enter secret data"))
        .field(
            FieldSchema::text("username_password_secret_name")
                .invalid(invalid_name_value)
                .invalid_text("Invalid secret name"),
        )
        .field(required_text("username_password_secret_description", "Enter a description"))
        .field(required_text("username_password_secret_username", "Enter a username"))
        .field(required_text("username_password_secret_password", "Enter a password"))
        .field(FieldSchema::toggle("auto_rotate"))
        .field(
            FieldSchema::number("interval")
                .invalid(|i| is_required_range_invalid(i.value(), 1, 365))
                .invalid_text("Must be a whole number between 1 and 365")
                .hide_when(not_auto_rotate),
        )
        .field(
            required_select("rotation_unit", "Select a rotation unit")
                .with_groups(&["day", "month"])
                .hide_when(not_auto_rotate),
        )
}

pub fn schemas() -> Vec<ResourceSchema> {
    vec![
        ssh_key_schema(),
        vsi_schema(),
        volume_schema(),
        cluster_schema(),
        worker_pool_schema(),
        opaque_secret_schema(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{SaveContext, Scope};
    use crate::document::{ConfigDocument, Resource};
    use serde_json::json;

    const KEY: &str = "ssh-rsa AAAAB3NzaC1yc2thisisaninvalidsshkey... test@fakeemail.com";
    const GOOD_KEY: &str = "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQDE test@example.com";

    fn obj(value: Value) -> Resource {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn public_keys_must_be_unique() {
        let doc: ConfigDocument = serde_json::from_value(json!({
            "ssh_keys": [{ "name": "ssh-key", "public_key": GOOD_KEY }]
        }))
        .unwrap();
        let schema = ssh_key_schema();
        let field = schema.get("public_key").unwrap();

        let ctx = SaveContext::new(&doc, Scope::new_top_level());
        let data = obj(json!({ "name": "other", "public_key": GOOD_KEY }));
        let input = FieldInput::new(ResourceKind::SshKeys, "public_key", &data, &ctx);
        assert!(field.is_invalid(&input));
        assert_eq!(field.message(&input), "SSH public key is already in use");

        let ctx = SaveContext::new(&doc, Scope::top_level("ssh-key"));
        let data = obj(json!({ "name": "ssh-key", "public_key": GOOD_KEY }));
        assert!(!field.is_invalid(&FieldInput::new(ResourceKind::SshKeys, "public_key", &data, &ctx)));

        let data = obj(json!({ "name": "ssh-key", "public_key": KEY }));
        assert!(field.is_invalid(&FieldInput::new(ResourceKind::SshKeys, "public_key", &data, &ctx)));
    }

    #[test]
    fn imported_keys_skip_public_key() {
        let doc = ConfigDocument::new();
        let ctx = SaveContext::new(&doc, Scope::new_top_level());
        let data = obj(json!({ "name": "imported", "resource_group": "rg", "use_data": true }));
        let fields = ssh_key_schema().invalid_fields(&data, &ctx);
        assert!(fields.iter().all(|(f, _)| *f != "public_key"));
    }

    #[test]
    fn iks_clusters_do_not_need_cos() {
        let doc = ConfigDocument::new();
        let ctx = SaveContext::new(&doc, Scope::new_top_level());
        let schema = cluster_schema();
        let field = schema.get("cos").unwrap();
        let data = obj(json!({ "type": "iks", "cos": null }));
        assert!(!field.is_invalid(&FieldInput::new(ResourceKind::Clusters, "cos", &data, &ctx)));
        let data = obj(json!({ "type": "openshift", "cos": null }));
        assert!(field.is_invalid(&FieldInput::new(ResourceKind::Clusters, "cos", &data, &ctx)));
    }
}
