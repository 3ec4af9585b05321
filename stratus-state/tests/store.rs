use serde_json::{Value, json};
use stratus_core::context::{SaveContext, Scope};
use stratus_core::disable_save::disable_save;
use stratus_core::document::{Resource, ResourceExt};
use stratus_core::invalid_forms::invalid_forms;
use stratus_core::kind::ResourceKind;
use stratus_core::references::references_to;
use stratus_state::{ConfigStore, StoreError, StoreOptions, load_store, save_document};
use tempfile::tempdir;

fn obj(value: Value) -> Resource {
    value.as_object().cloned().unwrap()
}

fn landing_zone() -> Value {
    json!({
        "_options": { "prefix": "iac", "region": "us-south", "zones": 3, "dynamic_subnets": true },
        "resource_groups": [{ "name": "management-rg" }, { "name": "workload-rg" }],
        "key_management": [{ "name": "kms", "resource_group": "management-rg", "keys": [] }],
        "object_storage": [],
        "secrets_manager": [],
        "atracker": { "enabled": false },
        "vpcs": [
            {
                "name": "management",
                "resource_group": "management-rg",
                "acls": [{ "name": "management-acl", "rules": [] }],
                "subnets": [
                    { "name": "vsi-zone-1", "zone": 1, "network_acl": "management-acl" },
                    { "name": "vsi-zone-2", "zone": 2, "network_acl": "management-acl" },
                    { "name": "vpe-zone-1", "zone": 1, "network_acl": "management-acl" }
                ]
            },
            {
                "name": "workload",
                "resource_group": "workload-rg",
                "acls": [{ "name": "workload-acl", "rules": [] }],
                "subnets": [{ "name": "vsi-zone-1", "zone": 1, "network_acl": "workload-acl" }]
            }
        ],
        "virtual_private_endpoints": [],
        "security_groups": [{ "name": "management-vsi", "vpc": "management", "rules": [] }],
        "vpn_gateways": [],
        "ssh_keys": [],
        "transit_gateways": [],
        "clusters": [],
        "vsi": [
            { "name": "management-server", "vpc": "management", "subnets": ["vsi-zone-1", "vsi-zone-2"] },
            { "name": "workload-server", "vpc": "workload", "subnets": ["vsi-zone-1"] }
        ],
        "appid": [],
        "event_streams": [],
        "load_balancers": [],
        "iam_account_settings": { "enable": false },
        "access_groups": [],
        "scc": { "enable": false },
        "routing_tables": []
    })
}

fn store() -> ConfigStore {
    ConfigStore::from_json(landing_zone(), StoreOptions::default()).unwrap()
}

#[test]
fn test_hard_set_is_idempotent() {
    let mut store = store();
    let once = store.document().clone();
    store.hard_set_json(serde_json::to_value(&once).unwrap()).unwrap();
    assert_eq!(store.document(), &once);

    let subnets = once.vpcs[0].children("subnets");
    assert_eq!(subnets[0].text("cidr"), "10.10.10.0/24");
    assert_eq!(subnets[1].text("cidr"), "10.20.10.0/24");
    assert_eq!(subnets[2].text("cidr"), "10.10.20.0/24");
    assert_eq!(once.vpcs[1].children("subnets")[0].text("cidr"), "10.11.10.0/24");
}

#[test]
fn test_rejected_hard_set_keeps_document() {
    let mut store = store();
    let before = store.document().clone();
    let mut broken = landing_zone();
    broken["vpcs"] = json!("management");
    let err = store.hard_set_json(broken).unwrap_err();
    assert!(matches!(err, StoreError::Import(_)));
    assert_eq!(store.document(), &before);
}

#[test]
fn test_skip_validation_accepts_partial_documents() {
    let mut store = ConfigStore::new(StoreOptions::new().skip_validation(true));
    store.hard_set_json(json!({ "vpcs": [{ "name": "edge" }] })).unwrap();
    assert_eq!(store.document().vpcs.len(), 1);

    let mut strict = ConfigStore::default();
    assert!(strict.hard_set_json(json!({ "vpcs": [] })).is_err());
    strict
        .hard_set_json_with(json!({ "vpcs": [] }), true)
        .unwrap();
}

#[test]
fn test_subnet_rename_is_scoped_to_its_vpc() {
    let mut store = store();
    store
        .save(
            ResourceKind::Subnets,
            obj(json!({ "name": "app-zone-1" })),
            &Scope::nested("management", Some("vsi-zone-1")),
        )
        .unwrap();

    let doc = store.document();
    assert_eq!(doc.vsi[0].strings("subnets"), vec!["app-zone-1", "vsi-zone-2"]);
    assert_eq!(doc.vsi[1].strings("subnets"), vec!["vsi-zone-1"]);
    assert!(references_to(doc, ResourceKind::Subnets, Some("management"), "vsi-zone-1").is_empty());
    assert_eq!(references_to(doc, ResourceKind::Subnets, Some("workload"), "vsi-zone-1").len(), 1);
}

#[test]
fn test_acl_rename_updates_subnets() {
    let mut store = store();
    store
        .save(
            ResourceKind::Acls,
            obj(json!({ "name": "edge-acl" })),
            &Scope::nested("management", Some("management-acl")),
        )
        .unwrap();
    let doc = store.document();
    for subnet in doc.vpcs[0].children("subnets") {
        assert_eq!(subnet.text("network_acl"), "edge-acl");
    }
    assert_eq!(doc.vpcs[1].children("subnets")[0].text("network_acl"), "workload-acl");
}

#[test]
fn test_blank_name_is_refused() {
    let mut store = store();
    let before = store.document().clone();
    let err = store
        .save(ResourceKind::Vsi, obj(json!({ "name": "" })), &Scope::top_level("management-server"))
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingName { .. }));
    assert_eq!(store.document(), &before);

    let err = store
        .save(ResourceKind::Vsi, obj(json!({ "name": null })), &Scope::top_level("management-server"))
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingName { .. }));
    assert_eq!(store.document().vsi[0].name(), "management-server");
}

#[test]
fn test_generated_address_prefixes_are_read_only() {
    let mut store = store();
    let before = store.document().clone();
    let prefix = obj(json!({ "name": "custom", "cidr": "10.99.0.0/16", "zone": 1 }));
    let err = store
        .create(ResourceKind::AddressPrefixes, prefix, &Scope::nested("management", None))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "address_prefixes of VPC 'management' are generated from its subnets"
    );
    assert_eq!(store.document(), &before);
    assert!(
        store
            .delete(ResourceKind::AddressPrefixes, &Scope::nested("management", Some("vsi-zone-1")))
            .is_err()
    );

    store
        .save(
            ResourceKind::Vpcs,
            obj(json!({ "manual_address_prefix_management": true })),
            &Scope::top_level("management"),
        )
        .unwrap();
    let prefix = obj(json!({ "name": "custom", "cidr": "10.99.0.0/16", "zone": 1 }));
    store
        .create(ResourceKind::AddressPrefixes, prefix, &Scope::nested("management", None))
        .unwrap();
    let prefixes = store.document().vpcs[0].children("address_prefixes");
    assert!(prefixes.iter().any(|p| p.name() == "custom"));
}

#[test]
fn test_gated_create() {
    let mut store = store();
    let candidate = obj(json!({ "name": "management-rg" }));
    let ctx = SaveContext::top_level(store.document(), None);
    assert!(disable_save(ResourceKind::ResourceGroups, &candidate, &ctx));

    let candidate = obj(json!({ "name": "edge-rg", "use_prefix": true }));
    let ctx = SaveContext::top_level(store.document(), None);
    assert!(!disable_save(ResourceKind::ResourceGroups, &candidate, &ctx));
    store
        .create(ResourceKind::ResourceGroups, candidate, &Scope::new_top_level())
        .unwrap();
    assert_eq!(store.document().resource_groups.len(), 3);
}

#[test]
fn test_delete_leaves_form_invalid_but_consistent() {
    let mut store = store();
    assert!(!invalid_forms(store.document()).contains(&"/form/keyManagement"));

    store
        .delete(ResourceKind::ResourceGroups, &Scope::top_level("management-rg"))
        .unwrap();
    let doc = store.document();
    assert_eq!(doc.key_management[0].get("resource_group"), Some(&Value::Null));
    assert_eq!(doc.vpcs[0].get("resource_group"), Some(&Value::Null));
    assert!(invalid_forms(doc).contains(&"/form/keyManagement"));
}

#[test]
fn test_deleting_vpc_cleans_everything_pointing_into_it() {
    let mut store = store();
    store.delete(ResourceKind::Vpcs, &Scope::top_level("management")).unwrap();
    let doc = store.document();
    assert_eq!(doc.vpcs.len(), 1);
    assert_eq!(doc.vsi[0].get("vpc"), Some(&Value::Null));
    assert!(doc.vsi[0].strings("subnets").is_empty());
    assert_eq!(doc.vsi[1].strings("subnets"), vec!["vsi-zone-1"]);
    assert_eq!(doc.security_groups[0].get("vpc"), Some(&Value::Null));
    assert!(store.tiers_of("management").is_empty());
}

#[test]
fn test_refused_delete_changes_nothing() {
    let mut doc = landing_zone();
    doc["power"] = json!([{ "name": "ws", "ssh_keys": [], "network": [], "cloud_connections": [] }]);
    doc["power_instances"] = json!([
        { "name": "primary", "workspace": "ws" },
        { "name": "follower", "workspace": "ws", "pi_affinity_instance": "primary" }
    ]);
    let mut store = ConfigStore::from_json(doc, StoreOptions::default()).unwrap();
    let before = store.document().clone();

    let err = store
        .delete(ResourceKind::PowerInstances, &Scope::top_level("primary"))
        .unwrap_err();
    assert!(matches!(err, StoreError::Reference(_)));
    assert_eq!(store.document(), &before);

    store
        .delete(ResourceKind::PowerInstances, &Scope::top_level("follower"))
        .unwrap();
    store
        .delete(ResourceKind::PowerInstances, &Scope::top_level("primary"))
        .unwrap();
    assert!(store.document().power_instances.is_empty());
}

#[test]
fn test_names_stay_unique_across_edits() {
    let mut store = store();
    let scope = Scope::nested("management", None);
    let acl = obj(json!({ "name": "management-acl" }));
    assert!(store.create(ResourceKind::Acls, acl, &scope).is_err());

    let acl = obj(json!({ "name": "management-acl" }));
    store
        .create(ResourceKind::Acls, acl, &Scope::nested("workload", None))
        .unwrap();

    let doc = store.document();
    for vpc in &doc.vpcs {
        let mut names: Vec<_> = vpc.children("acls").iter().map(|a| a.name()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}

#[test]
fn test_project_round_trip_through_store() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("landing-zone.json");
    let original = store();
    save_document(&path, original.document()).unwrap();

    let reopened = load_store(&path, StoreOptions::default()).unwrap();
    assert_eq!(reopened.document(), original.document());
    assert_eq!(reopened.tiers(), original.tiers());
}
