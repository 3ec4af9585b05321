//! The configuration store
//!
//! [`ConfigStore`] owns a [`ConfigDocument`] and is the only way it changes.
//! Every mutation runs against a copy of the document; parent fields, dynamic
//! CIDRs and subnet tiers are recomputed on the copy, and only then does the
//! copy replace the live document and listeners get called. A failed
//! mutation leaves the live document untouched.
//!
//! The store does not run the disable-save rules. Callers gate edits through
//! [`stratus_core::disable_save`] first; the store keeps names unique within
//! their scope and keeps references consistent.
//!
//! The store is synchronous. Share it between threads behind a `Mutex`.

use log::{debug, info, warn};
use serde_json::{Value, json};
use stratus_core::context::{Scope, all_of};
use stratus_core::derive::{self, SubnetTier, TierMap, subnet_zone, tier_name, vpc_tiers};
use stratus_core::document::{Collection, ConfigDocument, Resource, ResourceExt};
use stratus_core::kind::{Location, ResourceKind};
use stratus_core::references::{self, ReferenceError};
use thiserror::Error;

use crate::import::{ImportError, import_document};

/// Errors returned by store mutations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("A {kind} must have a name")]
    MissingName { kind: ResourceKind },

    #[error("A {kind} must be created inside a parent")]
    MissingParent { kind: ResourceKind },

    #[error("{kind} are not stored as a list")]
    NotStored { kind: ResourceKind },

    #[error("{kind} of VPC '{vpc}' are generated from its subnets")]
    Derived { kind: ResourceKind, vpc: String },

    #[error("Unknown {kind} '{name}'")]
    UnknownParent { kind: ResourceKind, name: String },

    #[error("{kind} '{name}' does not exist")]
    UnknownTarget { kind: ResourceKind, name: String },

    #[error("{kind} '{name}' already exists")]
    DuplicateName { kind: ResourceKind, name: String },

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Import(#[from] ImportError),
}

/// Store behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    skip_validation: bool,
    upgrade_missing_keys: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            skip_validation: false,
            upgrade_missing_keys: true,
        }
    }
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip structural checks when a document is hard set
    pub fn skip_validation(mut self, skip: bool) -> Self {
        self.skip_validation = skip;
        self
    }

    /// Fill collections added in later document formats when importing
    pub fn upgrade_missing_keys(mut self, upgrade: bool) -> Self {
        self.upgrade_missing_keys = upgrade;
        self
    }

    pub fn skips_validation(&self) -> bool {
        self.skip_validation
    }

    pub fn upgrades_missing_keys(&self) -> bool {
        self.upgrade_missing_keys
    }

    /// Build a document from untrusted JSON according to these options
    pub fn import(&self, value: Value) -> Result<ConfigDocument, ImportError> {
        if self.skip_validation {
            Ok(serde_json::from_value(value)?)
        } else {
            import_document(value, self.upgrade_missing_keys)
        }
    }
}

/// Identifies a listener registered with [`ConfigStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

type Listener = Box<dyn FnMut(&ConfigDocument) + Send>;

/// Owned configuration document with CRUD operations
pub struct ConfigStore {
    doc: ConfigDocument,
    tiers: TierMap,
    options: StoreOptions,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: usize,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(StoreOptions::default())
    }
}

impl ConfigStore {
    /// A store holding an empty document
    pub fn new(options: StoreOptions) -> Self {
        Self::with_document(ConfigDocument::new(), options)
    }

    /// A store holding `doc`, with derived fields recomputed
    pub fn with_document(mut doc: ConfigDocument, options: StoreOptions) -> Self {
        derive::refresh_parent_fields(&mut doc);
        derive::recompute(&mut doc);
        let tiers = derive::subnet_tiers(&doc);
        Self {
            doc,
            tiers,
            options,
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// A store holding a document imported from JSON
    pub fn from_json(value: Value, options: StoreOptions) -> Result<Self, StoreError> {
        let doc = options.import(value)?;
        Ok(Self::with_document(doc, options))
    }

    pub fn document(&self) -> &ConfigDocument {
        &self.doc
    }

    pub fn into_document(self) -> ConfigDocument {
        self.doc
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Subnet tiers of every VPC
    pub fn tiers(&self) -> &TierMap {
        &self.tiers
    }

    /// Subnet tiers of one VPC, empty when the VPC is unknown
    pub fn tiers_of(&self, vpc: &str) -> &[SubnetTier] {
        self.tiers.get(vpc).map(Vec::as_slice).unwrap_or(&[])
    }

    // ========== Subscribers ==========

    /// Call `listener` with the whole document after every successful
    /// mutation
    pub fn subscribe(&mut self, listener: impl FnMut(&ConfigDocument) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false when `id` was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    fn notify(&mut self) {
        for (_, listener) in &mut self.listeners {
            listener(&self.doc);
        }
    }

    // ========== Whole document ==========

    /// Replace the whole document, checking its shape unless the store
    /// skips validation
    pub fn hard_set_json(&mut self, value: Value) -> Result<(), StoreError> {
        let skip = self.options.skip_validation;
        self.hard_set_json_with(value, skip)
    }

    /// Replace the whole document, choosing whether to check its shape
    pub fn hard_set_json_with(&mut self, value: Value, skip_validation: bool) -> Result<(), StoreError> {
        let options = self.options.clone().skip_validation(skip_validation);
        match options.import(value) {
            Ok(doc) => {
                self.replace(doc);
                info!(
                    "Replaced configuration document ({} vpcs, prefix '{}')",
                    self.doc.vpcs.len(),
                    self.doc.prefix()
                );
                Ok(())
            }
            Err(err) => {
                warn!("Rejected document: {}", err);
                Err(err.into())
            }
        }
    }

    fn replace(&mut self, mut doc: ConfigDocument) {
        derive::refresh_parent_fields(&mut doc);
        derive::recompute(&mut doc);
        self.tiers = derive::subnet_tiers(&doc);
        self.doc = doc;
        self.notify();
    }

    /// Run `mutation` on a copy of the document and keep the copy only when
    /// it succeeds
    fn apply<F>(&mut self, action: &str, kind: ResourceKind, name: &str, mutation: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut ConfigDocument) -> Result<(), StoreError>,
    {
        let mut next = self.doc.clone();
        if let Err(err) = mutation(&mut next) {
            warn!("Refused to {} {} '{}': {}", action, kind, name, err);
            return Err(err);
        }
        self.replace(next);
        Ok(())
    }

    // ========== Resources ==========

    /// Add a resource. Nested resources are added inside `scope.parent()`.
    pub fn create(&mut self, kind: ResourceKind, data: Resource, scope: &Scope<'_>) -> Result<(), StoreError> {
        let name = data.name().to_string();
        if name.is_empty() {
            return Err(StoreError::MissingName { kind });
        }
        self.check_stored(kind, scope)?;
        self.apply("create", kind, &name, |doc| {
            let mut items = items(doc, kind, scope)?;
            if items.position(&name).is_some() {
                return Err(StoreError::DuplicateName { kind, name: name.clone() });
            }
            items.push(data);
            debug!("Created {} '{}'{}", kind, name, describe(scope));
            Ok(())
        })
    }

    /// Merge `data` over the resource named `scope.editing()`. A changed
    /// name is cascaded to every reference. Singletons ignore the scope.
    pub fn save(&mut self, kind: ResourceKind, data: Resource, scope: &Scope<'_>) -> Result<(), StoreError> {
        if let Location::Singleton(singleton) = kind.location() {
            return self.apply("save", kind, kind.as_str(), |doc| {
                doc.singleton_mut(singleton).extend(data);
                debug!("Saved {}", kind);
                Ok(())
            });
        }

        let original = scope.editing().ok_or(StoreError::MissingName { kind })?;
        if data.contains_key("name") && data.name().is_empty() {
            return Err(StoreError::MissingName { kind });
        }
        self.check_stored(kind, scope)?;
        let renamed = data
            .str_field("name")
            .filter(|n| !n.is_empty() && *n != original)
            .map(str::to_string);

        self.apply("save", kind, original, |doc| {
            let mut items = items(doc, kind, scope)?;
            let index = items.position(original).ok_or_else(|| StoreError::UnknownTarget {
                kind,
                name: original.to_string(),
            })?;
            if let Some(new_name) = &renamed
                && items.position(new_name).is_some()
            {
                return Err(StoreError::DuplicateName {
                    kind,
                    name: new_name.clone(),
                });
            }
            if let Some(record) = items.get_mut(index) {
                record.extend(data);
            }
            debug!("Saved {} '{}'{}", kind, original, describe(scope));

            if let Some(new_name) = &renamed {
                references::rename_references(doc, kind, scope.parent(), original, new_name);
            }
            Ok(())
        })
    }

    /// Remove the resource named `scope.editing()` and clean up every
    /// reference to it and to the resources nested inside it
    pub fn delete(&mut self, kind: ResourceKind, scope: &Scope<'_>) -> Result<(), StoreError> {
        let name = scope.editing().ok_or(StoreError::MissingName { kind })?;
        self.check_stored(kind, scope)?;
        self.apply("delete", kind, name, |doc| {
            items(doc, kind, scope)?
                .position(name)
                .ok_or_else(|| StoreError::UnknownTarget {
                    kind,
                    name: name.to_string(),
                })?;
            let cleared = references::cascade_delete(doc, kind, scope.parent(), name)?;

            let mut items = items(doc, kind, scope)?;
            if let Some(index) = items.position(name) {
                items.remove(index);
            }
            debug!("Deleted {} '{}'{} ({} references cleared)", kind, name, describe(scope), cleared);
            Ok(())
        })
    }

    /// Refuse edits that the next recompute would overwrite
    fn check_stored(&self, kind: ResourceKind, scope: &Scope<'_>) -> Result<(), StoreError> {
        if kind == ResourceKind::AddressPrefixes
            && let Some(vpc) = scope.parent()
            && let Some(record) = self.doc.find(Collection::Vpcs, vpc)
            && derive::derives_address_prefixes(&self.doc, record)
        {
            return Err(StoreError::Derived {
                kind,
                vpc: vpc.to_string(),
            });
        }
        Ok(())
    }

    // ========== Subnet tiers ==========

    /// Add a tier to `vpc`, creating one subnet per zone of the tier
    pub fn create_subnet_tier(&mut self, vpc: &str, tier: SubnetTier) -> Result<(), StoreError> {
        let tier_label = tier.name.clone();
        self.apply("create", ResourceKind::SubnetTier, &tier_label, |doc| {
            let record = vpc_mut(doc, vpc)?;
            if vpc_tiers(record).iter().any(|t| t.name == tier.name) {
                return Err(StoreError::DuplicateName {
                    kind: ResourceKind::SubnetTier,
                    name: tier.name.clone(),
                });
            }
            for zone in tier.zone_list() {
                add_tier_subnet(record, vpc, &tier, zone, None)?;
            }
            debug!("Created subnet tier '{}' in VPC '{}' ({:?})", tier.name, vpc, tier.zone_list());
            Ok(())
        })
    }

    /// Rename or resize the tier `name` of `vpc`. Subnets in zones the tier
    /// keeps are renamed (cascading references), subnets in dropped zones
    /// are deleted and new zones get new subnets.
    pub fn save_subnet_tier(&mut self, vpc: &str, name: &str, tier: SubnetTier) -> Result<(), StoreError> {
        self.apply("save", ResourceKind::SubnetTier, name, |doc| {
            let record = vpc_mut(doc, vpc)?;
            let tiers = vpc_tiers(record);
            if !tiers.iter().any(|t| t.name == name) {
                return Err(StoreError::UnknownTarget {
                    kind: ResourceKind::SubnetTier,
                    name: name.to_string(),
                });
            }
            if tier.name != name && tiers.iter().any(|t| t.name == tier.name) {
                return Err(StoreError::DuplicateName {
                    kind: ResourceKind::SubnetTier,
                    name: tier.name.clone(),
                });
            }

            let existing: Vec<(String, Option<u8>)> = record
                .children("subnets")
                .into_iter()
                .filter(|s| tier_name(s) == name)
                .map(|s| (s.name().to_string(), subnet_zone(s)))
                .collect();
            let template = record
                .children("subnets")
                .into_iter()
                .find(|s| tier_name(s) == name)
                .cloned();
            let zones = tier.zone_list();

            for (subnet, zone) in &existing {
                match zone.filter(|z| zones.contains(z)) {
                    Some(zone) => {
                        let new_name = tier.subnet_name(zone);
                        update_tier_subnet(vpc_mut(doc, vpc)?, subnet, &new_name, &tier);
                        references::rename_references(doc, ResourceKind::Subnets, Some(vpc), subnet, &new_name);
                    }
                    None => {
                        references::cascade_delete(doc, ResourceKind::Subnets, Some(vpc), subnet)?;
                        remove_subnet(vpc_mut(doc, vpc)?, subnet);
                    }
                }
            }

            let record = vpc_mut(doc, vpc)?;
            for zone in zones {
                if !existing.iter().any(|(_, z)| *z == Some(zone)) {
                    add_tier_subnet(record, vpc, &tier, zone, template.as_ref())?;
                }
            }
            debug!("Saved subnet tier '{}' in VPC '{}' as '{}' ({:?})", name, vpc, tier.name, tier.zone_list());
            Ok(())
        })
    }

    /// Remove the tier `name` of `vpc` and all of its subnets
    pub fn delete_subnet_tier(&mut self, vpc: &str, name: &str) -> Result<(), StoreError> {
        self.apply("delete", ResourceKind::SubnetTier, name, |doc| {
            let subnets: Vec<String> = vpc_mut(doc, vpc)?
                .children("subnets")
                .into_iter()
                .filter(|s| tier_name(s) == name)
                .map(|s| s.name().to_string())
                .collect();
            if subnets.is_empty() {
                return Err(StoreError::UnknownTarget {
                    kind: ResourceKind::SubnetTier,
                    name: name.to_string(),
                });
            }
            for subnet in &subnets {
                references::cascade_delete(doc, ResourceKind::Subnets, Some(vpc), subnet)?;
                remove_subnet(vpc_mut(doc, vpc)?, subnet);
            }
            debug!("Deleted subnet tier '{}' in VPC '{}' ({} subnets)", name, vpc, subnets.len());
            Ok(())
        })
    }
}

// ========== Locating resources ==========

/// The list a resource of some kind lives in
enum Items<'d> {
    Collection(&'d mut Vec<Resource>),
    Nested(&'d mut Vec<Value>),
}

impl Items<'_> {
    fn position(&self, name: &str) -> Option<usize> {
        match self {
            Items::Collection(items) => items.iter().position(|r| r.name() == name),
            Items::Nested(items) => items
                .iter()
                .position(|v| v.as_object().is_some_and(|r| r.name() == name)),
        }
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut Resource> {
        match self {
            Items::Collection(items) => items.get_mut(index),
            Items::Nested(items) => items.get_mut(index).and_then(Value::as_object_mut),
        }
    }

    fn push(&mut self, resource: Resource) {
        match self {
            Items::Collection(items) => items.push(resource),
            Items::Nested(items) => items.push(Value::Object(resource)),
        }
    }

    fn remove(&mut self, index: usize) {
        match self {
            Items::Collection(items) => {
                items.remove(index);
            }
            Items::Nested(items) => {
                items.remove(index);
            }
        }
    }
}

fn items<'d>(doc: &'d mut ConfigDocument, kind: ResourceKind, scope: &Scope<'_>) -> Result<Items<'d>, StoreError> {
    match kind.location() {
        Location::TopLevel(collection) => Ok(Items::Collection(doc.collection_mut(collection))),
        Location::Nested { parent, key } => {
            let parent_name = scope.parent().ok_or(StoreError::MissingParent { kind })?;
            let owner = resource_mut(doc, parent, parent_name, scope.grandparent()).ok_or_else(|| {
                StoreError::UnknownParent {
                    kind: parent,
                    name: parent_name.to_string(),
                }
            })?;
            Ok(Items::Nested(owner.array_mut(key)))
        }
        Location::Singleton(_) | Location::Derived { .. } => Err(StoreError::NotStored { kind }),
    }
}

/// A stored resource of `kind` named `name`. For nested kinds `within` names
/// the owner; without it the first owner holding such a resource is used.
fn resource_mut<'d>(
    doc: &'d mut ConfigDocument,
    kind: ResourceKind,
    name: &str,
    within: Option<&str>,
) -> Option<&'d mut Resource> {
    match kind.location() {
        Location::TopLevel(collection) => doc.find_mut(collection, name),
        Location::Nested { parent, key } => {
            let owner = match within {
                Some(owner) => owner.to_string(),
                None => all_of(doc, parent)
                    .into_iter()
                    .find(|o| o.children(key).iter().any(|c| c.name() == name))?
                    .name()
                    .to_string(),
            };
            resource_mut(doc, parent, &owner, None)?
                .children_mut(key)
                .into_iter()
                .find(|r| r.name() == name)
        }
        Location::Singleton(_) | Location::Derived { .. } => None,
    }
}

fn describe(scope: &Scope<'_>) -> String {
    match (scope.parent(), scope.grandparent()) {
        (Some(parent), Some(grandparent)) => format!(" in '{}' of '{}'", parent, grandparent),
        (Some(parent), None) => format!(" in '{}'", parent),
        _ => String::new(),
    }
}

// ========== Tier subnets ==========

fn vpc_mut<'d>(doc: &'d mut ConfigDocument, vpc: &str) -> Result<&'d mut Resource, StoreError> {
    doc.find_mut(Collection::Vpcs, vpc).ok_or_else(|| StoreError::UnknownParent {
        kind: ResourceKind::Vpcs,
        name: vpc.to_string(),
    })
}

fn add_tier_subnet(
    vpc: &mut Resource,
    vpc_name: &str,
    tier: &SubnetTier,
    zone: u8,
    template: Option<&Resource>,
) -> Result<(), StoreError> {
    let name = tier.subnet_name(zone);
    if vpc.children("subnets").iter().any(|s| s.name() == name) {
        return Err(StoreError::DuplicateName {
            kind: ResourceKind::Subnets,
            name,
        });
    }
    let inherited = |field: &str| {
        template
            .and_then(|t| t.get(field))
            .cloned()
            .unwrap_or(Value::Null)
    };
    let mut subnet = json!({
        "name": name,
        "vpc": vpc_name,
        "zone": zone,
        "cidr": "",
        "network_acl": inherited("network_acl"),
        "resource_group": inherited("resource_group"),
        "public_gateway": template.is_some_and(|t| t.flag("public_gateway")),
        "has_prefix": true,
    });
    if tier.advanced
        && let Some(subnet) = subnet.as_object_mut()
    {
        subnet.insert("tier".to_string(), Value::from(tier.name.as_str()));
        subnet.insert("advanced".to_string(), Value::Bool(true));
    }
    vpc.array_mut("subnets").push(subnet);
    Ok(())
}

fn update_tier_subnet(vpc: &mut Resource, subnet: &str, new_name: &str, tier: &SubnetTier) {
    if let Some(record) = vpc.children_mut("subnets").into_iter().find(|s| s.name() == subnet) {
        record.insert("name".to_string(), Value::from(new_name));
        if tier.advanced {
            record.insert("tier".to_string(), Value::from(tier.name.as_str()));
            record.insert("advanced".to_string(), Value::Bool(true));
        } else {
            record.remove("tier");
            record.remove("advanced");
        }
    }
}

fn remove_subnet(vpc: &mut Resource, subnet: &str) {
    vpc.array_mut("subnets")
        .retain(|s| s.as_object().is_none_or(|s| s.name() != subnet));
}
