//! Built-in schemas for every resource kind

pub mod classic;
pub mod common;
pub mod compute;
pub mod network;
pub mod power;
pub mod security;
pub mod services;
pub mod types;

use crate::schema::ResourceSchema;

/// Every built-in resource schema
pub fn all_schemas() -> Vec<ResourceSchema> {
    let mut schemas = Vec::new();
    schemas.extend(security::schemas());
    schemas.extend(network::schemas());
    schemas.extend(compute::schemas());
    schemas.extend(services::schemas());
    schemas.extend(power::schemas());
    schemas.extend(classic::schemas());
    schemas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ResourceKind;
    use std::collections::HashSet;

    #[test]
    fn one_schema_per_kind() {
        let schemas = all_schemas();
        let kinds: HashSet<ResourceKind> = schemas.iter().map(|s| s.kind).collect();
        assert_eq!(kinds.len(), schemas.len());
        assert_eq!(kinds.len(), ResourceKind::ALL.len());
    }

    #[test]
    fn nested_kinds_have_matching_subcollections() {
        use crate::kind::Location;
        use crate::schema::FieldType;
        let schemas = all_schemas();
        for kind in ResourceKind::ALL {
            if let Location::Nested { parent, key } = kind.location() {
                let parent_schema = schemas.iter().find(|s| s.kind == parent).unwrap();
                let field = parent_schema.get(key);
                assert!(
                    field.is_some_and(|f| f.field_type == FieldType::SubCollection),
                    "{} has no `{}` sub-collection for {}",
                    parent,
                    key,
                    kind
                );
            }
        }
    }
}
