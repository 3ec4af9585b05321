//! Structural checks for documents coming from outside the store
//!
//! Business rules are not checked here. A document that passes only has the
//! shape [`ConfigDocument`] expects: an object whose collections are arrays
//! of objects and whose singletons are objects.

use log::debug;
use serde_json::{Map, Value};
use stratus_core::document::{Collection, ConfigDocument, Singleton};
use thiserror::Error;

/// A document that cannot be imported
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Document must be a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("Document is missing required key '{0}'")]
    MissingKey(String),

    #[error("Key '{key}' must be {expected}, found {found}")]
    WrongType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Failed to parse document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// JSON type name used in messages
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Check the shape of `value` and build a document from it.
///
/// Core keys must always be present. Keys added in later document formats
/// are filled with empty values when `upgrade_missing_keys` is set and are
/// required otherwise.
pub fn import_document(value: Value, upgrade_missing_keys: bool) -> Result<ConfigDocument, ImportError> {
    let mut root = match value {
        Value::Object(root) => root,
        other => return Err(ImportError::NotAnObject(type_name(&other))),
    };

    for collection in Collection::ALL {
        let key = collection.key();
        match root.get(key) {
            Some(Value::Array(items)) => check_items(key, items)?,
            Some(other) => {
                return Err(ImportError::WrongType {
                    key: key.to_string(),
                    expected: "an array",
                    found: type_name(other),
                });
            }
            None if collection.is_core() || !upgrade_missing_keys => {
                return Err(ImportError::MissingKey(key.to_string()));
            }
            None => {
                debug!("Upgrading document: adding empty '{}'", key);
                root.insert(key.to_string(), Value::Array(Vec::new()));
            }
        }
    }

    for singleton in Singleton::ALL {
        let key = singleton.key();
        match root.get(key) {
            Some(Value::Object(_)) => {}
            Some(other) => {
                return Err(ImportError::WrongType {
                    key: key.to_string(),
                    expected: "an object",
                    found: type_name(other),
                });
            }
            None if singleton.is_core() || !upgrade_missing_keys => {
                return Err(ImportError::MissingKey(key.to_string()));
            }
            None => {
                debug!("Upgrading document: adding empty '{}'", key);
                root.insert(key.to_string(), Value::Object(Map::new()));
            }
        }
    }

    if let Some(schematics) = root.get("_schematics")
        && !schematics.is_object()
        && !schematics.is_null()
    {
        return Err(ImportError::WrongType {
            key: "_schematics".to_string(),
            expected: "an object",
            found: type_name(schematics),
        });
    }

    Ok(serde_json::from_value(Value::Object(root))?)
}

/// Parse JSON text and import it
pub fn import_str(text: &str, upgrade_missing_keys: bool) -> Result<ConfigDocument, ImportError> {
    let value: Value = serde_json::from_str(text)?;
    import_document(value, upgrade_missing_keys)
}

fn check_items(key: &str, items: &[Value]) -> Result<(), ImportError> {
    for (index, item) in items.iter().enumerate() {
        if !item.is_object() {
            return Err(ImportError::WrongType {
                key: format!("{}[{}]", key, index),
                expected: "an object",
                found: type_name(item),
            });
        }
    }
    Ok(())
}
