//! Loading and saving project documents as JSON files

use std::path::{Path, PathBuf};

use log::{debug, info};
use stratus_core::document::ConfigDocument;
use thiserror::Error;

use crate::import::ImportError;
use crate::store::{ConfigStore, StoreOptions};

/// A project file that cannot be read or written
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid document in {}: {source}", path.display())]
    Import {
        path: PathBuf,
        #[source]
        source: ImportError,
    },
}

/// Read and import the document stored at `path`
pub fn load_document(path: &Path, options: &StoreOptions) -> Result<ConfigDocument, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let import_error = |source: ImportError| LoadError::Import {
        path: path.to_path_buf(),
        source,
    };
    let value = serde_json::from_str(&content).map_err(|e| import_error(e.into()))?;
    let doc = options.import(value).map_err(import_error)?;
    debug!("Loaded document from {}", path.display());
    Ok(doc)
}

/// Open a store on the document stored at `path`
pub fn load_store(path: &Path, options: StoreOptions) -> Result<ConfigStore, LoadError> {
    let doc = load_document(path, &options)?;
    info!("Opened project {}", path.display());
    Ok(ConfigStore::with_document(doc, options))
}

/// Write `doc` to `path` as pretty-printed JSON
pub fn save_document(path: &Path, doc: &ConfigDocument) -> Result<(), LoadError> {
    let content = serde_json::to_string_pretty(doc).map_err(|e| LoadError::Import {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    std::fs::write(path, content + "\n").map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Saved document to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("project.json");

        let mut doc = ConfigDocument::new();
        doc.options.insert("prefix".to_string(), json!("iac"));
        doc.vpcs.push(json!({ "name": "management" }).as_object().cloned().unwrap());
        save_document(&path, &doc).unwrap();

        let loaded = load_document(&path, &StoreOptions::default()).unwrap();
        assert_eq!(loaded, doc);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\n  \"_options\""));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let err = load_document(&path, &StoreOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "[]").unwrap();
        let err = load_document(&path, &StoreOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::Import { source: ImportError::NotAnObject(_), .. }));

        std::fs::write(&path, "{").unwrap();
        let err = load_document(&path, &StoreOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::Import { source: ImportError::Parse(_), .. }));
    }
}
