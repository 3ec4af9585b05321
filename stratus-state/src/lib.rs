//! Stratus State Management
//!
//! The configuration store that owns a document and keeps it consistent
//! across edits.
//!
//! # Overview
//!
//! - **ConfigStore**: create, save and delete resources with cascading
//!   renames and reference cleanup, subnet tier editing and subscribers
//! - **import**: structural checks for documents from outside the store
//! - **project**: loading and saving documents as JSON files
//!
//! # Example
//!
//! ```ignore
//! use stratus_core::context::Scope;
//! use stratus_core::kind::ResourceKind;
//! use stratus_state::{StoreOptions, load_store};
//!
//! let mut store = load_store(Path::new("landing-zone.json"), StoreOptions::default())?;
//! store.subscribe(|doc| println!("{} vpcs", doc.vpcs.len()));
//!
//! // Rename a VPC; every subnet, security group and VSI follows
//! store.save(ResourceKind::Vpcs, data, &Scope::top_level("management"))?;
//! ```

pub mod import;
pub mod project;
pub mod store;

// Re-export main types for convenience
pub use import::{ImportError, import_document, import_str};
pub use project::{LoadError, load_document, load_store, save_document};
pub use store::{ConfigStore, StoreError, StoreOptions, SubscriptionId};
