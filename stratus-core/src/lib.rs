//! Stratus Core
//!
//! Configuration document model, field schemas and the disable-save
//! validation engine for cloud landing zone configurations

pub mod context;
pub mod derive;
pub mod disable_save;
pub mod document;
pub mod invalid_forms;
pub mod kind;
pub mod references;
pub mod schema;
pub mod schemas;
pub mod validate;
pub mod views;

pub use context::{SaveContext, Scope};
pub use disable_save::{SaveProblem, disable_save, first_problem, invalid_fields};
pub use document::{Collection, ConfigDocument, Resource, ResourceExt, Singleton};
pub use invalid_forms::{invalid_forms, invalid_resources};
pub use kind::ResourceKind;
