//! File-backed contract metadata registry.
//!
//! Metadata records live under `<meta_dir>/<ContractName>/`, one JSON file
//! per deployed instance plus a `Latest.json` template record. The upload
//! tooling owns the directory layout; this crate only reads it.

mod error;
mod store;

pub use error::RegistryError;
pub use store::{ContractRegistry, InstanceEntry, TemplateStore};

#[cfg(any(test, feature = "testing"))]
pub use store::MockTemplateStore;
