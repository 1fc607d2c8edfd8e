//! Core identifier and record types shared across the argus workspace.

mod address;
mod snapshot;
mod template;
mod word;

pub use address::{AccountAddress, AddressParseError, CodeFingerprint};
pub use snapshot::{normalize_bytes, ContractStateSnapshot};
pub use template::{ContractTemplate, InterfaceSchema, VariableKind, VariableSpec};
pub use word::{StorageWord, WordParseError};
