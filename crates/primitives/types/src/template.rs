use crate::AccountAddress;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Kind of a declared state variable, as recorded in a contract's xabi.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariableKind {
    Uint,
    Int,
    Bool,
    Address,
    Bytes {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        length: Option<usize>,
    },
    String,
    Enum {
        variants: Vec<String>,
    },
    Mapping {
        value: Box<VariableKind>,
    },
}

/// One declared state variable and the storage slot it occupies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: VariableKind,
    pub slot: u64,
}

/// The interface portion of a contract metadata record: declared functions
/// and state variables, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceSchema {
    #[serde(default)]
    pub funcs: BTreeSet<String>,
    #[serde(default)]
    pub vars: Vec<VariableSpec>,
}

impl InterfaceSchema {
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|v| v.name.as_str())
    }

    pub fn variable(&self, name: &str) -> Option<&VariableSpec> {
        self.vars.iter().find(|v| v.name == name)
    }
}

/// One on-disk contract metadata record: the class-level template every
/// deployed instance of a contract type shares.
///
/// Loaded once per request and shared read-only across all fan-out tasks.
/// Fields the pipeline does not interpret (compiled bytecode, source hashes,
/// ...) are kept verbatim in `extra` for consumers that render the full
/// document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractTemplate {
    pub name: String,
    pub address: AccountAddress,
    pub xabi: InterfaceSchema,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContractTemplate {
    /// The same record re-addressed to a specific deployed instance.
    pub fn with_address(mut self, address: AccountAddress) -> Self {
        self.address = address;
        self
    }
}
