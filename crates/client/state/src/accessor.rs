use crate::decode::{self, Storage};
use crate::error::FetchError;
use ac_ledger::LedgerQuery;
use ap_types::{AccountAddress, ContractTemplate, InterfaceSchema, VariableKind};
use async_trait::async_trait;
#[cfg(any(test, feature = "testing"))]
use mockall::automock;
use serde_json::Value;
use std::sync::Arc;

/// Typed, read-only view of one deployed instance's state.
#[async_trait]
pub trait ContractAccessor: std::fmt::Debug + Send + Sync {
    /// Declared variable names, in declaration order.
    fn variable_names(&self) -> Vec<String>;

    /// Decode one declared variable.
    async fn variable(&self, name: &str) -> Result<Value, FetchError>;

    /// Point lookup into a mapping-typed variable.
    async fn mapping_entry(&self, name: &str, key: &str) -> Result<Value, FetchError>;
}

/// Binds a contract template to a deployed instance, yielding an accessor.
///
/// Attachment is the fallible step of a fetch: it performs the remote read
/// that backs every subsequent decode.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait AttachContract: Send + Sync {
    async fn attach(
        &self,
        template: &ContractTemplate,
        address: AccountAddress,
    ) -> Result<Arc<dyn ContractAccessor>, FetchError>;
}

/// Production attacher: pulls the instance's raw storage in one read and
/// decodes against the template's schema.
pub struct StorageAttacher {
    ledger: Arc<dyn LedgerQuery>,
}

impl StorageAttacher {
    pub fn new(ledger: Arc<dyn LedgerQuery>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl AttachContract for StorageAttacher {
    async fn attach(
        &self,
        template: &ContractTemplate,
        address: AccountAddress,
    ) -> Result<Arc<dyn ContractAccessor>, FetchError> {
        let storage = self.ledger.storage_of(&address).await.map_err(FetchError::Attach)?;
        Ok(Arc::new(StorageAccessor { schema: template.xabi.clone(), storage }))
    }
}

#[derive(Debug)]
struct StorageAccessor {
    schema: InterfaceSchema,
    storage: Storage,
}

#[async_trait]
impl ContractAccessor for StorageAccessor {
    fn variable_names(&self) -> Vec<String> {
        self.schema.variable_names().map(str::to_owned).collect()
    }

    async fn variable(&self, name: &str) -> Result<Value, FetchError> {
        let spec = self.schema.variable(name).ok_or_else(|| FetchError::UnknownVariable(name.to_owned()))?;
        decode::decode_at(&self.storage, &spec.name, &spec.kind, ap_types::StorageWord::from_slot(spec.slot))
    }

    async fn mapping_entry(&self, name: &str, key: &str) -> Result<Value, FetchError> {
        let spec = self.schema.variable(name).ok_or_else(|| FetchError::UnknownVariable(name.to_owned()))?;
        let VariableKind::Mapping { value } = &spec.kind else {
            return Err(FetchError::NotAMapping(name.to_owned()));
        };
        let location = decode::mapping_slot(&decode::encode_mapping_key(key)?, spec.slot);
        decode::decode_at(&self.storage, &spec.name, value, location)
    }
}
