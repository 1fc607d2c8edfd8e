use crate::error::LedgerError;
use ap_types::{AccountAddress, CodeFingerprint, StorageWord};
use async_trait::async_trait;
#[cfg(any(test, feature = "testing"))]
use mockall::automock;
use std::collections::BTreeMap;

/// Interface to the remote ledger-query service.
///
/// Every method is fallible and must surface failures explicitly: an empty
/// result set is a real answer ("no instances of this bytecode"), so a
/// transient service failure must never be collapsed into one.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait LedgerQuery: Send + Sync {
    /// The bytecode fingerprint the given account currently runs.
    async fn code_for(&self, address: &AccountAddress) -> Result<CodeFingerprint, LedgerError>;

    /// Every account currently running exactly the given bytecode.
    async fn accounts_running(&self, code: &CodeFingerprint) -> Result<Vec<AccountAddress>, LedgerError>;

    /// The full raw storage of an account, keyed by slot word. Unset slots
    /// are absent from the map.
    async fn storage_of(&self, address: &AccountAddress) -> Result<BTreeMap<StorageWord, StorageWord>, LedgerError>;
}
