use ac_ledger::LedgerError;
use ac_registry::RegistryError;
use thiserror::Error;

/// Failures that abort a whole aggregation request.
///
/// Per-instance fetch failures are deliberately absent: they are isolated to
/// their own task and settle as tagged [`crate::FetchOutcome`]s instead.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("instance discovery failed: {0}")]
    Discovery(#[from] LedgerError),

    #[error("metadata registry failure: {0}")]
    Registry(#[from] RegistryError),

    #[error("single-instance fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("ledger client setup failed: {0}")]
    Setup(#[source] LedgerError),

    #[error("failed to render metadata document: {0}")]
    Render(#[from] serde_json::Error),
}

/// Failures inside one fetch task. All of these are treated as transient by
/// the retry loop; the attempt ceiling decides when to stop trying.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to attach to instance: {0}")]
    Attach(#[source] LedgerError),

    #[error("variable `{0}` is not declared by this contract")]
    UnknownVariable(String),

    #[error("failed to decode `{variable}`: {reason}")]
    Decode { variable: String, reason: String },

    #[error("`{0}` is not a mapping")]
    NotAMapping(String),

    #[error("mapping key `{0}` does not fit in a storage word")]
    BadMappingKey(String),
}
