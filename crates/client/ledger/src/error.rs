use ap_types::AccountAddress;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid ledger endpoint `{url}`: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("ledger returned status {status} for {context}")]
    Status { status: u16, context: String },

    #[error("failed to decode ledger response from {context}: {reason}")]
    Decode { context: String, reason: String },

    #[error("no account found at address {0}")]
    UnknownAccount(AccountAddress),

    #[error("account {0} has no code")]
    MissingCode(AccountAddress),
}

impl LedgerError {
    /// Network-level failure, as opposed to the service answering badly.
    pub fn is_connection_error(&self) -> bool {
        match self {
            LedgerError::Transport(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}
