use crate::accessor::AttachContract;
use crate::error::FetchError;
use ap_resilience::{RetryConfig, RetryState};
use ap_types::{AccountAddress, ContractStateSnapshot, ContractTemplate};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Terminal result of one fetch task.
///
/// Every scheduled task settles with one of these: exhaustion is a value the
/// aggregator can count, never a pending future it would wait on forever.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FetchOutcome {
    Resolved(ContractStateSnapshot),
    Exhausted { address: AccountAddress, error: String },
}

impl FetchOutcome {
    pub fn address(&self) -> AccountAddress {
        match self {
            FetchOutcome::Resolved(snapshot) => snapshot.address,
            FetchOutcome::Exhausted { address, .. } => *address,
        }
    }

    pub fn into_snapshot(self) -> Option<ContractStateSnapshot> {
        match self {
            FetchOutcome::Resolved(snapshot) => Some(snapshot),
            FetchOutcome::Exhausted { .. } => None,
        }
    }
}

/// One scheduled state fetch: an address, the shared template, and the
/// task's start offset within the fan-out.
pub(crate) struct FetchTask {
    pub address: AccountAddress,
    pub template: Arc<ContractTemplate>,
    pub properties: Option<Arc<[String]>>,
    pub start_delay: Duration,
    pub retry: RetryConfig,
}

impl FetchTask {
    /// Drive the task to a settled outcome.
    ///
    /// The staggered start delay elapses before the first remote read; after
    /// that, every failed try waits the fixed backoff until the attempt
    /// ceiling is reached. The task's identity never changes across retries.
    pub(crate) async fn run(self, attacher: Arc<dyn AttachContract>) -> FetchOutcome {
        tokio::time::sleep(self.start_delay).await;

        let mut retry = RetryState::new(self.retry.clone());
        loop {
            match try_fetch(attacher.as_ref(), &self.template, self.address, self.properties.as_deref()).await {
                Ok(state) => {
                    return FetchOutcome::Resolved(ContractStateSnapshot { address: self.address, state });
                }
                Err(err) => {
                    retry.record_attempt();
                    if retry.is_exhausted() {
                        tracing::error!(
                            address = %self.address,
                            attempts = retry.attempt(),
                            error = %err,
                            "state fetch retries exhausted"
                        );
                        return FetchOutcome::Exhausted {
                            address: self.address,
                            error: format!("exhausted-retries: {err}"),
                        };
                    }
                    if retry.should_log() {
                        tracing::warn!(
                            address = %self.address,
                            attempt = retry.attempt(),
                            error = %err,
                            "state fetch failed, retrying"
                        );
                    }
                    tokio::time::sleep(retry.next_delay()).await;
                }
            }
        }
    }
}

async fn try_fetch(
    attacher: &dyn AttachContract,
    template: &ContractTemplate,
    address: AccountAddress,
    properties: Option<&[String]>,
) -> Result<Value, FetchError> {
    let accessor = attacher.attach(template, address).await?;
    let names: Vec<String> = match properties {
        Some(subset) => subset.to_vec(),
        None => accessor.variable_names(),
    };

    let mut state = Map::new();
    for name in names {
        match accessor.variable(&name).await {
            Ok(value) => {
                state.insert(name, value);
            }
            // A requested property the contract does not declare is dropped
            // from the snapshot, not an error.
            Err(FetchError::UnknownVariable(unknown)) => {
                tracing::warn!(variable = %unknown, "requested property is not declared, skipping");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(Value::Object(state))
}
